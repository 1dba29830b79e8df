use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::question::LicenseClass;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModeError {
    #[error("unknown study mode: {0}")]
    UnknownMode(String),

    #[error("unknown question scope: {0}")]
    UnknownScope(String),
}

//
// ─── SEED KIND ────────────────────────────────────────────────────────────────
//

/// Which persisted seed drives an ordering. Practice and exam orderings never
/// share a seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedKind {
    Practice,
    Exam,
}

impl SeedKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SeedKind::Practice => "practice",
            SeedKind::Exam => "exam",
        }
    }
}

impl fmt::Display for SeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── STUDY MODE ───────────────────────────────────────────────────────────────
//

/// How a session walks through the question bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudyMode {
    /// Bank order.
    Sequential,
    /// Bank order shuffled by the practice seed.
    Random,
    /// Only questions from the wrong-answer set.
    Retry,
    /// Timed simulation, shuffled by the exam seed.
    Exam,
}

impl StudyMode {
    pub const ALL: [StudyMode; 4] = [
        StudyMode::Sequential,
        StudyMode::Random,
        StudyMode::Retry,
        StudyMode::Exam,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StudyMode::Sequential => "sequential",
            StudyMode::Random => "random",
            StudyMode::Retry => "retry",
            StudyMode::Exam => "exam",
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            StudyMode::Sequential => "Sequential Practice",
            StudyMode::Random => "Random Practice",
            StudyMode::Retry => "Error Log Practice",
            StudyMode::Exam => "Exam Simulation",
        }
    }

    /// Retry and exam sessions always restart from the first question.
    #[must_use]
    pub fn persists_progress(self) -> bool {
        !matches!(self, StudyMode::Retry | StudyMode::Exam)
    }

    #[must_use]
    pub fn shuffles_questions(self) -> bool {
        matches!(self, StudyMode::Random | StudyMode::Exam)
    }

    #[must_use]
    pub fn seed_kind(self) -> SeedKind {
        match self {
            StudyMode::Exam => SeedKind::Exam,
            _ => SeedKind::Practice,
        }
    }
}

impl fmt::Display for StudyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudyMode {
    type Err = ModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| s.trim().eq_ignore_ascii_case(mode.as_str()))
            .ok_or_else(|| ModeError::UnknownMode(s.to_string()))
    }
}

//
// ─── QUESTION SCOPE ───────────────────────────────────────────────────────────
//

/// The slice of the bank a session draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionScope {
    All,
    Class(LicenseClass),
}

impl QuestionScope {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionScope::All => "all",
            QuestionScope::Class(class) => class.as_str(),
        }
    }

    #[must_use]
    pub fn license_class(self) -> Option<LicenseClass> {
        match self {
            QuestionScope::All => None,
            QuestionScope::Class(class) => Some(class),
        }
    }
}

impl From<LicenseClass> for QuestionScope {
    fn from(class: LicenseClass) -> Self {
        QuestionScope::Class(class)
    }
}

impl fmt::Display for QuestionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionScope {
    type Err = ModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(QuestionScope::All);
        }
        s.parse::<LicenseClass>()
            .map(QuestionScope::Class)
            .map_err(|_| ModeError::UnknownScope(s.to_string()))
    }
}

//
// ─── SESSION CONTEXT ──────────────────────────────────────────────────────────
//

/// Explicit navigation context threaded through sessions and the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionContext {
    pub mode: StudyMode,
    pub scope: QuestionScope,
    /// 1-based position within the session.
    pub question_number: usize,
}

impl SessionContext {
    #[must_use]
    pub fn new(mode: StudyMode, scope: QuestionScope, question_number: usize) -> Self {
        Self {
            mode,
            scope,
            question_number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_sequential_and_random_persist_progress() {
        assert!(StudyMode::Sequential.persists_progress());
        assert!(StudyMode::Random.persists_progress());
        assert!(!StudyMode::Retry.persists_progress());
        assert!(!StudyMode::Exam.persists_progress());
    }

    #[test]
    fn exam_mode_uses_exam_seed() {
        assert_eq!(StudyMode::Exam.seed_kind(), SeedKind::Exam);
        assert_eq!(StudyMode::Random.seed_kind(), SeedKind::Practice);
        assert_eq!(StudyMode::Retry.seed_kind(), SeedKind::Practice);
    }

    #[test]
    fn modes_and_scopes_parse() {
        assert_eq!("Random".parse::<StudyMode>().unwrap(), StudyMode::Random);
        assert!("drill".parse::<StudyMode>().is_err());
        assert_eq!("all".parse::<QuestionScope>().unwrap(), QuestionScope::All);
        assert_eq!(
            "General".parse::<QuestionScope>().unwrap(),
            QuestionScope::Class(LicenseClass::General)
        );
        assert!("nothing".parse::<QuestionScope>().is_err());
    }

    #[test]
    fn display_names_match_menu_labels() {
        assert_eq!(StudyMode::Retry.display_name(), "Error Log Practice");
        assert_eq!(QuestionScope::All.to_string(), "all");
        assert_eq!(
            QuestionScope::from(LicenseClass::Extra).to_string(),
            "Extra"
        );
    }
}
