use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::shuffle::{ShuffleResult, shuffle_question};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("invalid option key: {0}")]
    InvalidOptionKey(String),

    #[error("invalid license class: {0}")]
    InvalidLicenseClass(String),
}

//
// ─── OPTION KEY ───────────────────────────────────────────────────────────────
//

/// One of the four answer slots of a multiple-choice question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptionKey {
    A,
    B,
    C,
    D,
}

impl OptionKey {
    /// Canonical slot order used by the shufflers.
    pub const ALL: [OptionKey; 4] = [OptionKey::A, OptionKey::B, OptionKey::C, OptionKey::D];

    /// Zero-based position of the slot.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            OptionKey::A => 0,
            OptionKey::B => 1,
            OptionKey::C => 2,
            OptionKey::D => 3,
        }
    }

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OptionKey::A => "A",
            OptionKey::B => "B",
            OptionKey::C => "C",
            OptionKey::D => "D",
        }
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionKey {
    type Err = QuestionError;

    /// Accepts a letter (`a`..`d`, any case) or a 1-based digit (`1`..`4`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" | "1" => Ok(OptionKey::A),
            "B" | "2" => Ok(OptionKey::B),
            "C" | "3" => Ok(OptionKey::C),
            "D" | "4" => Ok(OptionKey::D),
            _ => Err(QuestionError::InvalidOptionKey(s.to_string())),
        }
    }
}

//
// ─── LICENSE CLASS ────────────────────────────────────────────────────────────
//

/// Amateur-radio license class a question belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LicenseClass {
    Technician,
    General,
    Extra,
}

impl LicenseClass {
    pub const ALL: [LicenseClass; 3] = [
        LicenseClass::Technician,
        LicenseClass::General,
        LicenseClass::Extra,
    ];

    /// Maps a question id prefix to its class.
    #[must_use]
    pub fn from_prefix(prefix: char) -> Option<Self> {
        match prefix.to_ascii_uppercase() {
            'T' => Some(LicenseClass::Technician),
            'G' => Some(LicenseClass::General),
            'E' => Some(LicenseClass::Extra),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LicenseClass::Technician => "Technician",
            LicenseClass::General => "General",
            LicenseClass::Extra => "Extra",
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            LicenseClass::Technician => "Technician Class",
            LicenseClass::General => "General Class",
            LicenseClass::Extra => "Extra Class",
        }
    }
}

impl fmt::Display for LicenseClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LicenseClass {
    type Err = QuestionError;

    /// Accepts the class name (any case) or a pool code starting with its
    /// prefix letter, such as `T1A`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        for class in Self::ALL {
            if trimmed.eq_ignore_ascii_case(class.as_str()) {
                return Ok(class);
            }
        }
        trimmed
            .chars()
            .next()
            .and_then(Self::from_prefix)
            .ok_or_else(|| QuestionError::InvalidLicenseClass(s.to_string()))
    }
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

/// A multiple-choice question in canonical, letter-keyed form.
///
/// Immutable once loaded; the engine only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    question: String,
    options: BTreeMap<OptionKey, String>,
    correct_answer: OptionKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refs: Option<String>,
    #[serde(default)]
    category: Vec<LicenseClass>,
}

impl Question {
    /// Build a question. The category defaults to the class implied by the id prefix.
    #[must_use]
    pub fn new(
        id: QuestionId,
        question: impl Into<String>,
        options: BTreeMap<OptionKey, String>,
        correct_answer: OptionKey,
    ) -> Self {
        let category = id.license_class().into_iter().collect();
        Self {
            id,
            question: question.into(),
            options,
            correct_answer,
            image: None,
            refs: None,
            category,
        }
    }

    #[must_use]
    pub fn with_image(mut self, image: Option<String>) -> Self {
        self.image = image.filter(|value| !value.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_refs(mut self, refs: Option<String>) -> Self {
        self.refs = refs.filter(|value| !value.trim().is_empty());
        self
    }

    /// Replace the category list. An empty list keeps the prefix-derived class.
    #[must_use]
    pub fn with_categories(mut self, mut categories: Vec<LicenseClass>) -> Self {
        if !categories.is_empty() {
            categories.sort();
            categories.dedup();
            self.category = categories;
        }
        self
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn options(&self) -> &BTreeMap<OptionKey, String> {
        &self.options
    }

    #[must_use]
    pub fn correct_answer(&self) -> OptionKey {
        self.correct_answer
    }

    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    #[must_use]
    pub fn refs(&self) -> Option<&str> {
        self.refs.as_deref()
    }

    #[must_use]
    pub fn categories(&self) -> &[LicenseClass] {
        &self.category
    }

    #[must_use]
    pub fn belongs_to(&self, class: LicenseClass) -> bool {
        self.category.contains(&class)
    }

    /// Render this question with options shuffled under `base_seed`.
    ///
    /// `number` is 1-based and `total` is the session length.
    #[must_use]
    pub fn present(&self, base_seed: &str, number: usize, total: usize) -> PresentedQuestion {
        PresentedQuestion {
            id: self.id.clone(),
            number,
            total,
            text: self.question.clone(),
            image: self.image.clone(),
            refs: self.refs.clone(),
            shuffled: shuffle_question(self, base_seed),
        }
    }
}

/// What a front end needs to display one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedQuestion {
    pub id: QuestionId,
    pub number: usize,
    pub total: usize,
    pub text: String,
    pub image: Option<String>,
    pub refs: Option<String>,
    pub shuffled: ShuffleResult,
}

impl PresentedQuestion {
    /// `"3/35"` style position label.
    #[must_use]
    pub fn position_label(&self) -> String {
        format!("{}/{}", self.number, self.total)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
