use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::model::question::LicenseClass;

/// Stable identifier of a question in the bank (e.g. `T1A01`).
///
/// Used as the join key for answers, wrong answers and notes, so it is never
/// derived from a question's position.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(String);

impl QuestionId {
    /// Creates a new `QuestionId`, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `ParseIdError` if the id is empty after trimming.
    pub fn new(id: impl Into<String>) -> Result<Self, ParseIdError> {
        let raw = id.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ParseIdError {
                kind: "QuestionId".to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the underlying string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// License class implied by the id prefix (`T`, `G`, `E`).
    #[must_use]
    pub fn license_class(&self) -> Option<LicenseClass> {
        self.0.chars().next().and_then(LicenseClass::from_prefix)
    }
}

impl fmt::Debug for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuestionId({})", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── FromStr Implementations ───────────────────────────────────────────────────

/// Error type for parsing ID from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for QuestionId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_id_display() {
        let id = QuestionId::new("T1A01").unwrap();
        assert_eq!(id.to_string(), "T1A01");
    }

    #[test]
    fn test_question_id_trims_whitespace() {
        let id: QuestionId = "  G2B03 ".parse().unwrap();
        assert_eq!(id.as_str(), "G2B03");
    }

    #[test]
    fn test_question_id_rejects_blank() {
        assert!("   ".parse::<QuestionId>().is_err());
        assert!(QuestionId::new("").is_err());
    }

    #[test]
    fn test_question_id_license_class_from_prefix() {
        let t = QuestionId::new("T5C07").unwrap();
        let g = QuestionId::new("G0A01").unwrap();
        let e = QuestionId::new("E9H11").unwrap();
        let other = QuestionId::new("LK0001").unwrap();
        assert_eq!(t.license_class(), Some(LicenseClass::Technician));
        assert_eq!(g.license_class(), Some(LicenseClass::General));
        assert_eq!(e.license_class(), Some(LicenseClass::Extra));
        assert_eq!(other.license_class(), None);
    }

    #[test]
    fn test_question_id_serializes_as_plain_string() {
        let id = QuestionId::new("T001").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"T001\"");
        let back: QuestionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
