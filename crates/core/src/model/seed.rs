use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::mode::SeedKind;

/// Opaque seed string from which every ordering is re-derived.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Seed(String);

impl Seed {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Seed synthesized on first use: `<millis>_<kind>`.
    #[must_use]
    pub fn initial(timestamp_millis: i64, kind: SeedKind) -> Self {
        Self(format!("{timestamp_millis}_{kind}"))
    }

    /// Practice half of a regenerated pair: the bare timestamp.
    #[must_use]
    pub fn practice_from_stamp(timestamp_millis: i64) -> Self {
        Self(timestamp_millis.to_string())
    }

    /// Exam half of a regenerated pair: `<millis>_exam`.
    #[must_use]
    pub fn exam_from_stamp(timestamp_millis: i64) -> Self {
        Self(format!("{timestamp_millis}_exam"))
    }

    /// Leading timestamp of a time-derived seed, if it has one.
    #[must_use]
    pub fn timestamp_millis(&self) -> Option<i64> {
        let digits: String = self.0.chars().take_while(char::is_ascii_digit).collect();
        digits.parse().ok()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Seed {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_seed_embeds_kind() {
        let seed = Seed::initial(1_700_000_000_000, SeedKind::Exam);
        assert_eq!(seed.as_str(), "1700000000000_exam");
        assert_eq!(seed.timestamp_millis(), Some(1_700_000_000_000));
    }

    #[test]
    fn regenerated_pair_shares_stamp() {
        let practice = Seed::practice_from_stamp(42);
        let exam = Seed::exam_from_stamp(42);
        assert_eq!(practice.as_str(), "42");
        assert_eq!(exam.as_str(), "42_exam");
        assert_ne!(practice, exam);
    }

    #[test]
    fn non_numeric_seed_has_no_stamp() {
        assert_eq!(Seed::new("custom").timestamp_millis(), None);
    }
}
