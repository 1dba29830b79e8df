use serde::{Deserialize, Serialize};

use crate::model::question::LicenseClass;

/// Static exam parameters for one license class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamConfig {
    pub total_questions: usize,
    pub pass_mark: usize,
    pub time_limit_secs: u64,
}

impl ExamConfig {
    #[must_use]
    pub const fn new(total_questions: usize, pass_mark: usize, time_limit_secs: u64) -> Self {
        Self {
            total_questions,
            pass_mark,
            time_limit_secs,
        }
    }

    /// Official question pool sizes, pass marks and time limits.
    #[must_use]
    pub const fn for_class(class: LicenseClass) -> Self {
        match class {
            LicenseClass::Technician => Self::new(35, 26, 40 * 60),
            LicenseClass::General => Self::new(35, 26, 50 * 60),
            LicenseClass::Extra => Self::new(50, 37, 60 * 60),
        }
    }

    #[must_use]
    pub fn time_limit_minutes(&self) -> u64 {
        self.time_limit_secs / 60
    }
}

/// Final score of a submitted exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub correct_count: usize,
    pub total: usize,
    pub passed: bool,
    pub pass_mark: usize,
}

impl ExamResult {
    #[must_use]
    pub fn new(correct_count: usize, total: usize, pass_mark: usize) -> Self {
        Self {
            correct_count,
            total,
            passed: correct_count >= pass_mark,
            pass_mark,
        }
    }

    /// Score as a whole percentage, rounded half up. Zero for an empty exam.
    #[must_use]
    pub fn percentage(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        let scaled = (self.correct_count * 200 + self.total) / (self.total * 2);
        u32::try_from(scaled).unwrap_or(u32::MAX)
    }
}

/// Formats seconds as `MM:SS` for countdown display.
#[must_use]
pub fn format_countdown(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_table_matches_license_classes() {
        let tech = ExamConfig::for_class(LicenseClass::Technician);
        assert_eq!(tech.total_questions, 35);
        assert_eq!(tech.pass_mark, 26);
        assert_eq!(tech.time_limit_minutes(), 40);

        let general = ExamConfig::for_class(LicenseClass::General);
        assert_eq!(general.time_limit_secs, 3000);

        let extra = ExamConfig::for_class(LicenseClass::Extra);
        assert_eq!(extra.total_questions, 50);
        assert_eq!(extra.pass_mark, 37);
        assert_eq!(extra.time_limit_minutes(), 60);
    }

    #[test]
    fn result_passes_at_pass_mark() {
        assert!(ExamResult::new(26, 35, 26).passed);
        assert!(!ExamResult::new(25, 35, 26).passed);
    }

    #[test]
    fn percentage_rounds() {
        assert_eq!(ExamResult::new(30, 35, 26).percentage(), 86);
        assert_eq!(ExamResult::new(1, 3, 1).percentage(), 33);
        assert_eq!(ExamResult::new(2, 3, 1).percentage(), 67);
        assert_eq!(ExamResult::new(0, 0, 0).percentage(), 0);
    }

    #[test]
    fn countdown_formats_minutes_and_seconds() {
        assert_eq!(format_countdown(2400), "40:00");
        assert_eq!(format_countdown(65), "01:05");
        assert_eq!(format_countdown(0), "00:00");
    }

    #[test]
    fn result_serializes_in_camel_case() {
        let json = serde_json::to_value(ExamResult::new(30, 35, 26)).unwrap();
        assert_eq!(json["correctCount"], 30);
        assert_eq!(json["passMark"], 26);
        assert_eq!(json["passed"], true);
    }
}
