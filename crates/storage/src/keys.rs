//! Storage keys. The names double as section names of the export document.

use ham_core::model::SeedKind;

pub const PRACTICE_SEED: &str = "randomSeed";
pub const EXAM_SEED: &str = "examRandomSeed";
pub const USER_ANSWERS: &str = "userAnswers";
pub const WRONG_ANSWERS: &str = "wrongAnswers";
pub const PRACTICE_PROGRESS: &str = "practiceProgress";
pub const QUESTION_NOTES: &str = "questionNotes";
pub const AUTO_ADVANCE: &str = "autoAdvance";

#[must_use]
pub fn seed_key(kind: SeedKind) -> &'static str {
    match kind {
        SeedKind::Practice => PRACTICE_SEED,
        SeedKind::Exam => EXAM_SEED,
    }
}
