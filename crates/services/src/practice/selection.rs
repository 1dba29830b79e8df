use std::collections::HashSet;

use ham_core::model::{Question, QuestionId, QuestionScope, Seed, StudyMode};
use ham_core::shuffle::shuffle_list;

/// Questions of `bank` that fall inside `scope`, in bank order.
#[must_use]
pub fn filter_scope(bank: &[Question], scope: QuestionScope) -> Vec<Question> {
    match scope.license_class() {
        None => bank.to_vec(),
        Some(class) => bank
            .iter()
            .filter(|question| question.belongs_to(class))
            .cloned()
            .collect(),
    }
}

/// The ordered question list for a session.
///
/// Sequential keeps bank order. Retry keeps bank order restricted to
/// `wrong_answers`. Random and exam shuffle the scoped list under `seed`;
/// the caller truncates exams to their configured length.
#[must_use]
pub fn select_questions(
    bank: &[Question],
    mode: StudyMode,
    scope: QuestionScope,
    wrong_answers: &[QuestionId],
    seed: &Seed,
) -> Vec<Question> {
    let mut questions = filter_scope(bank, scope);
    if mode == StudyMode::Retry {
        let wrong: HashSet<&QuestionId> = wrong_answers.iter().collect();
        questions.retain(|question| wrong.contains(question.id()));
    }
    if mode.shuffles_questions() {
        questions = shuffle_list(&questions, seed.as_str());
    }
    questions
}
