use std::collections::BTreeMap;

use crate::model::{ExamResult, OptionKey, Question, QuestionId};
use crate::shuffle::shuffle_question;

/// Outcome of grading an exam session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamGrade {
    pub result: ExamResult,
    /// Questions answered with the wrong slot, in session order.
    pub incorrect: Vec<QuestionId>,
    pub unanswered: usize,
}

/// Grade recorded answers (keyed by session index) against the option order
/// each question had under `exam_seed`.
///
/// Unanswered questions count against the score but are not reported as
/// incorrect.
#[must_use]
pub fn grade_exam(
    questions: &[Question],
    answers: &BTreeMap<usize, OptionKey>,
    exam_seed: &str,
    pass_mark: usize,
) -> ExamGrade {
    let mut correct_count = 0;
    let mut unanswered = 0;
    let mut incorrect = Vec::new();

    for (index, question) in questions.iter().enumerate() {
        let Some(answer) = answers.get(&index) else {
            unanswered += 1;
            continue;
        };
        let shuffled = shuffle_question(question, exam_seed);
        if shuffled.is_correct(*answer) {
            correct_count += 1;
        } else {
            incorrect.push(question.id().clone());
        }
    }

    ExamGrade {
        result: ExamResult::new(correct_count, questions.len(), pass_mark),
        incorrect,
        unanswered,
    }
}
