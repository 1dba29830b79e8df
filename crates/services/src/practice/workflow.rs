use std::sync::Arc;

use ham_core::model::{OptionKey, Question, QuestionScope, SeedKind, StudyMode};
use tracing::debug;

use super::selection::select_questions;
use super::session::{PracticeFeedback, PracticeSession};
use crate::error::PracticeError;
use crate::ledger_service::LedgerService;
use crate::seed_service::SeedService;

/// Starts practice sessions and records their answers and progress.
#[derive(Clone)]
pub struct PracticeService {
    seeds: Arc<SeedService>,
    ledger: Arc<LedgerService>,
}

impl PracticeService {
    #[must_use]
    pub fn new(seeds: Arc<SeedService>, ledger: Arc<LedgerService>) -> Self {
        Self { seeds, ledger }
    }

    /// Start a session over `bank`, resuming at the saved position for
    /// sequential and random modes.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::ExamMode` for `StudyMode::Exam` and
    /// `PracticeError::Empty` when no question matches.
    pub async fn start(
        &self,
        bank: &[Question],
        mode: StudyMode,
        scope: QuestionScope,
    ) -> Result<PracticeSession, PracticeError> {
        if mode == StudyMode::Exam {
            return Err(PracticeError::ExamMode);
        }
        let seed = self.seeds.get_seed(SeedKind::Practice).await;
        let wrong = if mode == StudyMode::Retry {
            self.ledger.wrong_answers().await
        } else {
            Vec::new()
        };
        let questions = select_questions(bank, mode, scope, &wrong, &seed);
        if questions.is_empty() {
            return Err(PracticeError::Empty);
        }
        let resume_at = self.ledger.progress(mode, scope).await;
        debug!(
            mode = %mode,
            scope = %scope,
            total = questions.len(),
            resume_at,
            "started practice session"
        );
        Ok(PracticeSession::new(
            mode,
            scope,
            seed,
            questions,
            resume_at - 1,
        ))
    }

    /// Grade `selected` against the displayed order of the current question,
    /// remember the answer and add a miss to the wrong-answer set.
    ///
    /// Only the first answer per visit counts; later selections return the
    /// feedback already given.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Empty` if the session has no current question
    /// and `PracticeError::Ledger` if recording fails.
    pub async fn answer(
        &self,
        session: &mut PracticeSession,
        selected: OptionKey,
    ) -> Result<PracticeFeedback, PracticeError> {
        if let Some(feedback) = session.feedback() {
            return Ok(feedback.clone());
        }
        let presented = session.present().ok_or(PracticeError::Empty)?;
        let is_correct = presented.shuffled.is_correct(selected);
        self.ledger.record_answer(&presented.id, selected).await?;
        if !is_correct {
            self.ledger.record_wrong_answer(&presented.id).await?;
        }
        let feedback = PracticeFeedback {
            question_id: presented.id,
            selected,
            correct_answer: presented.shuffled.correct_answer,
            is_correct,
        };
        session.set_feedback(feedback.clone());
        Ok(feedback)
    }

    /// Move to the next question. Returns `false` at the end of the list.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Ledger` if progress cannot be saved.
    pub async fn next(&self, session: &mut PracticeSession) -> Result<bool, PracticeError> {
        if !session.has_next() {
            return Ok(false);
        }
        self.go_to(session, session.question_number() + 1).await?;
        Ok(true)
    }

    /// Move to the previous question. Returns `false` at the start.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Ledger` if progress cannot be saved.
    pub async fn previous(&self, session: &mut PracticeSession) -> Result<bool, PracticeError> {
        if !session.has_previous() {
            return Ok(false);
        }
        self.go_to(session, session.question_number() - 1).await?;
        Ok(true)
    }

    /// Jump to the 1-based `number` and save it as the resume point.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::OutOfRange` for a position outside the session
    /// and `PracticeError::Ledger` if progress cannot be saved.
    pub async fn go_to(
        &self,
        session: &mut PracticeSession,
        number: usize,
    ) -> Result<(), PracticeError> {
        let total = session.len();
        if number == 0 || number > total {
            return Err(PracticeError::OutOfRange { number, total });
        }
        session.move_to(number - 1);
        self.ledger
            .record_progress(session.mode(), session.scope(), number)
            .await?;
        Ok(())
    }
}
