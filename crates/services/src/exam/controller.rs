use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ham_core::Clock;
use ham_core::model::{
    ExamConfig, ExamResult, LicenseClass, OptionKey, PresentedQuestion, Question, QuestionScope,
    Seed, SeedKind, format_countdown,
};
use ham_core::scoring::{ExamGrade, grade_exam};
use ham_core::shuffle::shuffle_list;
use tracing::{debug, info, warn};

use super::timer::ExamTimer;
use crate::error::ExamError;
use crate::ledger_service::LedgerService;
use crate::practice::filter_scope;
use crate::seed_service::SeedService;

/// Pause between selecting an answer and moving on when auto-advance is on.
pub const AUTO_ADVANCE_DELAY: Duration = Duration::from_millis(500);
/// Countdown granularity.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// What the caller should do after an answer is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    Stay,
    /// Move to the next question after the delay.
    Advance(Duration),
    /// The last question was answered; submit after the delay.
    Submit(Duration),
}

/// Result of stepping past the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Now showing the question at this 0-based index.
    Moved(usize),
    Submitted(ExamResult),
}

/// Result of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No exam is running; the tick changed nothing.
    Inactive,
    Remaining(u64),
    /// Time ran out and the exam was submitted.
    Expired(ExamResult),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// A running exam attempt. Answers are keyed by session index and hold the
/// slot chosen in the displayed option order.
#[derive(Debug, Clone)]
pub struct ExamSession {
    class: LicenseClass,
    config: ExamConfig,
    seed: Seed,
    questions: Vec<Question>,
    answers: BTreeMap<usize, OptionKey>,
    current: usize,
    started_at: DateTime<Utc>,
    time_left_secs: u64,
}

impl ExamSession {
    #[must_use]
    pub fn class(&self) -> LicenseClass {
        self.class
    }

    #[must_use]
    pub fn config(&self) -> ExamConfig {
        self.config
    }

    #[must_use]
    pub fn seed(&self) -> &Seed {
        &self.seed
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<usize, OptionKey> {
        &self.answers
    }

    #[must_use]
    pub fn answer_at(&self, index: usize) -> Option<OptionKey> {
        self.answers.get(&index).copied()
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// 0-based index of the question on screen.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn time_left_secs(&self) -> u64 {
        self.time_left_secs
    }

    /// Remaining time as `MM:SS`.
    #[must_use]
    pub fn countdown(&self) -> String {
        format_countdown(self.time_left_secs)
    }

    /// Question at `index` with options in the order the exam seed gives them.
    #[must_use]
    pub fn present(&self, index: usize) -> Option<PresentedQuestion> {
        self.questions
            .get(index)
            .map(|question| question.present(self.seed.as_str(), index + 1, self.len()))
    }

    #[must_use]
    pub fn present_current(&self) -> Option<PresentedQuestion> {
        self.present(self.current)
    }

    fn is_last(&self) -> bool {
        self.current + 1 >= self.questions.len()
    }
}

/// Lifecycle of one exam attempt.
#[derive(Debug, Clone)]
pub enum ExamState {
    NotStarted,
    Running(ExamSession),
    /// Only the score survives submission.
    Submitted(ExamResult),
}

impl ExamState {
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, ExamState::Running(_))
    }

    #[must_use]
    pub fn session(&self) -> Option<&ExamSession> {
        match self {
            ExamState::Running(session) => Some(session),
            _ => None,
        }
    }

    #[must_use]
    pub fn result(&self) -> Option<ExamResult> {
        match self {
            ExamState::Submitted(result) => Some(*result),
            _ => None,
        }
    }
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Drives exam attempts for one license class.
///
/// Each start draws a fresh exam seed, shuffles the class pool with it and
/// keeps the first `total_questions`. Grading re-derives every option order
/// from the current exam seed, so no shuffled order is stored.
pub struct ExamController {
    class: LicenseClass,
    config: ExamConfig,
    pool: Vec<Question>,
    seeds: Arc<SeedService>,
    ledger: Arc<LedgerService>,
    clock: Clock,
    auto_advance: bool,
    countdown: Option<Duration>,
    state: ExamState,
    timer: Option<ExamTimer>,
}

impl ExamController {
    /// Controller over the questions of `bank` that belong to `class`.
    ///
    /// No background countdown is armed unless `with_countdown` is used;
    /// callers may drive `tick` themselves.
    #[must_use]
    pub fn new(
        class: LicenseClass,
        bank: &[Question],
        seeds: Arc<SeedService>,
        ledger: Arc<LedgerService>,
    ) -> Self {
        Self {
            class,
            config: ExamConfig::for_class(class),
            pool: filter_scope(bank, QuestionScope::Class(class)),
            seeds,
            ledger,
            clock: Clock::default(),
            auto_advance: false,
            countdown: None,
            state: ExamState::NotStarted,
            timer: None,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: ExamConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_auto_advance(mut self, enabled: bool) -> Self {
        self.auto_advance = enabled;
        self
    }

    /// Arm a background timer ticking every `period` while an exam runs.
    #[must_use]
    pub fn with_countdown(mut self, period: Duration) -> Self {
        self.countdown = Some(period);
        self
    }

    pub fn set_auto_advance(&mut self, enabled: bool) {
        self.auto_advance = enabled;
    }

    #[must_use]
    pub fn class(&self) -> LicenseClass {
        self.class
    }

    #[must_use]
    pub fn config(&self) -> ExamConfig {
        self.config
    }

    /// Number of questions available to draw from.
    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    #[must_use]
    pub fn state(&self) -> &ExamState {
        &self.state
    }

    #[must_use]
    pub fn session(&self) -> Option<&ExamSession> {
        self.state.session()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Begin an attempt: regenerate the exam seed, draw the questions and
    /// arm the countdown.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::AlreadyRunning` or `ExamError::AlreadySubmitted`
    /// outside `NotStarted`, and `ExamError::Empty` if the class has no
    /// questions.
    pub async fn start(&mut self) -> Result<(), ExamError> {
        match self.state {
            ExamState::NotStarted => {}
            ExamState::Running(_) => return Err(ExamError::AlreadyRunning),
            ExamState::Submitted(_) => return Err(ExamError::AlreadySubmitted),
        }
        if self.pool.is_empty() {
            return Err(ExamError::Empty);
        }

        let seed = self.seeds.regenerate_exam_seed().await;
        let mut questions = shuffle_list(&self.pool, seed.as_str());
        questions.truncate(self.config.total_questions);
        if questions.len() < self.config.total_questions {
            warn!(
                class = %self.class,
                available = questions.len(),
                expected = self.config.total_questions,
                "exam pool is smaller than the configured exam length"
            );
        }

        debug!(class = %self.class, seed = %seed, total = questions.len(), "exam started");
        self.timer = self.countdown.map(ExamTimer::arm);
        self.state = ExamState::Running(ExamSession {
            class: self.class,
            config: self.config,
            seed,
            questions,
            answers: BTreeMap::new(),
            current: 0,
            started_at: self.clock.now(),
            time_left_secs: self.config.time_limit_secs,
        });
        Ok(())
    }

    /// Current question with its displayed option order.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::NotRunning` outside `Running`.
    pub fn present_current(&self) -> Result<PresentedQuestion, ExamError> {
        self.session()
            .and_then(ExamSession::present_current)
            .ok_or(ExamError::NotRunning)
    }

    /// Record `key` for the current question, replacing any earlier choice.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::NotRunning` outside `Running`.
    pub fn select_answer(&mut self, key: OptionKey) -> Result<FollowUp, ExamError> {
        let auto_advance = self.auto_advance;
        let session = self.running_mut()?;
        session.answers.insert(session.current, key);

        if !auto_advance {
            return Ok(FollowUp::Stay);
        }
        if session.is_last() {
            Ok(FollowUp::Submit(AUTO_ADVANCE_DELAY))
        } else {
            Ok(FollowUp::Advance(AUTO_ADVANCE_DELAY))
        }
    }

    /// Jump to the 0-based `index`.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::NotRunning` outside `Running` and
    /// `ExamError::OutOfRange` for an index past the end.
    pub fn go_to(&mut self, index: usize) -> Result<(), ExamError> {
        let session = self.running_mut()?;
        let total = session.len();
        if index >= total {
            return Err(ExamError::OutOfRange { index, total });
        }
        session.current = index;
        Ok(())
    }

    /// Move to the next question, or submit from the last one.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::NotRunning` outside `Running`.
    pub async fn advance(&mut self) -> Result<Advance, ExamError> {
        let session = self.running_mut()?;
        if session.is_last() {
            let result = self.submit().await?;
            return Ok(Advance::Submitted(result));
        }
        session.current += 1;
        Ok(Advance::Moved(session.current))
    }

    /// Carry out a delayed follow-up. Does nothing if the exam stopped running
    /// while the caller waited.
    pub async fn apply_follow_up(&mut self, follow_up: FollowUp) -> Option<Advance> {
        if !self.is_running() {
            return None;
        }
        match follow_up {
            FollowUp::Stay => None,
            FollowUp::Advance(_) => self.advance().await.ok(),
            FollowUp::Submit(_) => self.submit().await.ok().map(Advance::Submitted),
        }
    }

    /// Grade the running attempt against the current exam seed without
    /// submitting it.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::NotRunning` outside `Running`.
    pub async fn score(&self) -> Result<ExamGrade, ExamError> {
        let session = self.session().ok_or(ExamError::NotRunning)?;
        let seed = self.seeds.get_seed(SeedKind::Exam).await;
        if seed != session.seed {
            warn!(
                session_seed = %session.seed,
                current_seed = %seed,
                "exam seed changed during the attempt; grading with the current seed"
            );
        }
        Ok(grade_exam(
            &session.questions,
            &session.answers,
            seed.as_str(),
            session.config.pass_mark,
        ))
    }

    /// Grade, record incorrect answers in the wrong-answer set, stop the
    /// countdown and discard the session.
    ///
    /// A failure to record wrong answers is logged; the score is still
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::NotRunning` outside `Running`.
    pub async fn submit(&mut self) -> Result<ExamResult, ExamError> {
        let grade = self.score().await?;
        self.cancel_timer();
        if let Err(err) = self.ledger.apply_exam_grade(&grade).await {
            warn!("failed to record exam wrong answers: {err}");
        }
        let result = grade.result;
        info!(
            class = %self.class,
            correct = result.correct_count,
            total = result.total,
            unanswered = grade.unanswered,
            passed = result.passed,
            "exam submitted"
        );
        self.state = ExamState::Submitted(result);
        Ok(result)
    }

    /// Count down one second. Reaching zero submits the exam. Inert outside
    /// `Running`.
    pub async fn tick(&mut self) -> TickOutcome {
        let ExamState::Running(session) = &mut self.state else {
            return TickOutcome::Inactive;
        };
        session.time_left_secs = session.time_left_secs.saturating_sub(1);
        let remaining = session.time_left_secs;
        if remaining > 0 {
            return TickOutcome::Remaining(remaining);
        }
        debug!(class = %self.class, "exam time expired");
        match self.submit().await {
            Ok(result) => TickOutcome::Expired(result),
            Err(_) => TickOutcome::Inactive,
        }
    }

    /// Resolve when the background countdown is due. Never resolves while no
    /// countdown is armed. Cancel safe; follow with `tick`.
    pub async fn wait_tick(&mut self) {
        if let Some(timer) = self.timer.as_mut() {
            if timer.tick().await {
                return;
            }
            self.timer = None;
        }
        std::future::pending::<()>().await;
    }

    /// Leave a submitted attempt so a new one can start.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::AlreadyRunning` while an attempt is running.
    pub fn restart(&mut self) -> Result<(), ExamError> {
        if self.is_running() {
            return Err(ExamError::AlreadyRunning);
        }
        self.state = ExamState::NotStarted;
        Ok(())
    }

    /// Abandon any attempt without grading it.
    pub fn close(&mut self) {
        self.cancel_timer();
        if self.is_running() {
            debug!(class = %self.class, "exam closed without submitting");
        }
        self.state = ExamState::NotStarted;
    }

    fn running_mut(&mut self) -> Result<&mut ExamSession, ExamError> {
        match &mut self.state {
            ExamState::Running(session) => Ok(session),
            _ => Err(ExamError::NotRunning),
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(mut timer) = self.timer.take() {
            timer.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ham_core::model::QuestionId;
    use ham_core::time::fixed_clock;
    use storage::repository::InMemoryStore;

    fn question(raw_id: &str) -> Question {
        let options = OptionKey::ALL
            .iter()
            .map(|key| (*key, format!("{raw_id} choice {key}")))
            .collect();
        Question::new(QuestionId::new(raw_id).unwrap(), "?", options, OptionKey::B)
    }

    fn bank() -> Vec<Question> {
        let mut bank: Vec<Question> = (1..=6).map(|n| question(&format!("T1A0{n}"))).collect();
        bank.push(question("G1A01"));
        bank
    }

    fn controller() -> (ExamController, Arc<LedgerService>) {
        let store = Arc::new(InMemoryStore::new());
        let seeds = Arc::new(SeedService::new(fixed_clock(), store.clone()));
        let ledger = Arc::new(LedgerService::new(store));
        let controller = ExamController::new(
            LicenseClass::Technician,
            &bank(),
            seeds,
            Arc::clone(&ledger),
        )
        .with_clock(fixed_clock())
        .with_config(ExamConfig::new(4, 3, 3));
        (controller, ledger)
    }

    #[tokio::test]
    async fn start_draws_configured_number_from_class_pool() {
        let (mut exam, _) = controller();
        assert_eq!(exam.pool_size(), 6);
        exam.start().await.unwrap();
        let session = exam.session().unwrap();
        assert_eq!(session.len(), 4);
        assert!(session.questions().iter().all(|q| q.id().as_str().starts_with('T')));
        assert_eq!(session.countdown(), "00:03");
        assert!(matches!(exam.start().await, Err(ExamError::AlreadyRunning)));
    }

    #[tokio::test]
    async fn actions_outside_running_are_rejected() {
        let (mut exam, _) = controller();
        assert!(matches!(exam.select_answer(OptionKey::A), Err(ExamError::NotRunning)));
        assert!(matches!(exam.advance().await, Err(ExamError::NotRunning)));
        assert!(matches!(exam.submit().await, Err(ExamError::NotRunning)));
        assert_eq!(exam.tick().await, TickOutcome::Inactive);
        assert!(exam.present_current().is_err());
    }

    #[tokio::test]
    async fn auto_advance_reports_follow_ups() {
        let (exam, _) = controller();
        let mut exam = exam.with_auto_advance(true);
        exam.start().await.unwrap();
        assert_eq!(
            exam.select_answer(OptionKey::A).unwrap(),
            FollowUp::Advance(AUTO_ADVANCE_DELAY)
        );
        exam.go_to(3).unwrap();
        assert_eq!(
            exam.select_answer(OptionKey::C).unwrap(),
            FollowUp::Submit(AUTO_ADVANCE_DELAY)
        );
        let outcome = exam.apply_follow_up(FollowUp::Submit(AUTO_ADVANCE_DELAY)).await;
        assert!(matches!(outcome, Some(Advance::Submitted(_))));
        assert!(exam.apply_follow_up(FollowUp::Advance(AUTO_ADVANCE_DELAY)).await.is_none());
    }

    #[tokio::test]
    async fn manual_mode_stays_and_advance_walks_to_submission() {
        let (mut exam, _) = controller();
        exam.start().await.unwrap();
        assert_eq!(exam.select_answer(OptionKey::D).unwrap(), FollowUp::Stay);
        assert_eq!(exam.advance().await.unwrap(), Advance::Moved(1));
        assert!(matches!(exam.go_to(9), Err(ExamError::OutOfRange { index: 9, total: 4 })));
        exam.go_to(3).unwrap();
        assert!(matches!(exam.advance().await.unwrap(), Advance::Submitted(_)));
        assert!(exam.state().result().is_some());
    }

    #[tokio::test]
    async fn countdown_expiry_submits_once() {
        let (mut exam, _) = controller();
        exam.start().await.unwrap();
        assert_eq!(exam.tick().await, TickOutcome::Remaining(2));
        assert_eq!(exam.tick().await, TickOutcome::Remaining(1));
        let TickOutcome::Expired(result) = exam.tick().await else {
            panic!("expected expiry");
        };
        assert_eq!(result.correct_count, 0);
        assert_eq!(result.total, 4);
        assert!(!result.passed);
        assert_eq!(exam.tick().await, TickOutcome::Inactive);
    }

    #[tokio::test]
    async fn submission_records_only_answered_misses() {
        let (mut exam, ledger) = controller();
        exam.start().await.unwrap();
        let first = exam.present_current().unwrap();
        let wrong = OptionKey::ALL
            .into_iter()
            .find(|key| *key != first.shuffled.correct_answer)
            .unwrap();
        exam.select_answer(wrong).unwrap();
        exam.go_to(1).unwrap();
        let second = exam.present_current().unwrap();
        exam.select_answer(second.shuffled.correct_answer).unwrap();

        let result = exam.submit().await.unwrap();
        assert_eq!(result.correct_count, 1);
        assert_eq!(ledger.wrong_answers().await, vec![first.id]);
    }

    #[tokio::test]
    async fn restart_and_close_return_to_not_started() {
        let (mut exam, _) = controller();
        exam.start().await.unwrap();
        assert!(matches!(exam.restart(), Err(ExamError::AlreadyRunning)));
        exam.close();
        assert!(matches!(exam.state(), ExamState::NotStarted));

        exam.start().await.unwrap();
        exam.submit().await.unwrap();
        assert!(matches!(exam.start().await, Err(ExamError::AlreadySubmitted)));
        exam.restart().unwrap();
        exam.start().await.unwrap();
        assert!(exam.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn background_countdown_stops_after_close() {
        let (exam, _) = controller();
        let mut exam = exam.with_countdown(TICK_PERIOD);
        exam.start().await.unwrap();
        exam.wait_tick().await;
        assert_eq!(exam.tick().await, TickOutcome::Remaining(2));

        exam.close();
        let waited = tokio::time::timeout(Duration::from_secs(5), exam.wait_tick()).await;
        assert!(waited.is_err(), "closed exam kept ticking");
    }
}
