use ham_core::model::{
    OptionKey, PresentedQuestion, Question, QuestionId, QuestionScope, Seed, SessionContext,
    StudyMode,
};

/// Result of answering the current practice question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PracticeFeedback {
    pub question_id: QuestionId,
    pub selected: OptionKey,
    /// Slot holding the correct text in the displayed order.
    pub correct_answer: OptionKey,
    pub is_correct: bool,
}

/// In-memory practice session over an ordered question list.
///
/// Option order for every question is re-derived from the session seed, so
/// nothing about the shuffle is stored here.
#[derive(Debug, Clone)]
pub struct PracticeSession {
    mode: StudyMode,
    scope: QuestionScope,
    seed: Seed,
    questions: Vec<Question>,
    current: usize,
    feedback: Option<PracticeFeedback>,
}

impl PracticeSession {
    pub(crate) fn new(
        mode: StudyMode,
        scope: QuestionScope,
        seed: Seed,
        questions: Vec<Question>,
        current: usize,
    ) -> Self {
        let current = current.min(questions.len().saturating_sub(1));
        Self {
            mode,
            scope,
            seed,
            questions,
            current,
            feedback: None,
        }
    }

    #[must_use]
    pub fn mode(&self) -> StudyMode {
        self.mode
    }

    #[must_use]
    pub fn scope(&self) -> QuestionScope {
        self.scope
    }

    #[must_use]
    pub fn seed(&self) -> &Seed {
        &self.seed
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
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// 1-based position of the current question.
    #[must_use]
    pub fn question_number(&self) -> usize {
        self.current + 1
    }

    #[must_use]
    pub fn context(&self) -> SessionContext {
        SessionContext::new(self.mode, self.scope, self.question_number())
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    /// Current question with options shuffled under the session seed.
    #[must_use]
    pub fn present(&self) -> Option<PresentedQuestion> {
        self.current_question().map(|question| {
            question.present(self.seed.as_str(), self.question_number(), self.len())
        })
    }

    /// Feedback for the current question, once it has been answered.
    #[must_use]
    pub fn feedback(&self) -> Option<&PracticeFeedback> {
        self.feedback.as_ref()
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.current + 1 < self.questions.len()
    }

    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.current > 0
    }

    pub(crate) fn set_feedback(&mut self, feedback: PracticeFeedback) {
        self.feedback = Some(feedback);
    }

    pub(crate) fn move_to(&mut self, index: usize) {
        self.current = index;
        self.feedback = None;
    }
}
