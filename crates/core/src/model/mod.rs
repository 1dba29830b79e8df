mod exam;
mod ids;
mod mode;
mod question;
mod seed;

pub use exam::{ExamConfig, ExamResult, format_countdown};
pub use ids::{ParseIdError, QuestionId};
pub use mode::{ModeError, QuestionScope, SeedKind, SessionContext, StudyMode};
pub use question::{LicenseClass, OptionKey, PresentedQuestion, Question, QuestionError};
pub use seed::Seed;
