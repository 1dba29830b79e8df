mod selection;
mod session;
mod workflow;

pub use selection::{filter_scope, select_questions};
pub use session::{PracticeFeedback, PracticeSession};
pub use workflow::PracticeService;
