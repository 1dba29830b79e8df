mod controller;
mod timer;

pub use controller::{
    AUTO_ADVANCE_DELAY, Advance, ExamController, ExamSession, ExamState, FollowUp, TICK_PERIOD,
    TickOutcome,
};
pub use timer::ExamTimer;
