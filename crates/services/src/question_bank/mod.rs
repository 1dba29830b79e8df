//! Loading the question bank from local files or HTTP mirrors.

mod loader;
mod raw;
mod source;

pub use loader::QuestionBankLoader;
pub use raw::{RawQuestion, parse_bank};
pub use source::{FileSource, HttpSource, QuestionSource, source_from_spec};
