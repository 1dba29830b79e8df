use std::collections::HashSet;

use ham_core::model::Question;
use reqwest::Client;
use tracing::{debug, warn};

use super::raw::parse_bank;
use super::source::{QuestionSource, source_from_spec};
use crate::error::QuestionBankError;

/// Loads every configured bank file and concatenates their questions.
///
/// Each file is a list of mirrors tried in order until one yields a valid
/// bank. A file that fails on every mirror is skipped; loading fails only when
/// every file fails.
#[derive(Default)]
pub struct QuestionBankLoader {
    files: Vec<Vec<Box<dyn QuestionSource>>>,
}

impl QuestionBankLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one bank file served by `mirrors`, in preference order.
    #[must_use]
    pub fn with_file(mut self, mirrors: Vec<Box<dyn QuestionSource>>) -> Self {
        if !mirrors.is_empty() {
            self.files.push(mirrors);
        }
        self
    }

    /// Build from entries like `technician.json|https://mirror/technician.json`,
    /// one entry per bank file.
    ///
    /// # Errors
    ///
    /// Returns `QuestionBankError::InvalidUrl` for a malformed HTTP(S) entry.
    pub fn from_specs<S: AsRef<str>>(entries: &[S]) -> Result<Self, QuestionBankError> {
        let client = Client::new();
        let mut loader = Self::new();
        for entry in entries {
            let mirrors = entry
                .as_ref()
                .split('|')
                .map(str::trim)
                .filter(|spec| !spec.is_empty())
                .map(|spec| source_from_spec(spec, &client))
                .collect::<Result<Vec<_>, _>>()?;
            loader = loader.with_file(mirrors);
        }
        Ok(loader)
    }

    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Load all files. Duplicate ids keep their first occurrence.
    ///
    /// # Errors
    ///
    /// Returns `QuestionBankError::NoSources` when nothing is configured and
    /// `QuestionBankError::AllSourcesFailed` when no file could be loaded.
    pub async fn load(&self) -> Result<Vec<Question>, QuestionBankError> {
        if self.files.is_empty() {
            return Err(QuestionBankError::NoSources);
        }

        let mut questions = Vec::new();
        let mut loaded_files = 0;
        for mirrors in &self.files {
            if let Some(batch) = load_first_mirror(mirrors).await {
                questions.extend(batch);
                loaded_files += 1;
            }
        }
        if loaded_files == 0 {
            return Err(QuestionBankError::AllSourcesFailed {
                attempted: self.files.len(),
            });
        }

        let mut seen = HashSet::new();
        let before = questions.len();
        questions.retain(|question| seen.insert(question.id().clone()));
        if questions.len() < before {
            warn!(
                dropped = before - questions.len(),
                "dropped questions with duplicate ids"
            );
        }
        debug!(
            files = loaded_files,
            questions = questions.len(),
            "loaded question bank"
        );
        Ok(questions)
    }
}

async fn load_first_mirror(mirrors: &[Box<dyn QuestionSource>]) -> Option<Vec<Question>> {
    for source in mirrors {
        let text = match source.fetch().await {
            Ok(text) => text,
            Err(err) => {
                warn!(source = %source.describe(), "question source failed: {err}");
                continue;
            }
        };
        match parse_bank(&text) {
            Ok(questions) => return Some(questions),
            Err(err) => {
                let err = QuestionBankError::from(err);
                warn!(source = %source.describe(), "question source is unusable: {err}");
            }
        }
    }
    None
}
