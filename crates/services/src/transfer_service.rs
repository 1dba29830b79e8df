use std::sync::Arc;

use chrono::{DateTime, Utc};
use ham_core::Clock;
use ham_core::model::{QuestionId, Seed, SeedKind};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::TransferError;
use crate::ledger_service::{AnswerMap, LedgerSections, LedgerService, NoteMap, ProgressMap};
use crate::seed_service::SeedService;
use crate::settings_service::SettingsService;

/// Version written into whole-data exports.
pub const EXPORT_VERSION: u32 = 1;

/// How an imported document combines with stored data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Keep stored data; imported entries win on conflicts and notes are
    /// concatenated. Seeds and settings are left alone.
    Merge,
    /// Each section present in the document replaces the stored one.
    Overwrite,
}

impl ImportMode {
    #[must_use]
    pub fn from_merge_flag(merge: bool) -> Self {
        if merge { Self::Merge } else { Self::Overwrite }
    }
}

/// Whole-data export document. Section names match the storage keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataExport {
    pub version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_answers: Option<AnswerMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrong_answers: Option<Vec<QuestionId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub practice_progress: Option<ProgressMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_notes: Option<NoteMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<Seed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exam_random_seed: Option<Seed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_advance: Option<bool>,
}

/// What an import applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub sections: usize,
    pub export_date: Option<DateTime<Utc>>,
}

/// Backup and restore of the ledger, seeds and settings as JSON documents.
#[derive(Clone)]
pub struct TransferService {
    clock: Clock,
    client: Client,
    seeds: Arc<SeedService>,
    ledger: Arc<LedgerService>,
    settings: Arc<SettingsService>,
}

impl TransferService {
    #[must_use]
    pub fn new(
        clock: Clock,
        seeds: Arc<SeedService>,
        ledger: Arc<LedgerService>,
        settings: Arc<SettingsService>,
    ) -> Self {
        Self {
            clock,
            client: Client::new(),
            seeds,
            ledger,
            settings,
        }
    }

    /// Snapshot everything into an export document.
    pub async fn export_all(&self) -> DataExport {
        let snapshot = self.ledger.snapshot().await;
        DataExport {
            version: EXPORT_VERSION,
            export_date: Some(self.clock.now()),
            user_answers: Some(snapshot.answers),
            wrong_answers: Some(snapshot.wrong_answers),
            practice_progress: Some(snapshot.progress),
            question_notes: Some(snapshot.notes),
            random_seed: self.seeds.current(SeedKind::Practice).await,
            exam_random_seed: self.seeds.current(SeedKind::Exam).await,
            auto_advance: Some(self.settings.auto_advance().await),
        }
    }

    /// Pretty-printed export document.
    ///
    /// # Errors
    ///
    /// Returns `TransferError::Json` if encoding fails.
    pub async fn export_all_json(&self) -> Result<String, TransferError> {
        Ok(serde_json::to_string_pretty(&self.export_all().await)?)
    }

    /// Apply a whole-data export document.
    ///
    /// # Errors
    ///
    /// Returns `TransferError::InvalidFormat` if the document is not an object
    /// or has no known section, `TransferError::Json` if a section has the
    /// wrong shape, and storage errors from applying it.
    pub async fn import_all(
        &self,
        text: &str,
        mode: ImportMode,
    ) -> Result<ImportReport, TransferError> {
        let value: Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(TransferError::InvalidFormat(
                "expected a JSON object".to_string(),
            ));
        }
        let doc: DataExport = serde_json::from_value(value)?;

        let ledger_sections = LedgerSections {
            answers: doc.user_answers,
            wrong_answers: doc.wrong_answers,
            progress: doc.practice_progress,
            notes: doc.question_notes,
        };
        let mut sections = [
            ledger_sections.answers.is_some(),
            ledger_sections.wrong_answers.is_some(),
            ledger_sections.progress.is_some(),
            ledger_sections.notes.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count();
        let has_extras =
            doc.random_seed.is_some() || doc.exam_random_seed.is_some() || doc.auto_advance.is_some();
        if sections == 0 && !has_extras {
            return Err(TransferError::InvalidFormat(
                "document has no known sections".to_string(),
            ));
        }

        self.ledger
            .import_sections(ledger_sections, mode == ImportMode::Merge)
            .await?;

        if mode == ImportMode::Overwrite {
            if let Some(seed) = doc.random_seed {
                self.seeds.restore(SeedKind::Practice, seed).await;
                sections += 1;
            }
            if let Some(seed) = doc.exam_random_seed {
                self.seeds.restore(SeedKind::Exam, seed).await;
                sections += 1;
            }
            if let Some(enabled) = doc.auto_advance {
                self.settings.set_auto_advance(enabled).await?;
                sections += 1;
            }
        }

        debug!(?mode, sections, "imported data");
        Ok(ImportReport {
            sections,
            export_date: doc.export_date,
        })
    }

    /// Notes as a pretty-printed flat `{id: note}` object.
    ///
    /// # Errors
    ///
    /// Returns `TransferError::Json` if encoding fails.
    pub async fn export_notes(&self) -> Result<String, TransferError> {
        Ok(serde_json::to_string_pretty(&self.ledger.notes().await)?)
    }

    /// Import a flat `{id: note}` object. Returns how many notes it held.
    ///
    /// # Errors
    ///
    /// Returns `TransferError::InvalidFormat` unless the document is an object
    /// of text values keyed by non-blank ids.
    pub async fn import_notes(&self, text: &str, mode: ImportMode) -> Result<usize, TransferError> {
        let notes = parse_notes(text)?;
        let count = notes.len();
        self.ledger
            .import_sections(
                LedgerSections {
                    notes: Some(notes),
                    ..LedgerSections::default()
                },
                mode == ImportMode::Merge,
            )
            .await?;
        debug!(?mode, count, "imported notes");
        Ok(count)
    }

    /// Fetch a notes document over HTTP(S) and import it.
    ///
    /// # Errors
    ///
    /// Returns `TransferError::InvalidUrl`, `TransferError::Http` or
    /// `TransferError::HttpStatus` when the document cannot be fetched, and
    /// the errors of [`Self::import_notes`].
    pub async fn import_notes_from_url(
        &self,
        url: &str,
        mode: ImportMode,
    ) -> Result<usize, TransferError> {
        let url = Url::parse(url)?;
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(TransferError::HttpStatus(response.status()));
        }
        let text = response.text().await?;
        self.import_notes(&text, mode).await
    }

    /// Suggested file name for a notes export, e.g. `ham-notes-2024-05-01.json`.
    #[must_use]
    pub fn notes_file_name(&self) -> String {
        format!("ham-notes-{}.json", self.clock.now().format("%Y-%m-%d"))
    }

    /// Suggested file name for a whole-data export.
    #[must_use]
    pub fn data_file_name(&self) -> String {
        format!("ham-data-{}.json", self.clock.now().format("%Y-%m-%d"))
    }
}

fn parse_notes(text: &str) -> Result<NoteMap, TransferError> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Object(entries) = value else {
        return Err(TransferError::InvalidFormat(
            "notes must be a JSON object of id to text".to_string(),
        ));
    };
    entries
        .into_iter()
        .map(|(key, value)| {
            let id = QuestionId::new(key)
                .map_err(|_| TransferError::InvalidFormat("blank question id".to_string()))?;
            match value {
                Value::String(note) => Ok((id, note)),
                _ => Err(TransferError::InvalidFormat(format!(
                    "note for {id} is not text"
                ))),
            }
        })
        .collect()
}
