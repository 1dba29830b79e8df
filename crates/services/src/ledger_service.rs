use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use ham_core::model::{OptionKey, QuestionId, QuestionScope, StudyMode};
use ham_core::scoring::ExamGrade;
use storage::json::{load_json_or_default, save_json};
use storage::keys;
use storage::repository::KeyValueStore;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::LedgerError;

/// Last selected option per question.
pub type AnswerMap = BTreeMap<QuestionId, OptionKey>;
/// Free-text note per question.
pub type NoteMap = BTreeMap<QuestionId, String>;
/// Last 1-based position reached, by mode name then scope name.
pub type ProgressMap = BTreeMap<String, BTreeMap<String, usize>>;

/// Separator placed between notes merged from two sources.
pub const NOTE_MERGE_SEPARATOR: &str = "\n---\n";

/// Imported ledger sections. `None` leaves a section untouched.
#[derive(Debug, Clone, Default)]
pub struct LedgerSections {
    pub answers: Option<AnswerMap>,
    pub wrong_answers: Option<Vec<QuestionId>>,
    pub progress: Option<ProgressMap>,
    pub notes: Option<NoteMap>,
}

/// Everything the ledger persists, read in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub answers: AnswerMap,
    pub wrong_answers: Vec<QuestionId>,
    pub progress: ProgressMap,
    pub notes: NoteMap,
}

/// Answers, wrong answers, notes and practice progress.
///
/// Reads are tolerant: missing or corrupt values read as empty. Every
/// read-modify-write runs under one lock so concurrent updates to the same key
/// are not lost.
pub struct LedgerService {
    store: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl LedgerService {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    //
    // ─── ANSWERS ───────────────────────────────────────────────────────────────
    //

    /// Remember the option chosen for `id`, replacing any earlier choice.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Storage` if the write fails.
    pub async fn record_answer(&self, id: &QuestionId, key: OptionKey) -> Result<(), LedgerError> {
        let _guard = self.write_lock.lock().await;
        let mut answers = self.answers().await;
        answers.insert(id.clone(), key);
        save_json(self.store.as_ref(), keys::USER_ANSWERS, &answers).await?;
        Ok(())
    }

    pub async fn answer_for(&self, id: &QuestionId) -> Option<OptionKey> {
        self.answers().await.get(id).copied()
    }

    pub async fn answers(&self) -> AnswerMap {
        load_json_or_default(self.store.as_ref(), keys::USER_ANSWERS).await
    }

    /// # Errors
    ///
    /// Returns `LedgerError::Storage` if the key cannot be removed.
    pub async fn clear_answers(&self) -> Result<(), LedgerError> {
        let _guard = self.write_lock.lock().await;
        self.store.remove(keys::USER_ANSWERS).await?;
        Ok(())
    }

    //
    // ─── WRONG ANSWERS ─────────────────────────────────────────────────────────
    //

    /// Add `id` to the wrong-answer set. Returns `false` if it was already
    /// there.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Storage` if the write fails.
    pub async fn record_wrong_answer(&self, id: &QuestionId) -> Result<bool, LedgerError> {
        let added = self.record_wrong_answers(std::slice::from_ref(id)).await?;
        Ok(added == 1)
    }

    /// Add several ids in one write, keeping first-seen order. Returns how
    /// many were new.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Storage` if the write fails.
    pub async fn record_wrong_answers(&self, ids: &[QuestionId]) -> Result<usize, LedgerError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let _guard = self.write_lock.lock().await;
        let existing = self.wrong_answers().await;
        let wrong = ordered_union(&existing, ids);
        let added = wrong.len() - existing.len();
        if added > 0 {
            save_json(self.store.as_ref(), keys::WRONG_ANSWERS, &wrong).await?;
        }
        Ok(added)
    }

    /// Wrong-answer ids in the order they were first recorded.
    pub async fn wrong_answers(&self) -> Vec<QuestionId> {
        let stored: Vec<QuestionId> =
            load_json_or_default(self.store.as_ref(), keys::WRONG_ANSWERS).await;
        ordered_union(&[], &stored)
    }

    pub async fn is_wrong(&self, id: &QuestionId) -> bool {
        self.wrong_answers().await.contains(id)
    }

    /// # Errors
    ///
    /// Returns `LedgerError::Storage` if the key cannot be removed.
    pub async fn clear_wrong_answers(&self) -> Result<(), LedgerError> {
        let _guard = self.write_lock.lock().await;
        self.store.remove(keys::WRONG_ANSWERS).await?;
        Ok(())
    }

    /// Record the incorrect questions of a graded exam. Unanswered questions
    /// are not part of `grade.incorrect` and are left alone.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Storage` if the write fails.
    pub async fn apply_exam_grade(&self, grade: &ExamGrade) -> Result<usize, LedgerError> {
        let added = self.record_wrong_answers(&grade.incorrect).await?;
        debug!(
            incorrect = grade.incorrect.len(),
            added, "recorded exam wrong answers"
        );
        Ok(added)
    }

    //
    // ─── PROGRESS ──────────────────────────────────────────────────────────────
    //

    /// Remember the 1-based position reached in `mode` over `scope`.
    ///
    /// Retry and exam sessions never persist progress; the call is a no-op for
    /// them.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Storage` if the write fails.
    pub async fn record_progress(
        &self,
        mode: StudyMode,
        scope: QuestionScope,
        question_number: usize,
    ) -> Result<(), LedgerError> {
        if !mode.persists_progress() {
            return Ok(());
        }
        let _guard = self.write_lock.lock().await;
        let mut progress = self.progress_map().await;
        progress
            .entry(mode.as_str().to_string())
            .or_default()
            .insert(scope.as_str().to_string(), question_number.max(1));
        save_json(self.store.as_ref(), keys::PRACTICE_PROGRESS, &progress).await?;
        Ok(())
    }

    /// Saved position for `mode` over `scope`, defaulting to 1.
    pub async fn progress(&self, mode: StudyMode, scope: QuestionScope) -> usize {
        if !mode.persists_progress() {
            return 1;
        }
        self.progress_map()
            .await
            .get(mode.as_str())
            .and_then(|by_scope| by_scope.get(scope.as_str()))
            .copied()
            .filter(|n| *n > 0)
            .unwrap_or(1)
    }

    pub async fn progress_map(&self) -> ProgressMap {
        load_json_or_default(self.store.as_ref(), keys::PRACTICE_PROGRESS).await
    }

    /// # Errors
    ///
    /// Returns `LedgerError::Storage` if the key cannot be removed.
    pub async fn clear_all_progress(&self) -> Result<(), LedgerError> {
        let _guard = self.write_lock.lock().await;
        self.store.remove(keys::PRACTICE_PROGRESS).await?;
        Ok(())
    }

    //
    // ─── NOTES ─────────────────────────────────────────────────────────────────
    //

    /// Store `text` as the note for `id`. Blank text removes the note.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Storage` if the write fails.
    pub async fn save_note(&self, id: &QuestionId, text: &str) -> Result<(), LedgerError> {
        let _guard = self.write_lock.lock().await;
        let mut notes = self.notes().await;
        if text.trim().is_empty() {
            if notes.remove(id).is_none() {
                return Ok(());
            }
        } else {
            notes.insert(id.clone(), text.to_string());
        }
        save_json(self.store.as_ref(), keys::QUESTION_NOTES, &notes).await?;
        Ok(())
    }

    /// Note for `id`, or an empty string.
    pub async fn note(&self, id: &QuestionId) -> String {
        self.notes().await.remove(id).unwrap_or_default()
    }

    pub async fn notes(&self) -> NoteMap {
        load_json_or_default(self.store.as_ref(), keys::QUESTION_NOTES).await
    }

    /// # Errors
    ///
    /// Returns `LedgerError::Storage` if the key cannot be removed.
    pub async fn clear_all_notes(&self) -> Result<(), LedgerError> {
        let _guard = self.write_lock.lock().await;
        self.store.remove(keys::QUESTION_NOTES).await?;
        Ok(())
    }

    //
    // ─── BULK ──────────────────────────────────────────────────────────────────
    //

    pub async fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            answers: self.answers().await,
            wrong_answers: self.wrong_answers().await,
            progress: self.progress_map().await,
            notes: self.notes().await,
        }
    }

    /// Clear answers, wrong answers, progress and notes. Every section is
    /// attempted; the first failure is returned.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Storage` if any section could not be removed.
    pub async fn clear_everything(&self) -> Result<(), LedgerError> {
        let results = [
            self.clear_answers().await,
            self.clear_wrong_answers().await,
            self.clear_all_progress().await,
            self.clear_all_notes().await,
        ];
        let mut first_error = None;
        for result in results {
            if let Err(err) = result {
                warn!("failed to clear ledger section: {err}");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Apply imported sections. With `merge`, imported values win over
    /// existing ones and notes for the same question are concatenated;
    /// without it each present section replaces the stored one.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Storage` if any write fails.
    pub async fn import_sections(
        &self,
        sections: LedgerSections,
        merge: bool,
    ) -> Result<(), LedgerError> {
        let _guard = self.write_lock.lock().await;
        let store = self.store.as_ref();
        let LedgerSections {
            answers,
            wrong_answers,
            progress,
            notes,
        } = sections;

        if let Some(incoming) = answers {
            let mut answers = if merge { self.answers().await } else { AnswerMap::new() };
            answers.extend(incoming);
            save_json(store, keys::USER_ANSWERS, &answers).await?;
        }
        if let Some(incoming) = wrong_answers {
            let base = if merge { self.wrong_answers().await } else { Vec::new() };
            save_json(store, keys::WRONG_ANSWERS, &ordered_union(&base, &incoming)).await?;
        }
        if let Some(incoming) = progress {
            let mut progress = if merge { self.progress_map().await } else { ProgressMap::new() };
            for (mode, by_scope) in incoming {
                progress.entry(mode).or_default().extend(by_scope);
            }
            save_json(store, keys::PRACTICE_PROGRESS, &progress).await?;
        }
        if let Some(incoming) = notes {
            let notes = if merge {
                merge_notes(self.notes().await, incoming)
            } else {
                drop_blank_notes(incoming)
            };
            save_json(store, keys::QUESTION_NOTES, &notes).await?;
        }
        Ok(())
    }
}

/// Merge `incoming` notes into `existing`. Notes present on both sides with
/// different text are joined with [`NOTE_MERGE_SEPARATOR`].
#[must_use]
pub fn merge_notes(mut existing: NoteMap, incoming: NoteMap) -> NoteMap {
    for (id, text) in drop_blank_notes(incoming) {
        match existing.get_mut(&id) {
            Some(current) if current.trim().is_empty() => *current = text,
            Some(current) if *current != text => {
                current.push_str(NOTE_MERGE_SEPARATOR);
                current.push_str(&text);
            }
            Some(_) => {}
            None => {
                existing.insert(id, text);
            }
        }
    }
    existing
}

fn drop_blank_notes(notes: NoteMap) -> NoteMap {
    notes
        .into_iter()
        .filter(|(_, text)| !text.trim().is_empty())
        .collect()
}

fn ordered_union(base: &[QuestionId], extra: &[QuestionId]) -> Vec<QuestionId> {
    let mut seen = HashSet::new();
    base.iter()
        .chain(extra)
        .filter(|id| seen.insert((*id).clone()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ham_core::model::LicenseClass;
    use storage::repository::InMemoryStore;

    fn id(raw: &str) -> QuestionId {
        QuestionId::new(raw).unwrap()
    }

    fn ledger() -> (LedgerService, InMemoryStore) {
        let store = InMemoryStore::new();
        (LedgerService::new(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn answers_replace_earlier_choice() {
        let (ledger, _) = ledger();
        ledger.record_answer(&id("T1A01"), OptionKey::B).await.unwrap();
        ledger.record_answer(&id("T1A01"), OptionKey::D).await.unwrap();
        assert_eq!(ledger.answer_for(&id("T1A01")).await, Some(OptionKey::D));
        assert_eq!(ledger.answer_for(&id("T1A02")).await, None);
    }

    #[tokio::test]
    async fn wrong_answers_are_a_set_in_first_seen_order() {
        let (ledger, _) = ledger();
        assert!(ledger.record_wrong_answer(&id("T1A02")).await.unwrap());
        assert!(ledger.record_wrong_answer(&id("T1A01")).await.unwrap());
        assert!(!ledger.record_wrong_answer(&id("T1A02")).await.unwrap());
        assert_eq!(ledger.wrong_answers().await, vec![id("T1A02"), id("T1A01")]);
        assert!(ledger.is_wrong(&id("T1A01")).await);

        ledger.clear_wrong_answers().await.unwrap();
        assert!(ledger.wrong_answers().await.is_empty());
    }

    #[tokio::test]
    async fn duplicate_ids_in_storage_read_once() {
        let (ledger, store) = ledger();
        store
            .set("wrongAnswers", r#"["T1A01","T1A02","T1A01"]"#)
            .await
            .unwrap();
        assert_eq!(ledger.wrong_answers().await, vec![id("T1A01"), id("T1A02")]);
    }

    #[tokio::test]
    async fn progress_is_skipped_for_retry_and_exam() {
        let (ledger, store) = ledger();
        let scope = QuestionScope::Class(LicenseClass::Technician);
        ledger
            .record_progress(StudyMode::Retry, scope, 5)
            .await
            .unwrap();
        ledger
            .record_progress(StudyMode::Exam, scope, 9)
            .await
            .unwrap();
        assert_eq!(store.get("practiceProgress").await.unwrap(), None);
        assert_eq!(ledger.progress(StudyMode::Retry, scope).await, 1);

        ledger
            .record_progress(StudyMode::Sequential, scope, 12)
            .await
            .unwrap();
        assert_eq!(ledger.progress(StudyMode::Sequential, scope).await, 12);
        assert_eq!(ledger.progress(StudyMode::Random, scope).await, 1);
        assert_eq!(
            ledger.progress(StudyMode::Sequential, QuestionScope::All).await,
            1
        );
    }

    #[tokio::test]
    async fn blank_note_removes_entry() {
        let (ledger, _) = ledger();
        ledger.save_note(&id("G1A01"), "check band plan").await.unwrap();
        assert_eq!(ledger.note(&id("G1A01")).await, "check band plan");
        ledger.save_note(&id("G1A01"), "   ").await.unwrap();
        assert_eq!(ledger.note(&id("G1A01")).await, "");
        assert!(ledger.notes().await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_values_read_as_empty() {
        let (ledger, store) = ledger();
        store.set("userAnswers", "[oops").await.unwrap();
        store.set("questionNotes", "42").await.unwrap();
        assert!(ledger.answers().await.is_empty());
        assert!(ledger.notes().await.is_empty());
        ledger.record_answer(&id("T1A01"), OptionKey::A).await.unwrap();
        assert_eq!(ledger.answers().await.len(), 1);
    }

    #[tokio::test]
    async fn clear_everything_empties_all_sections() {
        let (ledger, _) = ledger();
        ledger.record_answer(&id("T1A01"), OptionKey::A).await.unwrap();
        ledger.record_wrong_answer(&id("T1A01")).await.unwrap();
        ledger.save_note(&id("T1A01"), "n").await.unwrap();
        ledger
            .record_progress(StudyMode::Random, QuestionScope::All, 3)
            .await
            .unwrap();
        ledger.clear_everything().await.unwrap();
        assert_eq!(ledger.snapshot().await, LedgerSnapshot::default());
    }

    #[test]
    fn merge_notes_concatenates_differing_text() {
        let existing = NoteMap::from([
            (id("T1"), "mine".to_string()),
            (id("T2"), "same".to_string()),
        ]);
        let incoming = NoteMap::from([
            (id("T1"), "theirs".to_string()),
            (id("T2"), "same".to_string()),
            (id("T3"), "new".to_string()),
            (id("T4"), " ".to_string()),
        ]);
        let merged = merge_notes(existing, incoming);
        assert_eq!(merged[&id("T1")], "mine\n---\ntheirs");
        assert_eq!(merged[&id("T2")], "same");
        assert_eq!(merged[&id("T3")], "new");
        assert!(!merged.contains_key(&id("T4")));
    }
}
