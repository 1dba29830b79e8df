use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use ham_core::Clock;
use ham_core::model::{Seed, SeedKind};
use storage::json::{load_json, save_json};
use storage::keys::seed_key;
use storage::repository::KeyValueStore;
use tracing::{debug, warn};

/// Practice and exam seeds produced together by a regeneration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedPair {
    pub practice: Seed,
    pub exam: Seed,
}

/// Owns the persisted practice and exam seeds.
///
/// Reads never fail. A seed that cannot be persisted is kept in memory for the
/// rest of the process so orderings stay stable until the next regeneration.
pub struct SeedService {
    clock: Clock,
    store: Arc<dyn KeyValueStore>,
    unsaved: Mutex<HashMap<SeedKind, Seed>>,
}

impl SeedService {
    #[must_use]
    pub fn new(clock: Clock, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            clock,
            store,
            unsaved: Mutex::new(HashMap::new()),
        }
    }

    /// Make sure a practice seed exists. Called once at startup.
    pub async fn initialize(&self) -> Seed {
        self.get_seed(SeedKind::Practice).await
    }

    /// Current seed of `kind`, created and persisted on first use as
    /// `<millis>_<kind>`.
    pub async fn get_seed(&self, kind: SeedKind) -> Seed {
        if let Some(seed) = self.current(kind).await {
            return seed;
        }
        let seed = Seed::initial(self.clock.timestamp_millis(), kind);
        debug!(kind = %kind, seed = %seed, "created seed");
        self.persist(kind, &seed).await;
        seed
    }

    /// Current seed of `kind` without creating one. A seed held in memory
    /// after a failed write shadows whatever the store still has.
    pub async fn current(&self, kind: SeedKind) -> Option<Seed> {
        if let Some(seed) = self.unsaved_seed(kind) {
            return Some(seed);
        }
        let stored: Option<Seed> = load_json(self.store.as_ref(), seed_key(kind)).await;
        stored.filter(|seed| !seed.is_empty())
    }

    /// Replace both seeds with a fresh pair sharing one timestamp.
    ///
    /// The stamp is strictly later than the stamps of the seeds it replaces,
    /// so two regenerations within the same millisecond still differ.
    pub async fn regenerate_seeds(&self) -> SeedPair {
        let previous = self.previous_stamp(SeedKind::Practice).await.max(
            self.previous_stamp(SeedKind::Exam).await,
        );
        let stamp = self.next_stamp(previous);
        let pair = SeedPair {
            practice: Seed::practice_from_stamp(stamp),
            exam: Seed::exam_from_stamp(stamp),
        };
        self.persist(SeedKind::Practice, &pair.practice).await;
        self.persist(SeedKind::Exam, &pair.exam).await;
        debug!(practice = %pair.practice, exam = %pair.exam, "regenerated seeds");
        pair
    }

    /// Replace only the exam seed. Every exam attempt starts here, so practice
    /// orderings survive taking an exam.
    pub async fn regenerate_exam_seed(&self) -> Seed {
        let previous = self.previous_stamp(SeedKind::Exam).await;
        let seed = Seed::exam_from_stamp(self.next_stamp(previous));
        self.persist(SeedKind::Exam, &seed).await;
        debug!(seed = %seed, "regenerated exam seed");
        seed
    }

    /// Overwrite the seed of `kind` with an imported value.
    pub async fn restore(&self, kind: SeedKind, seed: Seed) {
        if seed.is_empty() {
            return;
        }
        self.persist(kind, &seed).await;
    }

    async fn previous_stamp(&self, kind: SeedKind) -> Option<i64> {
        self.current(kind)
            .await
            .and_then(|seed| seed.timestamp_millis())
    }

    fn next_stamp(&self, previous: Option<i64>) -> i64 {
        let now = self.clock.timestamp_millis();
        match previous {
            Some(prev) if prev >= now => prev.saturating_add(1),
            _ => now,
        }
    }

    async fn persist(&self, kind: SeedKind, seed: &Seed) {
        let mut unsaved = self.unsaved.lock().unwrap_or_else(PoisonError::into_inner);
        unsaved.remove(&kind);
        drop(unsaved);

        if let Err(err) = save_json(self.store.as_ref(), seed_key(kind), seed).await {
            warn!(kind = %kind, "failed to persist seed, keeping it in memory: {err}");
            self.unsaved
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(kind, seed.clone());
        }
    }

    fn unsaved_seed(&self, kind: SeedKind) -> Option<Seed> {
        self.unsaved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
    }
}
