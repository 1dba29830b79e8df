use std::sync::Arc;

use ham_core::model::{LicenseClass, Question};
use storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::exam::{ExamController, TICK_PERIOD};
use crate::ledger_service::LedgerService;
use crate::practice::PracticeService;
use crate::seed_service::SeedService;
use crate::settings_service::SettingsService;
use crate::transfer_service::TransferService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    seeds: Arc<SeedService>,
    ledger: Arc<LedgerService>,
    settings: Arc<SettingsService>,
    practice: Arc<PracticeService>,
    transfer: Arc<TransferService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::new(&storage, clock).await)
    }

    /// Build services over an ephemeral in-memory store.
    pub async fn in_memory(clock: Clock) -> Self {
        Self::new(&Storage::in_memory(), clock).await
    }

    /// Wire every service to `storage` and make sure a practice seed exists.
    pub async fn new(storage: &Storage, clock: Clock) -> Self {
        let seeds = Arc::new(SeedService::new(clock, Arc::clone(&storage.kv)));
        let ledger = Arc::new(LedgerService::new(Arc::clone(&storage.kv)));
        let settings = Arc::new(SettingsService::new(Arc::clone(&storage.kv)));
        let practice = Arc::new(PracticeService::new(
            Arc::clone(&seeds),
            Arc::clone(&ledger),
        ));
        let transfer = Arc::new(TransferService::new(
            clock,
            Arc::clone(&seeds),
            Arc::clone(&ledger),
            Arc::clone(&settings),
        ));
        seeds.initialize().await;

        Self {
            clock,
            seeds,
            ledger,
            settings,
            practice,
            transfer,
        }
    }

    /// Exam controller for `class` with the saved auto-advance preference and
    /// a one-second background countdown.
    pub async fn exam_controller(&self, class: LicenseClass, bank: &[Question]) -> ExamController {
        ExamController::new(class, bank, Arc::clone(&self.seeds), Arc::clone(&self.ledger))
            .with_clock(self.clock)
            .with_auto_advance(self.settings.auto_advance().await)
            .with_countdown(TICK_PERIOD)
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn seeds(&self) -> Arc<SeedService> {
        Arc::clone(&self.seeds)
    }

    #[must_use]
    pub fn ledger(&self) -> Arc<LedgerService> {
        Arc::clone(&self.ledger)
    }

    #[must_use]
    pub fn settings(&self) -> Arc<SettingsService> {
        Arc::clone(&self.settings)
    }

    #[must_use]
    pub fn practice(&self) -> Arc<PracticeService> {
        Arc::clone(&self.practice)
    }

    #[must_use]
    pub fn transfer(&self) -> Arc<TransferService> {
        Arc::clone(&self.transfer)
    }
}
