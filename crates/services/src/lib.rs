#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod exam;
pub mod ledger_service;
pub mod practice;
pub mod question_bank;
pub mod seed_service;
pub mod settings_service;
pub mod transfer_service;

pub use ham_core::Clock;

pub use app_services::AppServices;
pub use error::{
    AppServicesError, ExamError, LedgerError, PracticeError, QuestionBankError, SettingsError,
    TransferError,
};
pub use exam::{Advance, ExamController, ExamSession, ExamState, ExamTimer, FollowUp, TickOutcome};
pub use ledger_service::{LedgerService, LedgerSnapshot};
pub use practice::{PracticeFeedback, PracticeService, PracticeSession};
pub use question_bank::QuestionBankLoader;
pub use seed_service::{SeedPair, SeedService};
pub use settings_service::SettingsService;
pub use transfer_service::{DataExport, ImportMode, ImportReport, TransferService};
