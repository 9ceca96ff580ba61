//! Core domain logic for Stepler.
//! This crate is the single source of truth for the today/history timeline
//! invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod reminder;
pub mod repo;
pub mod schedule;
pub mod search;
pub mod service;
pub mod timeline;

pub use config::CoreConfig;
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LogTarget};
pub use model::document::{AppDocument, DocumentPatch};
pub use model::task::{DayKey, DeletedTask, HistoryDay, Subtask, Task, TaskId};
pub use reminder::fire_tracker::{FireTracker, ReminderFire};
pub use reminder::notifier::{FallbackNotifier, Notifier, NullNotifier, NOTIFICATION_TITLE};
pub use repo::document_repo::{
    DocumentRepository, RepoError, RepoResult, SqliteDocumentRepository,
};
pub use repo::json_file_repo::JsonFileDocumentRepository;
pub use schedule::{Scheduler, TimerKind};
pub use search::{search_timeline, SearchHit};
pub use service::timeline_service::{ServiceError, ServiceResult, TimelineService};
pub use timeline::day_key::{day_key, day_key_of, is_timestamp_id};
pub use timeline::reconcile::{reconcile, ReconcileReport, Reconciled, Timeline};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
