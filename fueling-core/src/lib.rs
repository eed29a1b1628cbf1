pub mod app;
pub mod config;
pub mod export;
pub mod models;
pub mod persistence;
pub mod seed;
pub mod storage;
pub mod store;
pub mod views;

// Re-export commonly used types
pub use app::{resolve_data_dir, ActiveView, App, AppError};
pub use config::{Settings, ViewMode, ViewTiming};
pub use export::{ExportError, ExportFormat};
pub use models::{FuelingRequest, Message, ModelError, RequestDraft, RequestStatus, Sender};
pub use persistence::{Persistence, PersistenceError};
pub use storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, StorageError};
pub use store::{RequestStore, StatusCounts, UpdateOutcome, UpdateRejection};
pub use views::{
    ActionError, ActionOutcome, Capability, FieldErrors, FormField, OperatorAction, OperatorView,
    PendingConfirmation, RequestControls, RequestForm, RequesterView, SubmitOutcome, Toast,
};
