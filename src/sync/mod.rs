//! # Sync Module
//!
//! The synchronization core between the local record store and the remote
//! document store.
//!
//! ## Key Components
//!
//! - `status.rs`: the per-record `new` / `modified` / `synced` state machine
//! - `reconcile.rs`: merges remote snapshots (remote wins on shared ids)
//! - `upload.rs`: pushes the dirty set in one atomic batch
//! - `observer.rs`: the dirty-count subscription
//! - `engine.rs`: the operations exposed to UI collaborators
//! - `learner.rs`: progress and schedule transfer

pub mod status;
pub mod reconcile;
pub mod upload;
pub mod observer;
pub mod engine;
pub mod learner;

pub use status::{SyncStatus, SyncEvent, InvalidTransition};
pub use reconcile::{RemoteReconciler, ReconcileReport};
pub use upload::{BatchUploader, UploadReport};
pub use observer::EditCountObserver;
pub use engine::{SyncEngine, LoadOutcome, LoadSource, PullOutcome};
pub use learner::LearnerSync;
