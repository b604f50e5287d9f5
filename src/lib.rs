//! Curriculum Sync - Main Library
//!
//! Local-first synchronization core for authoring hierarchical curriculum
//! content (study plans → chapters → lessons → videos). Edits are applied to
//! a durable local store immediately and reconciled with a remote document
//! store on demand.
//!
//! # Overview
//!
//! The library provides:
//! - A durable key-value abstraction with in-memory and file-backed stores
//! - A record store that attaches sync metadata (`new` / `modified` / `synced`)
//!   to every entity
//! - A remote reconciler that merges a fetched snapshot without discarding
//!   local-only records
//! - A batch uploader that pushes every dirty record in one atomic write
//! - An edit-count observer for "unsynced changes" badges
//!
//! # Module Structure
//!
//! - **`shared`** - Errors, configuration, identity and logging bootstrap
//! - **`local`** - Durable key-value stores, the record store, cache
//!   metadata and progress blobs
//! - **`remote`** - The remote document store contract plus in-memory and
//!   HTTP implementations
//! - **`sync`** - State machine, reconciler, uploader, observer and the
//!   `SyncEngine` facade
//! - **`curriculum`** - The concrete study plan payload, progress types and
//!   JSON import/export
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use curriculum_sync::local::MemoryStore;
//! use curriculum_sync::remote::MemoryRemote;
//! use curriculum_sync::sync::SyncEngine;
//! use curriculum_sync::curriculum::StudyPlan;
//!
//! # async fn example() -> curriculum_sync::Result<()> {
//! let engine: SyncEngine<StudyPlan> = SyncEngine::open(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(MemoryRemote::new()),
//! );
//!
//! engine.upsert_local("p1", StudyPlan::new("Algebra", "Maths"))?;
//! assert_eq!(engine.dirty_count(), 1);
//!
//! engine.push_to_remote().await?;
//! assert_eq!(engine.dirty_count(), 0);
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! All record mutations are expected to happen on one logical thread of
//! control. Network calls are the only suspension points; local state is
//! only changed after a remote call has completed.
//!
//! # Feature Flags
//!
//! - **`cli`** (default) - builds the `curriculum-sync` binary and the
//!   tracing subscriber bootstrap

/// Shared error, configuration and identity types
pub mod shared;

/// Local durable storage
pub mod local;

/// Remote document store
pub mod remote;

/// Synchronization core
pub mod sync;

/// Curriculum payload types
pub mod curriculum;

pub use shared::error::{Result, SyncError};
pub use shared::config::{SyncConfig, SyncConfigBuilder, ConfigError};
pub use shared::identity::Identity;
