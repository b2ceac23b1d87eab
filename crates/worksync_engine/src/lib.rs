//! # worksync engine
//!
//! Keeps independent documents (the workspace file tree, settings, the
//! extension registry and the SDK registry) consistent between a fast
//! local cache and a slower remote object store.
//!
//! This crate provides:
//! - Per-document sessions running the hydrate/debounce/persist state machine
//! - Consent gating of remote writes, scoped per account
//! - Diff-based reconciliation of the workspace files with bounded fan-out
//! - A process-wide, observable sync status
//! - Retry with exponential backoff
//!
//! ## Architecture
//!
//! A [`SyncEngine`] holds the remote store, local cache and consent store
//! and creates one [`DocumentSyncSession`] per document kind. On connect
//! every session hydrates; afterwards each local mutation restarts a
//! debounce timer, and the persist that follows writes the local cache and,
//! with consent, the remote store.
//!
//! ## Key Invariants
//!
//! - A parseable remote value wins over the local cache on hydrate
//! - Declined consent means no remote write for that document and account
//! - Persists of one session never overlap
//! - A session is idle only when the last written value is the current one
//! - Remote files are never deleted because they are missing locally

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod consent;
mod diff;
mod engine;
mod error;
mod pool;
mod session;
mod status;

pub use config::{RetryConfig, SyncConfig, DEFAULT_CONCURRENCY, DEFAULT_DEBOUNCE};
pub use consent::{ConsentDecision, ConsentPrompt, StaticConsent};
pub use diff::{remote_only, DiffOp, DiffOutcome, DiffPlan, DiffSynchronizer, OpFailure};
pub use engine::{Sessions, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use pool::{BoundedPool, PushStrategy};
pub use session::{DocumentState, DocumentSyncSession, HydrateSource, SessionState};
pub use status::{DocumentStatus, StatusHub, SyncStatus};
