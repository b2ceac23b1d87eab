//! # worksync testkit
//!
//! Test utilities for worksync.
//!
//! This crate provides:
//! - Engine fixtures wired to in-memory stores
//! - Sample workspace trees and numbered file sets
//! - Property-based test generators using proptest
//! - Stress helpers driving many concurrent mutations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use worksync_testkit::prelude::*;
//!
//! #[tokio::test(start_paused = true)]
//! async fn settings_reach_the_remote() {
//!     let fx = EngineFixture::granting();
//!     let settings = fx.engine.session::<AppSettings>();
//!     fx.engine.connect(Some("alice")).await;
//!     // ... mutate, settle, inspect fx.remote
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
