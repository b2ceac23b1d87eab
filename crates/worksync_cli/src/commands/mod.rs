//! CLI command implementations.

pub mod bench;
pub mod consent;
pub mod inspect;
