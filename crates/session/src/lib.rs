//! Reroll session orchestration
//!
//! This crate provides:
//! - the error taxonomy for reroll runs ([`RerollError`])
//! - patch artifact handling (read-only, `Date:` header extraction)
//! - the historical-commit locator (timestamp and binary-search strategies)
//! - the persisted session record (serde_json, written before the first
//!   mutating operation, kept across the rebase-conflict suspend point)
//! - the reroll state machine driving validate → locate → branch → apply →
//!   rebase → regenerate → verify → restore across process invocations

pub mod error;
pub mod locator;
pub mod machine;
pub mod output;
pub mod patch;
pub mod state;

// Re-exports
pub use error::RerollError;
pub use locator::{locate, locate_with, CommitRef, HistoryOracle};
pub use machine::{
    abort, resume, AssumeYes, Confirm, Outcome, Phase, RerollSession, SessionConfig, SessionEvent,
};
pub use patch::PatchArtifact;
pub use state::SessionState;
