//! CLI command implementations

pub mod abort;
pub mod reroll;
pub mod resume;
