//! # nudge-memory
//!
//! SQLite-backed persistent store for the nudge engine.

pub mod records;
pub mod store;

pub use records::{Followup, Integration, NewFollowup, NewProcessedMessage, ProcessedMessage};
pub use store::Store;
