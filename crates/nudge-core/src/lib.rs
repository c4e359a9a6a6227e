//! # nudge-core
//!
//! Core types, traits, configuration, and error handling for the nudge engine.

pub mod config;
pub mod conversation;
pub mod error;
pub mod message;
pub mod policy;
pub mod traits;
pub mod triage;
