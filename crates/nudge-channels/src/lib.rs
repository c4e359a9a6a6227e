//! # nudge-channels
//!
//! Chat and email platform clients for the nudge engine.

pub mod gmail;
pub mod slack;
