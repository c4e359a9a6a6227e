//! # nudge-providers
//!
//! Classifier and generator implementations for the nudge engine.

pub mod openai;
