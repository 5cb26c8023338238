//! Public API for the flag engine.
//!
//! This module provides the main interface for checking flags: the
//! `FlagEngine` facade and the evaluation context type.

mod context;
mod engine;

pub use context::{EvaluationContext, EvaluationContextBuilder};
pub use engine::{FlagEngine, FlagEngineBuilder};
