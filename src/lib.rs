//! # Flag Engine
//!
//! Boolean feature flag evaluation with deterministic percentage rollouts and
//! a TTL cache in front of the flag store.
//!
//! ## Features
//!
//! - **Rule Evaluation**: everyone override, user allow-lists, groups, roles
//!   and percentage rollouts, checked in that order
//! - **Stable Bucketing**: MurmurHash3 (x86, 32-bit, seed 0) user buckets
//! - **Expiration Gates**: pluggable strategy for flags past their expiry
//! - **Caching**: order-independent cache keys over an in-memory TTL cache or
//!   any other [`CacheBackend`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flag_engine::{EvaluationContext, Flag, FlagEngine, MemoryFlagStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> flag_engine::Result<()> {
//!     let store = MemoryFlagStore::with_flags(vec![
//!         Flag::builder("new-checkout").group("beta").percent(10.0).build(),
//!     ])?;
//!
//!     let engine = FlagEngine::builder()
//!         .with_store(Arc::new(store))
//!         .build()
//!         .await?;
//!
//!     let context = EvaluationContext::builder()
//!         .with_user("user-123")
//!         .with_group("beta")
//!         .build();
//!
//!     if engine.evaluate("new-checkout", &context).await? {
//!         println!("new checkout enabled");
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod api;
pub mod cache;
pub mod config;
pub mod core;
pub mod error;
pub mod flag;
pub mod store;
pub mod telemetry;

// Re-export main types for convenience
pub use api::{EvaluationContext, EvaluationContextBuilder, FlagEngine, FlagEngineBuilder};
pub use cache::{derive_key, CacheBackend, CacheStats, TtlCache};
pub use crate::config::Config;
pub use crate::core::{
    BucketInfo, DisableExpired, EvaluationService, Evaluator, ExpirationGate, FlagDecision,
    FnGate, MatchReason,
};
pub use error::{Error, Result};
pub use flag::{Flag, FlagBuilder, FlagDocument};
pub use store::{FlagStore, MemoryFlagStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
