//! Core evaluation logic: hashing, rules, expiration gates and the
//! store-backed evaluation service.

pub mod evaluator;
pub mod gate;
pub mod hash;
mod service;

pub use evaluator::{Evaluator, FlagDecision, MatchReason};
pub use gate::{DisableExpired, ExpirationGate, FnGate};
pub use hash::BucketInfo;
pub use service::EvaluationService;
