//! Expiration gates.
//!
//! A gate is consulted only for flags whose `expires` time has passed. It can
//! force the result (`Some(true)` / `Some(false)`) or return `None` to let the
//! normal rules decide.

use crate::flag::Flag;
use crate::Result;

use async_trait::async_trait;

/// Strategy invoked when an expired flag is evaluated.
#[async_trait]
pub trait ExpirationGate: Send + Sync {
    /// Decide the result for an expired flag, or defer with `None`.
    ///
    /// Errors are returned to the caller of the evaluation unchanged.
    async fn on_expired(&self, flag: &Flag) -> Result<Option<bool>>;
}

/// Gate backed by a plain synchronous closure.
pub struct FnGate<F> {
    f: F,
}

impl<F> FnGate<F>
where
    F: Fn(&Flag) -> Option<bool> + Send + Sync,
{
    /// Wrap a closure as a gate.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> ExpirationGate for FnGate<F>
where
    F: Fn(&Flag) -> Option<bool> + Send + Sync,
{
    async fn on_expired(&self, flag: &Flag) -> Result<Option<bool>> {
        Ok((self.f)(flag))
    }
}

/// Gate that turns every expired flag off.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisableExpired;

#[async_trait]
impl ExpirationGate for DisableExpired {
    async fn on_expired(&self, flag: &Flag) -> Result<Option<bool>> {
        tracing::debug!(flag = %flag.name, "expired flag disabled");
        Ok(Some(false))
    }
}
