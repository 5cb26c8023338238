//! Evaluation service: store lookups, expiration gating and rule evaluation.

use super::evaluator::{Evaluator, FlagDecision, MatchReason};
use super::gate::ExpirationGate;
use crate::api::EvaluationContext;
use crate::flag::Flag;
use crate::store::FlagStore;
use crate::Result;

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Evaluates flags fetched from a [`FlagStore`].
///
/// Store and gate errors are returned exactly as produced. A flag that does
/// not exist evaluates to `false`.
#[derive(Clone)]
pub struct EvaluationService {
    store: Arc<dyn FlagStore>,
    gate: Option<Arc<dyn ExpirationGate>>,
    evaluator: Evaluator,
}

impl EvaluationService {
    /// Create a service over the given store with no expiration gate.
    pub fn new(store: Arc<dyn FlagStore>) -> Self {
        Self {
            store,
            gate: None,
            evaluator: Evaluator::new(),
        }
    }

    /// Install an expiration gate.
    pub fn with_gate(mut self, gate: Arc<dyn ExpirationGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn FlagStore> {
        &self.store
    }

    /// Whether an expiration gate is installed.
    pub fn has_gate(&self) -> bool {
        self.gate.is_some()
    }

    /// Evaluate a single flag.
    pub async fn evaluate_one(&self, name: &str, context: &EvaluationContext) -> Result<bool> {
        Ok(self.evaluate_one_detailed(name, context).await?.active)
    }

    /// Evaluate a single flag and report which rule decided.
    #[instrument(level = "debug", skip(self, context), fields(user = ?context.user))]
    pub async fn evaluate_one_detailed(
        &self,
        name: &str,
        context: &EvaluationContext,
    ) -> Result<FlagDecision> {
        match self.store.get_by_name(name).await? {
            Some(flag) => self.decide(&flag, context).await,
            None => {
                debug!(flag = name, "flag not found");
                Ok(FlagDecision::not_found())
            }
        }
    }

    /// Evaluate several flags with a single store fetch.
    ///
    /// With `names` set to `None` every flag in the store is evaluated.
    /// Requested names that do not exist map to `false`.
    #[instrument(level = "debug", skip_all, fields(requested = ?names.map(|n| n.len())))]
    pub async fn evaluate_many(
        &self,
        names: Option<&[String]>,
        context: &EvaluationContext,
    ) -> Result<HashMap<String, bool>> {
        let mut results = HashMap::new();

        match names {
            None => {
                for flag in self.store.list().await? {
                    let decision = self.decide(&flag, context).await?;
                    results.insert(flag.name, decision.active);
                }
            }
            Some(names) => {
                let mut flags: HashMap<String, Flag> = self
                    .store
                    .get_many_by_name(names)
                    .await?
                    .into_iter()
                    .map(|flag| (flag.name.clone(), flag))
                    .collect();

                for name in names {
                    if results.contains_key(name) {
                        continue;
                    }
                    let active = match flags.remove(name) {
                        Some(flag) => self.decide(&flag, context).await?.active,
                        None => false,
                    };
                    results.insert(name.clone(), active);
                }
            }
        }

        Ok(results)
    }

    /// Apply the expiration gate, then the rules.
    async fn decide(&self, flag: &Flag, context: &EvaluationContext) -> Result<FlagDecision> {
        if flag.is_expired_at(Utc::now()) {
            match &self.gate {
                Some(gate) => {
                    if let Some(active) = gate.on_expired(flag).await? {
                        debug!(flag = %flag.name, active, "expiration gate override");
                        return Ok(FlagDecision::new(active, MatchReason::Expired));
                    }
                }
                None => {
                    warn!(flag = %flag.name, "flag expired but no expiration gate is configured");
                }
            }
        }

        let decision = self.evaluator.explain(flag, context);
        debug!(flag = %flag.name, active = decision.active, reason = ?decision.reason, "flag evaluated");
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gate::{DisableExpired, FnGate};
    use crate::store::MemoryFlagStore;
    use crate::Error;
    use async_trait::async_trait;
    use chrono::Duration;

    fn expired(name: &str) -> Flag {
        Flag::builder(name)
            .everyone(true)
            .expires(Utc::now() - Duration::hours(1))
            .build()
    }

    fn service(flags: Vec<Flag>) -> EvaluationService {
        EvaluationService::new(Arc::new(MemoryFlagStore::with_flags(flags).unwrap()))
    }

    struct FailingStore;

    #[async_trait]
    impl FlagStore for FailingStore {
        async fn get_by_name(&self, name: &str) -> Result<Option<Flag>> {
            Err(Error::store_for_flag("connection refused", name))
        }

        async fn get_many_by_name(&self, _names: &[String]) -> Result<Vec<Flag>> {
            Err(Error::store("connection refused"))
        }

        async fn list(&self) -> Result<Vec<Flag>> {
            Err(Error::store("connection refused"))
        }
    }

    struct FailingGate;

    #[async_trait]
    impl ExpirationGate for FailingGate {
        async fn on_expired(&self, flag: &Flag) -> Result<Option<bool>> {
            Err(Error::gate_for_flag("metrics sink down", &flag.name))
        }
    }

    #[tokio::test]
    async fn test_missing_flag_is_false() {
        let service = service(vec![]);
        let decision = service
            .evaluate_one_detailed("missing", &EvaluationContext::for_user("u1"))
            .await
            .unwrap();
        assert_eq!(decision, FlagDecision::not_found());
    }

    #[tokio::test]
    async fn test_expired_without_gate_is_inert() {
        let service = service(vec![expired("f")]);
        assert!(service.evaluate_one("f", &EvaluationContext::new()).await.unwrap());
    }

    #[tokio::test]
    async fn test_gate_override() {
        let service = service(vec![expired("f")]).with_gate(Arc::new(DisableExpired));
        let decision = service
            .evaluate_one_detailed("f", &EvaluationContext::new())
            .await
            .unwrap();
        assert_eq!(decision, FlagDecision::new(false, MatchReason::Expired));
    }

    #[tokio::test]
    async fn test_gate_defers_to_rules() {
        let service = service(vec![expired("f")]).with_gate(Arc::new(FnGate::new(|_: &Flag| None)));
        assert!(service.evaluate_one("f", &EvaluationContext::new()).await.unwrap());
    }

    #[tokio::test]
    async fn test_gate_not_consulted_before_expiry() {
        let flag = Flag::builder("f")
            .everyone(true)
            .expires(Utc::now() + Duration::hours(1))
            .build();
        let service = service(vec![flag]).with_gate(Arc::new(FailingGate));
        assert!(service.evaluate_one("f", &EvaluationContext::new()).await.unwrap());
    }

    #[tokio::test]
    async fn test_gate_error_propagates() {
        let service = service(vec![expired("f")]).with_gate(Arc::new(FailingGate));
        let err = service.evaluate_one("f", &EvaluationContext::new()).await.unwrap_err();
        assert!(matches!(err, Error::Gate { .. }));
    }

    #[tokio::test]
    async fn test_store_error_propagates() {
        let service = EvaluationService::new(Arc::new(FailingStore));
        let err = service.evaluate_one("f", &EvaluationContext::new()).await.unwrap_err();
        match err {
            Error::Store { flag, .. } => assert_eq!(flag.as_deref(), Some("f")),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(service.evaluate_many(None, &EvaluationContext::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_evaluate_many_named() {
        let service = service(vec![
            Flag::builder("on").everyone(true).build(),
            Flag::builder("admins").role("admin").build(),
        ]);
        let names = vec!["on".to_string(), "admins".to_string(), "missing".to_string()];
        let ctx = EvaluationContext::builder().with_role("user").build();

        let results = service.evaluate_many(Some(&names), &ctx).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results["on"], true);
        assert_eq!(results["admins"], false);
        assert_eq!(results["missing"], false);
    }

    #[tokio::test]
    async fn test_evaluate_many_all() {
        let service = service(vec![
            Flag::builder("on").everyone(true).build(),
            Flag::builder("off").everyone(false).build(),
            expired("old"),
        ])
        .with_gate(Arc::new(DisableExpired));

        let results = service.evaluate_many(None, &EvaluationContext::new()).await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(results["on"]);
        assert!(!results["off"]);
        assert!(!results["old"]);
    }
}
