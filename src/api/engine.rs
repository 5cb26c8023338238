//! Flag engine: cached evaluation on top of the evaluation service.

use super::EvaluationContext;
use crate::cache::{self, CacheBackend, TtlCache};
use crate::config::{CacheBackendKind, Config};
use crate::core::gate::ExpirationGate;
use crate::core::hash::{self, BucketInfo};
use crate::core::{EvaluationService, MatchReason};
use crate::store::FlagStore;
use crate::telemetry::{Telemetry, TelemetryMetrics};
use crate::{Error, Result};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// The main entry point for checking flags.
///
/// Single-flag checks are memoized in the configured cache, keyed by the
/// flag name and the user, roles and groups of the context. Batch checks
/// always go to the store.
pub struct FlagEngine {
    /// Store lookups, gating and rules
    service: EvaluationService,
    /// Evaluation cache
    cache: Option<Arc<dyn CacheBackend<bool>>>,
    /// TTL for cached evaluations
    ttl: Duration,
    /// Telemetry instance
    telemetry: Option<Telemetry>,
    /// Configuration
    config: Config,
}

impl FlagEngine {
    /// Create a flag engine builder.
    pub fn builder() -> FlagEngineBuilder {
        FlagEngineBuilder::new()
    }

    /// Evaluate a flag for the given context.
    ///
    /// A cached result is returned without touching the store. On a miss the
    /// flag is evaluated and the result, active or not, is cached. Two
    /// concurrent misses for the same key may both reach the store.
    ///
    /// A failing cache backend is logged and bypassed; only store and gate
    /// errors reach the caller.
    pub async fn evaluate(&self, name: &str, context: &EvaluationContext) -> Result<bool> {
        let start = Instant::now();
        let key = cache::context_key(name, context);

        if let Some(ref cache) = self.cache {
            match cache.get(&key).await {
                Ok(Some(active)) => {
                    debug!(flag = name, key = %key, active, "cache hit");
                    self.record(active, start, Some(true));
                    return Ok(active);
                }
                Ok(None) => {}
                Err(e) => self.cache_failure("read", &key, &e),
            }
        }

        let decision = match self.service.evaluate_one_detailed(name, context).await {
            Ok(decision) => decision,
            Err(e) => {
                if let Some(ref telemetry) = self.telemetry {
                    telemetry.record_error(&e);
                }
                return Err(e);
            }
        };
        if let (MatchReason::Expired, Some(telemetry)) = (&decision.reason, &self.telemetry) {
            telemetry.record_gate_override();
        }
        let active = decision.active;

        if let Some(ref cache) = self.cache {
            debug!(flag = name, key = %key, active, "cache miss");
            if let Err(e) = cache.set(&key, active, Some(self.ttl)).await {
                self.cache_failure("write", &key, &e);
            }
        }

        self.record(active, start, self.cache.as_ref().map(|_| false));
        Ok(active)
    }

    /// Evaluate several flags, or every flag when `names` is `None`.
    ///
    /// Results are not cached.
    pub async fn evaluate_many(
        &self,
        names: Option<&[String]>,
        context: &EvaluationContext,
    ) -> Result<HashMap<String, bool>> {
        let results = self.service.evaluate_many(names, context).await;
        if let (Err(e), Some(telemetry)) = (&results, &self.telemetry) {
            telemetry.record_error(e);
        }
        results
    }

    /// Hash and rollout bucket for a user.
    pub fn bucket_info(&self, user: &str) -> BucketInfo {
        hash::bucket_info(user)
    }

    /// Drop the cached result for one flag and context.
    pub async fn invalidate(&self, name: &str, context: &EvaluationContext) -> Result<()> {
        if let Some(ref cache) = self.cache {
            cache.delete(&cache::context_key(name, context)).await?;
        }
        Ok(())
    }

    /// Clear the evaluation cache.
    pub async fn clear_cache(&self) -> Result<()> {
        if let Some(ref cache) = self.cache {
            cache.clear().await?;
        }
        Ok(())
    }

    /// The evaluation cache, for direct management.
    pub fn cache(&self) -> Option<&Arc<dyn CacheBackend<bool>>> {
        self.cache.as_ref()
    }

    /// TTL applied to cached evaluations.
    pub fn cache_ttl(&self) -> Duration {
        self.ttl
    }

    /// The uncached evaluation service.
    pub fn service(&self) -> &EvaluationService {
        &self.service
    }

    /// Get evaluation metrics, if telemetry is enabled.
    pub fn metrics(&self) -> Option<TelemetryMetrics> {
        self.telemetry.as_ref().map(Telemetry::metrics)
    }

    /// Get the engine configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn record(&self, active: bool, start: Instant, cached: Option<bool>) {
        if let Some(ref telemetry) = self.telemetry {
            telemetry.record_evaluation(active, start.elapsed().as_secs_f64() * 1000.0, cached);
        }
    }

    fn cache_failure(&self, operation: &str, key: &str, error: &Error) {
        warn!(operation, key, error = %error, "cache unavailable, falling back to the store");
        if let Some(ref telemetry) = self.telemetry {
            telemetry.record_error(error);
        }
    }
}

/// Builder for creating flag engines.
#[derive(Default)]
pub struct FlagEngineBuilder {
    config: Option<Config>,
    store: Option<Arc<dyn FlagStore>>,
    gate: Option<Arc<dyn ExpirationGate>>,
    cache_backend: Option<Arc<dyn CacheBackend<bool>>>,
    cache_enabled: Option<bool>,
    cache_ttl: Option<Duration>,
    telemetry_enabled: Option<bool>,
}

impl FlagEngineBuilder {
    /// Create a new flag engine builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the flag store. Required.
    pub fn with_store(mut self, store: Arc<dyn FlagStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Install an expiration gate.
    pub fn with_gate(mut self, gate: Arc<dyn ExpirationGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Use a specific cache backend instead of the configured one.
    pub fn with_cache_backend(mut self, backend: Arc<dyn CacheBackend<bool>>) -> Self {
        self.cache_backend = Some(backend);
        self
    }

    /// Enable or disable caching.
    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = Some(enabled);
        self
    }

    /// Set the TTL of cached evaluations.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Enable or disable telemetry.
    pub fn with_telemetry_enabled(mut self, enabled: bool) -> Self {
        self.telemetry_enabled = Some(enabled);
        self
    }

    /// Build the flag engine.
    pub async fn build(self) -> Result<FlagEngine> {
        let mut config = self.config.unwrap_or_default();

        // Apply builder overrides
        if let Some(enabled) = self.cache_enabled {
            config.cache.enabled = enabled;
        }
        if let Some(ttl) = self.cache_ttl {
            // Sub-second TTLs are kept exact on the engine itself.
            config.cache.ttl_secs = ttl.as_secs().max(1);
        }
        if let Some(enabled) = self.telemetry_enabled {
            config.telemetry.enabled = enabled;
        }
        // A supplied backend replaces whatever the config selects.
        if self.cache_backend.is_some() {
            config.validate_settings()?;
        } else {
            config.validate()?;
        }

        let store = self
            .store
            .ok_or_else(|| Error::config("A flag store is required to build a flag engine"))?;

        let mut service = EvaluationService::new(store);
        if let Some(gate) = self.gate {
            service = service.with_gate(gate);
        }

        let cache: Option<Arc<dyn CacheBackend<bool>>> = if config.cache.enabled {
            let backend: Arc<dyn CacheBackend<bool>> = match self.cache_backend {
                Some(backend) => backend,
                None => match config.cache.backend {
                    CacheBackendKind::Memory => Arc::new(TtlCache::<bool>::new()),
                    CacheBackendKind::Redis => connect_redis(&config).await?,
                },
            };
            Some(backend)
        } else {
            None
        };

        let telemetry = config
            .telemetry
            .enabled
            .then(Telemetry::new);

        debug!(
            cache_enabled = cache.is_some(),
            ttl_secs = config.cache.ttl_secs,
            gate = service.has_gate(),
            "flag engine built"
        );

        Ok(FlagEngine {
            service,
            cache,
            ttl: self.cache_ttl.unwrap_or_else(|| config.cache.ttl()),
            telemetry,
            config,
        })
    }
}

#[cfg(feature = "redis-cache")]
async fn connect_redis(config: &Config) -> Result<Arc<dyn CacheBackend<bool>>> {
    let url = config
        .cache
        .redis_url
        .as_deref()
        .ok_or_else(|| Error::config_key("Redis cache backend requires a URL", "cache.redis_url"))?;
    Ok(Arc::new(cache::RedisCache::<bool>::connect(url).await?))
}

#[cfg(not(feature = "redis-cache"))]
async fn connect_redis(_config: &Config) -> Result<Arc<dyn CacheBackend<bool>>> {
    Err(Error::config_key(
        "Redis cache backend requires the redis-cache feature",
        "cache.backend",
    ))
}
