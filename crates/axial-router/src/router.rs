//! Router — policy selection plus bounded, cancellable dispatch

use crate::executor::{ExecutorError, ExecutorRegistry};
use crate::executors;
use crate::policy::{
    CapabilityPolicy, ChainPolicy, LocalFirstPolicy, RoutePlan, RoutingPolicy, StaticPolicy,
};
use axial_core::config::RouterConfig;
use axial_core::{Error, Result, RouteDecision, RouteOutcome};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

pub struct Router {
    registry: ExecutorRegistry,
    policies: HashMap<String, Arc<dyn RoutingPolicy>>,
    default_strategy: String,
    timeout: Duration,
}

impl Router {
    /// Router with the `capability` and `local_first` policies.
    pub fn new(registry: ExecutorRegistry) -> Self {
        let mut router = Self {
            registry,
            policies: HashMap::new(),
            default_strategy: "capability".to_string(),
            timeout: DEFAULT_TIMEOUT,
        };
        router.add_policy(Arc::new(CapabilityPolicy::default()));
        router.add_policy(Arc::new(LocalFirstPolicy::default()));
        router
    }

    /// Build executors and all built-in policies from the `[router]` config section.
    pub fn from_config(config: &RouterConfig) -> Result<Self> {
        let mut registry = ExecutorRegistry::new();
        for executor_config in config.effective_executors() {
            let executor = executors::build(&executor_config)?;
            registry.register_arc(executor, executor_config.max_concurrent);
        }

        let names: Vec<String> = registry.list().into_iter().map(String::from).collect();
        let static_target = config
            .default_executor
            .clone()
            .or_else(|| names.first().cloned())
            .unwrap_or_default();
        let chain = if config.chain.is_empty() { names.clone() } else { config.chain.clone() };

        let mut router = Self::new(registry)
            .with_timeout(Duration::from_secs(config.timeout_secs.max(1)));
        router.add_policy(Arc::new(StaticPolicy::new(static_target)));
        router.add_policy(Arc::new(CapabilityPolicy::new(config.weights.clone())));
        router.add_policy(Arc::new(LocalFirstPolicy::new(config.weights.clone())));
        router.add_policy(Arc::new(ChainPolicy::new(chain)));

        router
            .set_default_strategy(config.default_strategy.clone())
            .map_err(|_| {
                Error::Config(format!(
                    "router.default_strategy '{}' is not one of {:?}",
                    config.default_strategy,
                    router.strategies()
                ))
            })?;

        info!(
            "Router ready: executors {:?}, default strategy {}, timeout {:?}",
            names, router.default_strategy, router.timeout
        );
        Ok(router)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_policy(mut self, policy: Arc<dyn RoutingPolicy>) -> Self {
        self.add_policy(policy);
        self
    }

    /// Register a policy. Replaces any policy with the same name.
    pub fn add_policy(&mut self, policy: Arc<dyn RoutingPolicy>) {
        self.policies.insert(policy.name().to_string(), policy);
    }

    /// Strategy used when a request names none. Must already be registered.
    pub fn set_default_strategy(&mut self, strategy: impl Into<String>) -> Result<()> {
        let strategy = strategy.into();
        if !self.policies.contains_key(&strategy) {
            return Err(Error::UnknownStrategy(strategy));
        }
        self.default_strategy = strategy;
        Ok(())
    }

    pub fn default_strategy(&self) -> &str { &self.default_strategy }

    pub fn timeout(&self) -> Duration { self.timeout }

    pub fn executor_names(&self) -> Vec<String> {
        self.registry.list().into_iter().map(String::from).collect()
    }

    /// Registered strategy names, sorted.
    pub fn strategies(&self) -> Vec<String> {
        let mut names: Vec<String> = self.policies.keys().cloned().collect();
        names.sort();
        names
    }

    /// Pick an executor without running anything.
    pub fn decide(&self, task: &str, strategy: Option<&str>) -> Result<RouteDecision> {
        let (name, plan) = self.plan(task, strategy)?;
        Ok(RouteDecision {
            executor: plan.primary,
            fallbacks: plan.fallbacks,
            strategy: name,
            explanation: plan.explanation,
        })
    }

    pub async fn route(&self, task: &str, strategy: Option<&str>) -> Result<RouteOutcome> {
        self.route_cancellable(task, strategy, CancellationToken::new()).await
    }

    /// Route a task. Fallbacks are tried in order only when the policy's plan lists them.
    pub async fn route_cancellable(
        &self,
        task: &str,
        strategy: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<RouteOutcome> {
        let (strategy, plan) = self.plan(task, strategy)?;
        let started = Instant::now();

        let mut failures = Vec::new();
        for executor in std::iter::once(&plan.primary).chain(plan.fallbacks.iter()) {
            if cancel.is_cancelled() {
                failures.push("cancelled".to_string());
                break;
            }
            match self.dispatch(executor, task, &cancel).await {
                Ok(output) => {
                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    info!("Routed task to {} via {} in {}ms", executor, strategy, elapsed_ms);
                    return Ok(RouteOutcome {
                        executor: executor.clone(),
                        output,
                        strategy,
                        explanation: plan.explanation,
                        elapsed_ms,
                    });
                }
                Err(ExecutorError::Cancelled) => {
                    warn!("Route on {} cancelled", executor);
                    failures.push("cancelled".to_string());
                    break;
                }
                Err(e) => {
                    warn!("Executor {} failed: {}", executor, e);
                    failures.push(format!("{}: {}", executor, e));
                }
            }
        }

        Err(Error::routing_failed(failures.join("; ")))
    }

    fn plan(&self, task: &str, strategy: Option<&str>) -> Result<(String, RoutePlan)> {
        if task.trim().is_empty() {
            return Err(Error::EmptyTask);
        }
        let name = strategy.unwrap_or(&self.default_strategy);
        let policy = self
            .policies
            .get(name)
            .ok_or_else(|| Error::UnknownStrategy(name.to_string()))?;
        let plan = policy.plan(task, &self.registry.candidates())?;
        debug!("Strategy {} chose {} ({})", name, plan.primary, plan.explanation);
        Ok((name.to_string(), plan))
    }

    async fn dispatch(
        &self,
        name: &str,
        task: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<String, ExecutorError> {
        let slot = self.registry.get(name).ok_or(ExecutorError::NotRegistered)?;
        let _permit = slot.try_claim()?;
        let child = cancel.child_token();

        match tokio::time::timeout(self.timeout, slot.executor().execute_cancellable(task, child.clone()))
            .await
        {
            Ok(result) => result,
            Err(_) => {
                child.cancel();
                Err(ExecutorError::TimedOut(self.timeout))
            }
        }
    }
}
