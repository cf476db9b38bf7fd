//! Routing policies — pluggable executor selection strategies
//!
//! A policy sees a snapshot of the registered executors and returns a
//! RoutePlan. Only plans with `fallbacks` allow the router to try another
//! executor after a failure.

use axial_core::{Error, PrivacyLevel, Result};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// What a policy knows about one executor.
#[derive(Clone, Debug)]
pub struct Candidate {
    pub name: String,
    pub capabilities: Vec<String>,
    pub privacy: PrivacyLevel,
    /// Has a free concurrency slot right now.
    pub available: bool,
    pub in_flight: usize,
    /// Registration order.
    pub order: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RoutePlan {
    pub primary: String,
    pub fallbacks: Vec<String>,
    pub explanation: String,
}

pub trait RoutingPolicy: Send + Sync {
    /// Strategy name requests select this policy by.
    fn name(&self) -> &str;

    fn plan(&self, task: &str, candidates: &[Candidate]) -> Result<RoutePlan>;
}

// ---------------------------------------------------------------------------
// static: always the same executor
// ---------------------------------------------------------------------------

pub struct StaticPolicy {
    executor: String,
}

impl StaticPolicy {
    pub fn new(executor: impl Into<String>) -> Self {
        Self { executor: executor.into() }
    }
}

impl RoutingPolicy for StaticPolicy {
    fn name(&self) -> &str { "static" }

    fn plan(&self, _task: &str, candidates: &[Candidate]) -> Result<RoutePlan> {
        if !candidates.iter().any(|c| c.name == self.executor) {
            return Err(Error::routing_failed(format!(
                "static executor '{}' is not registered",
                self.executor
            )));
        }
        Ok(RoutePlan {
            primary: self.executor.clone(),
            fallbacks: Vec::new(),
            explanation: format!("Static route to {}", self.executor),
        })
    }
}

// ---------------------------------------------------------------------------
// capability: weighted keyword match between task and capabilities
// ---------------------------------------------------------------------------

pub struct CapabilityPolicy {
    weights: HashMap<String, f64>,
}

impl CapabilityPolicy {
    pub fn new(weights: HashMap<String, f64>) -> Self {
        Self { weights }
    }

    fn weight(&self, capability: &str) -> f64 {
        self.weights.get(capability).copied().unwrap_or(1.0)
    }

    /// Sum of weights of the capabilities the task mentions, and which ones matched.
    fn score(&self, words: &HashSet<String>, candidate: &Candidate) -> (f64, Vec<String>) {
        let mut score = 0.0;
        let mut matched = Vec::new();
        for capability in &candidate.capabilities {
            if capability_matches(capability, words) {
                score += self.weight(capability);
                matched.push(capability.clone());
            }
        }
        (score, matched)
    }
}

impl Default for CapabilityPolicy {
    fn default() -> Self { Self::new(HashMap::new()) }
}

impl RoutingPolicy for CapabilityPolicy {
    fn name(&self) -> &str { "capability" }

    fn plan(&self, task: &str, candidates: &[Candidate]) -> Result<RoutePlan> {
        let words = task_words(task);
        let best = candidates
            .iter()
            .filter(|c| c.available)
            .map(|c| {
                let (score, matched) = self.score(&words, c);
                (c, score, matched)
            })
            .fold(None, |best: Option<(&Candidate, f64, Vec<String>)>, item| match best {
                Some(b) if b.1 > item.1 || (b.1 == item.1 && b.0.order <= item.0.order) => Some(b),
                _ => Some(item),
            });

        match best {
            Some((candidate, score, matched)) => Ok(RoutePlan {
                primary: candidate.name.clone(),
                fallbacks: Vec::new(),
                explanation: if matched.is_empty() {
                    format!("No capability matched; first available executor {}", candidate.name)
                } else {
                    format!("Selected {} (score {:.1}, matched {:?})", candidate.name, score, matched)
                },
            }),
            None => Err(no_available(candidates)),
        }
    }
}

// ---------------------------------------------------------------------------
// local_first: keep task text on the machine when possible
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct LocalFirstPolicy {
    capability: CapabilityPolicy,
}

impl LocalFirstPolicy {
    pub fn new(weights: HashMap<String, f64>) -> Self {
        Self { capability: CapabilityPolicy::new(weights) }
    }
}

impl RoutingPolicy for LocalFirstPolicy {
    fn name(&self) -> &str { "local_first" }

    fn plan(&self, task: &str, candidates: &[Candidate]) -> Result<RoutePlan> {
        let local: Vec<Candidate> = candidates
            .iter()
            .filter(|c| c.privacy == PrivacyLevel::Local)
            .cloned()
            .collect();
        let pool = if local.iter().any(|c| c.available) {
            local
        } else {
            warn!("No local executor available; considering cloud executors");
            candidates.to_vec()
        };
        let mut plan = self.capability.plan(task, &pool)?;
        plan.explanation = format!("local-first: {}", plan.explanation);
        Ok(plan)
    }
}

// ---------------------------------------------------------------------------
// chain: explicit ordered fallback chain
// ---------------------------------------------------------------------------

pub struct ChainPolicy {
    chain: Vec<String>,
}

impl ChainPolicy {
    pub fn new(chain: Vec<String>) -> Self {
        Self { chain }
    }
}

impl RoutingPolicy for ChainPolicy {
    fn name(&self) -> &str { "chain" }

    fn plan(&self, _task: &str, candidates: &[Candidate]) -> Result<RoutePlan> {
        let mut known = self
            .chain
            .iter()
            .filter(|name| {
                let registered = candidates.iter().any(|c| &c.name == *name);
                if !registered {
                    warn!("Chain executor {} is not registered; skipping", name);
                }
                registered
            })
            .cloned();

        let primary = known
            .next()
            .ok_or_else(|| Error::routing_failed("fallback chain has no registered executors"))?;
        let fallbacks: Vec<String> = known.collect();
        Ok(RoutePlan {
            explanation: format!("Chain {} then {:?}", primary, fallbacks),
            primary,
            fallbacks,
        })
    }
}

fn no_available(candidates: &[Candidate]) -> Error {
    if candidates.is_empty() {
        Error::routing_failed("no executors registered")
    } else {
        Error::routing_failed("all executors are at capacity")
    }
}

/// Lowercased alphanumeric words of the task text.
fn task_words(task: &str) -> HashSet<String> {
    task.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// A capability matches when it is itself a task word ("go", "ui"), or when
/// one of the parts of a compound like "code-editing" is. Compound parts of
/// two letters or fewer ("text-to-speech") are ignored.
fn capability_matches(capability: &str, words: &HashSet<String>) -> bool {
    let capability = capability.to_lowercase();
    if words.contains(&capability) {
        return true;
    }
    capability
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| part.len() > 2)
        .any(|part| words.contains(part))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, caps: &[&str], privacy: PrivacyLevel, order: usize) -> Candidate {
        Candidate {
            name: name.to_string(),
            capabilities: caps.iter().map(|c| c.to_string()).collect(),
            privacy,
            available: true,
            in_flight: 0,
            order,
        }
    }

    #[test]
    fn capability_picks_best_match() {
        let candidates = vec![
            candidate("writer", &["summarize", "docs"], PrivacyLevel::Local, 0),
            candidate("coder", &["code-editing", "refactor"], PrivacyLevel::Cloud, 1),
        ];
        let plan = CapabilityPolicy::default()
            .plan("refactor the auth code", &candidates)
            .unwrap();
        assert_eq!(plan.primary, "coder");
        assert!(plan.fallbacks.is_empty());
    }

    #[test]
    fn capability_ties_go_to_first_registered() {
        let candidates = vec![
            candidate("a", &["review"], PrivacyLevel::Local, 0),
            candidate("b", &["review"], PrivacyLevel::Local, 1),
        ];
        let plan = CapabilityPolicy::default().plan("review this", &candidates).unwrap();
        assert_eq!(plan.primary, "a");
    }

    #[test]
    fn ties_use_registration_order_not_slice_order() {
        let candidates = vec![
            candidate("late", &["review"], PrivacyLevel::Local, 3),
            candidate("early", &["review"], PrivacyLevel::Local, 1),
        ];
        let plan = CapabilityPolicy::default().plan("review this", &candidates).unwrap();
        assert_eq!(plan.primary, "early");
    }

    #[test]
    fn short_capabilities_match_whole_words() {
        let candidates = vec![
            candidate("general", &["text-to-speech"], PrivacyLevel::Local, 0),
            candidate("frontend", &["UI"], PrivacyLevel::Local, 1),
            candidate("gopher", &["go"], PrivacyLevel::Local, 2),
        ];
        let policy = CapabilityPolicy::default();
        assert_eq!(policy.plan("polish the ui", &candidates).unwrap().primary, "frontend");
        assert_eq!(policy.plan("port this to go", &candidates).unwrap().primary, "gopher");
        // "to" inside a compound capability is not a match
        let plan = policy.plan("move it to staging", &candidates).unwrap();
        assert!(plan.explanation.starts_with("No capability matched"));
    }

    #[test]
    fn weights_change_the_winner() {
        let candidates = vec![
            candidate("fast", &["code-editing"], PrivacyLevel::Local, 0),
            candidate("deep", &["reasoning"], PrivacyLevel::Local, 1),
        ];
        let mut weights = HashMap::new();
        weights.insert("reasoning".to_string(), 2.0);
        let plan = CapabilityPolicy::new(weights)
            .plan("code reasoning about editing", &candidates)
            .unwrap();
        assert_eq!(plan.primary, "deep");
    }

    #[test]
    fn busy_executors_are_skipped() {
        let mut busy = candidate("coder", &["refactor"], PrivacyLevel::Local, 0);
        busy.available = false;
        let idle = candidate("echo", &[], PrivacyLevel::Local, 1);
        let plan = CapabilityPolicy::default().plan("refactor", &[busy.clone(), idle]).unwrap();
        assert_eq!(plan.primary, "echo");

        let err = CapabilityPolicy::default().plan("refactor", &[busy]).unwrap_err();
        assert!(err.to_string().contains("capacity"));
    }

    #[test]
    fn local_first_prefers_local() {
        let candidates = vec![
            candidate("cloud", &["refactor"], PrivacyLevel::Cloud, 0),
            candidate("local", &[], PrivacyLevel::Local, 1),
        ];
        let plan = LocalFirstPolicy::default().plan("refactor", &candidates).unwrap();
        assert_eq!(plan.primary, "local");
    }

    #[test]
    fn chain_skips_unregistered() {
        let candidates = vec![
            candidate("ollama", &[], PrivacyLevel::Local, 0),
            candidate("claude", &[], PrivacyLevel::Cloud, 1),
        ];
        let plan = ChainPolicy::new(vec!["missing".into(), "claude".into(), "ollama".into()])
            .plan("anything", &candidates)
            .unwrap();
        assert_eq!(plan.primary, "claude");
        assert_eq!(plan.fallbacks, vec!["ollama"]);
    }

    #[test]
    fn static_requires_registration() {
        let candidates = vec![candidate("echo", &[], PrivacyLevel::Local, 0)];
        assert!(StaticPolicy::new("echo").plan("x", &candidates).is_ok());
        assert!(StaticPolicy::new("ghost").plan("x", &candidates).is_err());
    }
}
