//! Retry state machine: attempt, classify, then wait-and-retry or fail.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::service::{classify, ErrorClass, ServiceError};
use crate::config::GenerationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub rate_limit_cooldown: Duration,
    pub max_rate_limit_retries: u32,
    pub transient_recovery: Duration,
    pub max_transient_retries: u32,
}

impl From<&GenerationConfig> for RetryPolicy {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            rate_limit_cooldown: config.rate_limit_cooldown(),
            max_rate_limit_retries: config.max_rate_limit_retries,
            transient_recovery: config.transient_recovery(),
            max_transient_retries: config.max_transient_retries,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&GenerationConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { after: Duration, class: ErrorClass },
    Fail { class: ErrorClass, reason: String },
}

/// Per-panel retry bookkeeping. Rate-limit and transient budgets are
/// counted separately.
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    rate_limited: u32,
    transient: u32,
}

impl RetryState {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, rate_limited: 0, transient: 0 }
    }

    pub fn retries(&self) -> u32 {
        self.rate_limited + self.transient
    }

    pub fn on_error(&mut self, error: &ServiceError) -> RetryDecision {
        let class = classify(error);
        match class {
            ErrorClass::RateLimited if self.rate_limited < self.policy.max_rate_limit_retries => {
                self.rate_limited += 1;
                let wait = error
                    .retry_after()
                    .map_or(self.policy.rate_limit_cooldown, |hint| hint.max(self.policy.rate_limit_cooldown));
                RetryDecision::Retry { after: wait, class }
            }
            ErrorClass::Transient if self.transient < self.policy.max_transient_retries => {
                self.transient += 1;
                RetryDecision::Retry { after: self.policy.transient_recovery, class }
            }
            ErrorClass::RateLimited | ErrorClass::Transient => RetryDecision::Fail {
                class,
                reason: format!("{} (retries exhausted)", error),
            },
            ErrorClass::Fatal => RetryDecision::Fail { class, reason: error.to_string() },
        }
    }
}
