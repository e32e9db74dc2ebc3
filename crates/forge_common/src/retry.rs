//! Retry policy for failed commands.
//!
//! Tracks attempts per request id and computes deterministic exponential
//! backoff. One engine per connection; the dispatcher is the only writer.

use crate::protocol::{Command, Response};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tracing::info;

/// Retained attempt records; oldest evicted first.
const RETRY_HISTORY_CAP: usize = 100;

/// Backoff parameters, normally taken from [`crate::Config`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

/// One recorded attempt for a request id.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub request_id: String,
    pub command: Command,
    pub response: Response,
    pub attempt: u32,
    pub timestamp: DateTime<Utc>,
}

/// Read-only retry snapshot for inspection and logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryInfo {
    pub request_id: String,
    pub current_attempt: u32,
    pub max_attempts: u32,
    pub can_retry: bool,
}

/// Per-request-id attempt tracking with exponential backoff.
pub struct RetryEngine {
    policy: RetryPolicy,
    counts: HashMap<String, u32>,
    history: VecDeque<AttemptRecord>,
}

impl RetryEngine {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            counts: HashMap::new(),
            history: VecDeque::new(),
        }
    }

    /// Number of attempts recorded for a request id; absent ids count as 0.
    pub fn attempts(&self, request_id: &str) -> u32 {
        self.counts.get(request_id).copied().unwrap_or(0)
    }

    /// Whether another attempt is permitted for this request id.
    pub fn should_retry(&self, request_id: &str) -> bool {
        self.attempts(request_id) < self.policy.max_retries
    }

    /// Delay before the next attempt: `min(base * 2^attempts, cap)`.
    /// Deterministic, no jitter.
    pub fn retry_delay(&self, request_id: &str) -> Duration {
        let count = self.attempts(request_id);
        let delay = self.policy.base_delay.as_secs_f64() * 2f64.powi(count as i32);
        Duration::from_secs_f64(delay.min(self.policy.max_delay.as_secs_f64()))
    }

    /// Record one attempt. The first recorded attempt yields count 1.
    pub fn record_attempt(&mut self, request_id: &str, command: &Command, response: &Response) {
        let count = self.counts.entry(request_id.to_string()).or_insert(0);
        *count += 1;
        let attempt = *count;

        self.history.push_back(AttemptRecord {
            request_id: request_id.to_string(),
            command: command.clone(),
            response: response.clone(),
            attempt,
            timestamp: Utc::now(),
        });
        if self.history.len() > RETRY_HISTORY_CAP {
            self.history.pop_front();
        }

        info!("Retry attempt {} for {}", attempt, request_id);
    }

    /// Remove the counter entirely; the backoff curve starts over.
    pub fn reset(&mut self, request_id: &str) {
        self.counts.remove(request_id);
    }

    pub fn retry_info(&self, request_id: &str) -> RetryInfo {
        RetryInfo {
            request_id: request_id.to_string(),
            current_attempt: self.attempts(request_id),
            max_attempts: self.policy.max_retries,
            can_retry: self.should_retry(request_id),
        }
    }

    pub fn history(&self) -> &VecDeque<AttemptRecord> {
        &self.history
    }
}

impl Default for RetryEngine {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with_attempts(id: &str, n: u32) -> RetryEngine {
        let mut engine = RetryEngine::default();
        let command = Command::default();
        let response = Response::default();
        for _ in 0..n {
            engine.record_attempt(id, &command, &response);
        }
        engine
    }

    #[test]
    fn delay_follows_capped_exponential_curve() {
        let expected = [1.0, 2.0, 4.0, 8.0, 10.0, 10.0];
        for (count, secs) in expected.iter().enumerate() {
            let engine = engine_with_attempts("req_a", count as u32);
            assert_eq!(
                engine.retry_delay("req_a"),
                Duration::from_secs_f64(*secs),
                "delay at attempt count {}",
                count
            );
        }
    }

    #[test]
    fn absent_id_counts_as_zero() {
        let engine = RetryEngine::default();
        assert_eq!(engine.attempts("never_seen"), 0);
        assert!(engine.should_retry("never_seen"));
        assert_eq!(engine.retry_delay("never_seen"), Duration::from_secs(1));
    }

    #[test]
    fn retries_exhaust_at_max() {
        let engine = engine_with_attempts("req_b", 5);
        assert!(!engine.should_retry("req_b"));
        assert_eq!(engine.attempts("req_b"), 5);
    }

    #[test]
    fn reset_removes_counter_and_restarts_curve() {
        let mut engine = engine_with_attempts("req_c", 4);
        engine.reset("req_c");

        let info = engine.retry_info("req_c");
        assert_eq!(info.current_attempt, 0);
        assert!(info.can_retry);
        assert_eq!(engine.retry_delay("req_c"), Duration::from_secs(1));
    }

    #[test]
    fn retry_info_snapshots_state() {
        let engine = engine_with_attempts("req_d", 2);
        assert_eq!(
            engine.retry_info("req_d"),
            RetryInfo {
                request_id: "req_d".to_string(),
                current_attempt: 2,
                max_attempts: 5,
                can_retry: true,
            }
        );
    }

    #[test]
    fn history_is_bounded() {
        let mut engine = RetryEngine::default();
        let command = Command::default();
        let response = Response::default();
        for i in 0..(RETRY_HISTORY_CAP + 50) {
            engine.record_attempt(&format!("req_{}", i), &command, &response);
        }
        assert_eq!(engine.history().len(), RETRY_HISTORY_CAP);
        // oldest entries were evicted
        assert_eq!(engine.history().front().unwrap().request_id, "req_50");
    }
}
