//! Process-wide breaker over the secondary provider.
//!
//! Consecutive secondary failures up to the configured threshold suspend
//! routing to the secondary provider for every later lineage. With a
//! cooldown configured, the first lineage after it elapses is let through
//! as a trial (HalfOpen): a success closes the circuit again, a failure
//! re-opens it. Without a cooldown an opened circuit stays open for the
//! lifetime of the aggregator.

use std::time::{Duration, Instant};

use crate::config::SearchConfig;

/// Routing state of the secondary provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Secondary is routed normally.
    Closed,
    /// Secondary failed; fresh lineages skip it.
    Open,
    /// Cooldown elapsed; the next lineage tries secondary again.
    HalfOpen,
}

/// Failure counter and state of the secondary circuit.
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Option<Duration>,
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

impl From<&SearchConfig> for CircuitBreaker {
    fn from(config: &SearchConfig) -> Self {
        Self::new(
            config.secondary_failure_threshold,
            config.secondary_cooldown_secs.map(Duration::from_secs),
        )
    }
}

impl CircuitBreaker {
    /// A closed breaker. `cooldown = None` never re-admits after opening.
    pub fn new(failure_threshold: u32, cooldown: Option<Duration>) -> Self {
        Self {
            failure_threshold,
            cooldown,
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
        }
    }

    /// A request reached the provider and succeeded.
    pub fn record_success(&mut self) {
        self.state = CircuitState::Closed;
        self.consecutive_failures = 0;
        self.opened_at = None;
    }

    /// A request to the provider failed.
    pub fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        let reopen = self.state == CircuitState::HalfOpen;
        if reopen || self.consecutive_failures >= self.failure_threshold {
            if self.state != CircuitState::Open {
                tracing::warn!(failures = self.consecutive_failures, "secondary circuit opened");
            }
            self.state = CircuitState::Open;
            self.opened_at = Some(Instant::now());
        }
    }

    /// Whether a fresh lineage may route to the secondary provider.
    pub fn should_attempt(&mut self) -> bool {
        match self.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = match (self.cooldown, self.opened_at) {
                    (Some(cooldown), Some(at)) => at.elapsed() >= cooldown,
                    (Some(_), None) => true,
                    (None, _) => false,
                };
                if elapsed {
                    self.state = CircuitState::HalfOpen;
                }
                elapsed
            }
        }
    }

    /// Current state.
    pub fn status(&self) -> CircuitState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_closed() {
        let mut breaker = CircuitBreaker::new(1, None);
        assert_eq!(breaker.status(), CircuitState::Closed);
        assert!(breaker.should_attempt());
    }

    #[test]
    fn default_config_opens_for_good_on_first_failure() {
        let mut breaker = CircuitBreaker::from(&SearchConfig::default());
        breaker.record_failure();
        assert_eq!(breaker.status(), CircuitState::Open);
        assert!(!breaker.should_attempt());
        assert!(!breaker.should_attempt());
    }

    #[test]
    fn stays_closed_below_threshold() {
        let mut breaker = CircuitBreaker::new(3, None);
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.status(), CircuitState::Closed);
        assert!(breaker.should_attempt());
    }

    #[test]
    fn success_resets_the_failure_count() {
        let mut breaker = CircuitBreaker::new(2, None);
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        assert_eq!(breaker.status(), CircuitState::Closed);
    }

    #[test]
    fn elapsed_cooldown_admits_a_trial() {
        let mut breaker = CircuitBreaker::new(1, Some(Duration::ZERO));
        breaker.record_failure();
        assert!(breaker.should_attempt());
        assert_eq!(breaker.status(), CircuitState::HalfOpen);

        breaker.record_success();
        assert_eq!(breaker.status(), CircuitState::Closed);
    }

    #[test]
    fn trial_failure_reopens_below_threshold() {
        let mut breaker = CircuitBreaker::new(3, Some(Duration::ZERO));
        for _ in 0..3 {
            breaker.record_failure();
        }
        assert!(breaker.should_attempt());
        breaker.record_failure();
        assert_eq!(breaker.status(), CircuitState::Open);
    }

    #[test]
    fn pending_cooldown_keeps_circuit_open() {
        let mut breaker = CircuitBreaker::new(1, Some(Duration::from_secs(3600)));
        breaker.record_failure();
        assert!(!breaker.should_attempt());
        assert_eq!(breaker.status(), CircuitState::Open);
    }
}
