//! Bounded polling
//!
//! Contains PollConfig for readiness and propagation waits. Every wait in the
//! fixture lifecycle is a fixed-interval poll with a hard attempt budget:
//! the calling thread sleeps between probes and gives up once the budget is
//! spent.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use strata_fixture_core::{Error, Result, StoreResult};
use tracing::debug;

// ============================================================================
// Poll Configuration
// ============================================================================

/// Configuration for a bounded poll
///
/// # Example
/// ```ignore
/// let readiness = PollConfig::new()
///     .with_max_attempts(20)
///     .with_interval_ms(50);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Maximum number of probes (at least 1)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay between probes in milliseconds (at least 1)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_max_attempts() -> u32 {
    50
}

fn default_interval_ms() -> u64 {
    100
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_ms: default_interval_ms(),
        }
    }
}

impl PollConfig {
    /// Create a PollConfig with default values (50 probes, 100ms apart)
    pub fn new() -> Self {
        Self::default()
    }

    /// Default budget for index propagation waits (20 probes, 50ms apart)
    pub fn propagation_default() -> Self {
        Self {
            max_attempts: 20,
            interval_ms: 50,
        }
    }

    /// Set maximum number of probes
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set delay between probes
    pub fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Delay between probes
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Upper bound on time spent sleeping during one poll
    pub fn timeout(&self) -> Duration {
        self.interval()
            .saturating_mul(self.max_attempts.saturating_sub(1))
    }

    /// Check the budget is usable
    pub fn validate(&self, what: &str) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::Config(format!("{}.max_attempts must be at least 1", what)));
        }
        if self.interval_ms == 0 {
            return Err(Error::Config(format!("{}.interval_ms must be at least 1", what)));
        }
        Ok(())
    }

    /// Probe until it reports true or the budget runs out.
    ///
    /// Probe errors count as "not yet" and are retried.
    pub(crate) fn poll_until<F>(&self, what: &str, mut probe: F) -> PollOutcome
    where
        F: FnMut() -> StoreResult<bool>,
    {
        let max_attempts = self.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            match probe() {
                Ok(true) => return PollOutcome::Ready { attempts: attempt },
                Ok(false) => {}
                Err(e) => {
                    debug!(target: "strata::fixture", what, attempt, error = %e, "Probe failed");
                }
            }
            if attempt < max_attempts {
                std::thread::sleep(self.interval());
            }
        }
        PollOutcome::Exhausted {
            attempts: max_attempts,
        }
    }
}

/// Result of a bounded poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PollOutcome {
    /// Probe reported true on the given attempt
    Ready { attempts: u32 },
    /// Budget spent without success
    Exhausted { attempts: u32 },
}
