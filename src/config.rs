//! Engine configuration

use embassy_time::Duration;
use serde::Deserialize;

use crate::error::{EngineError, Result};
use crate::hub::{DEFAULT_DELIVERY_TIMEOUT, DEFAULT_SUBSCRIBER_QUEUE};
use crate::pacer::DEFAULT_TICK_PERIOD;

/// Default number of steps of a ramp.
pub const DEFAULT_RAMP_STEPS: u32 = 100;

/// Default time `start` waits for the previous run to exit.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(1);

/// Configuration for the effect engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Period of the waveform tick loop
    pub tick_period: Duration,
    /// Number of discrete steps of every ramp
    pub ramp_steps: u32,
    /// Upper bound on waiting for a cancelled run to exit
    pub grace_period: Duration,
    /// Pending deliveries a slow subscriber may have before it is dropped
    pub subscriber_queue: usize,
    /// Longest a subscriber may spend on one delivery
    pub delivery_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_period: DEFAULT_TICK_PERIOD,
            ramp_steps: DEFAULT_RAMP_STEPS,
            grace_period: DEFAULT_GRACE_PERIOD,
            subscriber_queue: DEFAULT_SUBSCRIBER_QUEUE,
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
        }
    }
}

/// On-disk form, all times in milliseconds
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawEngineConfig {
    tick_period_ms: u64,
    ramp_steps: u32,
    grace_period_ms: u64,
    subscriber_queue: usize,
    delivery_timeout_ms: u64,
}

impl Default for RawEngineConfig {
    fn default() -> Self {
        let defaults = EngineConfig::default();
        Self {
            tick_period_ms: defaults.tick_period.as_millis(),
            ramp_steps: defaults.ramp_steps,
            grace_period_ms: defaults.grace_period.as_millis(),
            subscriber_queue: defaults.subscriber_queue,
            delivery_timeout_ms: defaults.delivery_timeout.as_millis(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON configuration; missing fields take their defaults.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let raw: RawEngineConfig =
            serde_json::from_str(text).map_err(|err| EngineError::Config(err.to_string()))?;
        let config = Self {
            tick_period: Duration::from_millis(raw.tick_period_ms),
            ramp_steps: raw.ramp_steps,
            grace_period: Duration::from_millis(raw.grace_period_ms),
            subscriber_queue: raw.subscriber_queue,
            delivery_timeout: Duration::from_millis(raw.delivery_timeout_ms),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_period.as_ticks() == 0 {
            return Err(EngineError::Config("tick period must be positive".into()));
        }
        if self.ramp_steps == 0 {
            return Err(EngineError::Config("ramp steps must be positive".into()));
        }
        if self.subscriber_queue == 0 {
            return Err(EngineError::Config("subscriber queue must hold at least one event".into()));
        }
        if self.delivery_timeout.as_ticks() == 0 {
            return Err(EngineError::Config("delivery timeout must be positive".into()));
        }
        Ok(())
    }

    /// Set the tick period
    #[must_use]
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    /// Set the ramp step count
    #[must_use]
    pub fn with_ramp_steps(mut self, steps: u32) -> Self {
        self.ramp_steps = steps;
        self
    }

    /// Set the subscriber queue depth and per-delivery timeout
    #[must_use]
    pub fn with_subscriber_limits(mut self, queue: usize, timeout: Duration) -> Self {
        self.subscriber_queue = queue;
        self.delivery_timeout = timeout;
        self
    }

    /// Set the grace period
    #[must_use]
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }
}
