use std::time::Duration;

use crate::config::ChannelConfig;

/// Position within an exchange's attempt budget.
///
/// Advancing past the last attempt yields `None`, which is the point where
/// an exchange gives up and reports the most recent failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    index: u32,
    max_attempts: u32,
    delay: Duration,
}

impl Attempt {
    /// The first attempt of an exchange. A zero budget still runs once.
    pub fn first(config: &ChannelConfig) -> Self {
        Self {
            index: 0,
            max_attempts: config.attempts.max(1),
            delay: config.retry_delay,
        }
    }

    /// 1-based attempt number, for logs.
    pub fn number(&self) -> u32 {
        self.index + 1
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_last(&self) -> bool {
        self.number() >= self.max_attempts
    }

    /// Pause to take before the attempt that follows this one.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// The following attempt, or `None` once the budget is spent.
    pub fn next(self) -> Option<Self> {
        if self.is_last() {
            return None;
        }
        Some(Self {
            index: self.index + 1,
            ..self
        })
    }
}
