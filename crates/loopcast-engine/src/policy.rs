//! Relaunch policy after an unrequested encoder exit.

use std::time::Duration;

/// Default delay before relaunching the encoder.
pub const DEFAULT_RESTART_DELAY_MS: u64 = 2000;

/// Fixed-delay restart policy with no attempt ceiling: as long as playback
/// is wanted and the playlist has something to play, the encoder comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    /// Delay between the exit and the relaunch.
    pub delay: Duration,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(DEFAULT_RESTART_DELAY_MS),
        }
    }
}

impl RestartPolicy {
    /// Policy with the given delay.
    pub fn fixed(delay: Duration) -> Self {
        Self { delay }
    }

    /// Delay before the given relaunch attempt; the same for every attempt.
    pub fn delay_for_attempt(&self, _attempt: u32) -> Duration {
        self.delay
    }

    /// Always true: retries are unbounded.
    pub fn should_retry(&self, _attempt: u32) -> bool {
        true
    }
}
