use std::time::Duration;

/// Default instruction clock rate.
pub const DEFAULT_INSTRUCTION_HZ: u32 = 500;

/// Default timer clock rate.
pub const DEFAULT_TIMER_HZ: u32 = 60;

/// Default bound on waiting for the clock threads during shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

/// Runtime configuration for an [`crate::Emulator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct EmulatorConfig {
    /// Instructions executed per second.
    pub instruction_hz: u32,
    /// Timer decrements per second.
    pub timer_hz: u32,
    /// How long `shutdown` waits for each clock thread to exit.
    pub shutdown_timeout: Duration,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            instruction_hz: DEFAULT_INSTRUCTION_HZ,
            timer_hz: DEFAULT_TIMER_HZ,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl EmulatorConfig {
    /// Period of the instruction clock. A zero rate is treated as 1 Hz.
    #[must_use]
    pub fn instruction_period(&self) -> Duration {
        period(self.instruction_hz)
    }

    /// Period of the timer clock. A zero rate is treated as 1 Hz.
    #[must_use]
    pub fn timer_period(&self) -> Duration {
        period(self.timer_hz)
    }
}

fn period(hz: u32) -> Duration {
    Duration::from_secs(1) / hz.max(1)
}
