//! Timer observer.

use std::time::{Duration, Instant};

use crate::event::{EmulatorEvent, EventSubscriber};

/// One finished countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    /// Value the countdown started from.
    pub start_value: u8,
    /// Wall-clock time until the timer reached zero.
    pub elapsed: Duration,
    /// Time the countdown takes at the nominal timer rate.
    pub expected: Duration,
}

/// Subscriber tracking timer ticks and measuring countdowns.
#[derive(Debug)]
pub struct TimerMonitor {
    timer_hz: u32,
    last_value: u8,
    started: Option<(Instant, u8)>,
    completed: Vec<Countdown>,
}

impl TimerMonitor {
    /// Creates a monitor that judges countdowns against `timer_hz`.
    #[must_use]
    pub fn new(timer_hz: u32) -> Self {
        Self {
            timer_hz: timer_hz.max(1),
            last_value: 0,
            started: None,
            completed: Vec::new(),
        }
    }

    /// Value carried by the most recent tick.
    #[must_use]
    pub const fn last_value(&self) -> u8 {
        self.last_value
    }

    /// Countdowns that reached zero, oldest first.
    #[must_use]
    pub fn completed(&self) -> &[Countdown] {
        &self.completed
    }

    fn expected_duration(&self, ticks: u8) -> Duration {
        Duration::from_millis(u64::from(ticks) * 1000 / u64::from(self.timer_hz))
    }

    fn on_tick(&mut self, value: u8) {
        let now = Instant::now();
        if value > 0 && (value > self.last_value || self.started.is_none()) {
            self.started = Some((now, value));
        }

        if value == 0 {
            if let Some((start, start_value)) = self.started.take() {
                let countdown = Countdown {
                    start_value,
                    elapsed: now.duration_since(start),
                    expected: self.expected_duration(start_value),
                };
                tracing::info!(
                    start = start_value,
                    elapsed_ms = countdown.elapsed.as_millis(),
                    expected_ms = countdown.expected.as_millis(),
                    "timer countdown complete"
                );
                self.completed.push(countdown);
            }
        }

        self.last_value = value;
    }
}

impl Default for TimerMonitor {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_TIMER_HZ)
    }
}

impl EventSubscriber for TimerMonitor {
    fn on_event(&mut self, event: &EmulatorEvent) {
        if let EmulatorEvent::TimerTick(value) = *event {
            self.on_tick(value);
        }
    }
}
