//! Fixed-rate clock threads.
//!
//! A clock calls its tick closure once per period until the closure breaks or
//! the shared cancellation flag is raised. Deadlines advance by whole periods;
//! when a tick overruns, the missed deadlines are dropped instead of replayed.

use std::io;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Thread name of the instruction clock.
pub const INSTRUCTION_CLOCK_NAME: &str = "cpu-clock";

/// Thread name of the timer clock.
pub const TIMER_CLOCK_NAME: &str = "timer-clock";

const JOIN_POLL: Duration = Duration::from_millis(1);

/// Handle to a running clock thread.
#[derive(Debug)]
pub struct ClockHandle {
    name: &'static str,
    thread: JoinHandle<()>,
}

impl ClockHandle {
    /// Clock name, also used as the thread name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` once the clock thread has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Waits for the thread to exit, giving up at `deadline`.
    ///
    /// Returns `false` if the thread was still running at the deadline; it is
    /// then left detached.
    pub fn join_until(self, deadline: Instant) -> bool {
        while !self.is_finished() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(JOIN_POLL);
        }
        if self.thread.join().is_err() {
            tracing::error!(clock = self.name, "clock thread panicked");
        }
        true
    }
}

/// Starts a clock thread that calls `tick` every `period`.
///
/// The first tick fires immediately. The clock stops when `tick` returns
/// [`ControlFlow::Break`] or `cancel` is set; `cancel` is checked before every
/// tick and at least once per period.
///
/// # Errors
///
/// Returns the OS error if the thread cannot be spawned.
pub fn spawn_clock<F>(
    name: &'static str,
    period: Duration,
    cancel: Arc<AtomicBool>,
    mut tick: F,
) -> io::Result<ClockHandle>
where
    F: FnMut() -> ControlFlow<()> + Send + 'static,
{
    let thread = thread::Builder::new()
        .name(name.to_owned())
        .spawn(move || {
            tracing::debug!(clock = name, ?period, "clock started");
            let mut deadline = Instant::now();
            while !cancel.load(Ordering::Acquire) {
                if tick().is_break() {
                    break;
                }

                deadline += period;
                let now = Instant::now();
                if deadline <= now {
                    let missed = now.duration_since(deadline).as_nanos() / period.as_nanos().max(1);
                    if missed > 0 {
                        tracing::trace!(clock = name, missed, "clock overrun; skipping ticks");
                    }
                    deadline = now;
                } else {
                    thread::sleep(deadline - now);
                }
            }
            tracing::debug!(clock = name, "clock stopped");
        })?;

    Ok(ClockHandle { name, thread })
}

#[cfg(test)]
mod tests {
    use std::ops::ControlFlow;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use super::spawn_clock;

    #[test]
    fn clock_stops_when_tick_breaks() {
        let count = Arc::new(AtomicUsize::new(0));
        let ticks = Arc::clone(&count);
        let handle = spawn_clock(
            "test-break",
            Duration::from_millis(1),
            Arc::new(AtomicBool::new(false)),
            move || {
                if ticks.fetch_add(1, Ordering::SeqCst) + 1 == 5 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            },
        )
        .unwrap();

        assert_eq!(handle.name(), "test-break");
        assert!(handle.join_until(Instant::now() + Duration::from_secs(5)));
        assert_eq!(count.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn cancellation_is_observed_within_a_period() {
        let cancel = Arc::new(AtomicBool::new(false));
        let count = Arc::new(AtomicUsize::new(0));
        let ticks = Arc::clone(&count);
        let handle = spawn_clock(
            "test-cancel",
            Duration::from_millis(5),
            Arc::clone(&cancel),
            move || {
                ticks.fetch_add(1, Ordering::SeqCst);
                ControlFlow::Continue(())
            },
        )
        .unwrap();

        std::thread::sleep(Duration::from_millis(30));
        cancel.store(true, Ordering::Release);
        assert!(handle.join_until(Instant::now() + Duration::from_secs(5)));
        assert!(count.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn first_tick_is_immediate() {
        let (sender, receiver) = std::sync::mpsc::channel();
        let handle = spawn_clock(
            "test-first",
            Duration::from_secs(60),
            Arc::new(AtomicBool::new(false)),
            move || {
                let _ = sender.send(Instant::now());
                ControlFlow::Break(())
            },
        )
        .unwrap();

        let started = Instant::now();
        receiver.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(handle.join_until(Instant::now() + Duration::from_secs(5)));
    }
}
