//! Lifecycle controller: owns the CPU context and drives both clocks.
//!
//! The CPU context is guarded by one coarse mutex held for a whole tick, so
//! the instruction clock and the timer clock never interleave inside an
//! instruction. A `READ_KEYBOARD` is the exception: the instruction clock
//! releases the CPU lock while it waits for the byte, so the timer keeps
//! counting and the host can pause or shut down meanwhile. The lifecycle
//! state sits behind its own mutex with a condvar for
//! [`Emulator::wait_until_halted`].
//!
//! Lock order: CPU, then pending key, then status. The keyboard lock is never
//! held together with any of them.

use std::fmt;
use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::clock::{spawn_clock, ClockHandle, INSTRUCTION_CLOCK_NAME, TIMER_CLOCK_NAME};
use crate::config::EmulatorConfig;
use crate::cpu::{Cpu, StepOutcome};
use crate::decoder::Instruction;
use crate::error::EmulatorError;
use crate::event::{EventBus, SharedSubscriber, SubscriberId};
use crate::peripherals::{KeyboardSource, ScriptedKeyboard};
use crate::rom::load_rom_file;
use crate::state::{LifecycleError, LifecycleState, RegisterFile};
use crate::sync::lock_unpoisoned;
use crate::Fault;

/// Why a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum HaltReason {
    /// The program fetched the HALT word.
    Program {
        /// Address of the HALT word.
        pc: u16,
        /// Message published with the halt event.
        message: String,
    },
    /// An instruction faulted.
    Fault {
        /// Address of the faulting instruction.
        pc: u16,
        /// The fault.
        fault: Fault,
    },
    /// A clock tick panicked, typically inside an event subscriber.
    ClockPanic {
        /// Name of the clock whose tick panicked.
        clock: String,
    },
    /// The host called [`Emulator::shutdown`].
    Shutdown,
}

impl HaltReason {
    /// Fault that ended the run, if any.
    #[must_use]
    pub const fn fault(&self) -> Option<Fault> {
        match self {
            Self::Fault { fault, .. } => Some(*fault),
            Self::Program { .. } | Self::ClockPanic { .. } | Self::Shutdown => None,
        }
    }
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Program { message, .. } => f.write_str(message),
            Self::Fault { pc, fault } => write!(f, "fault at PC={pc:#06X}: {fault}"),
            Self::ClockPanic { clock } => write!(f, "{clock} tick panicked"),
            Self::Shutdown => f.write_str("shut down by host"),
        }
    }
}

#[derive(Debug, Default)]
struct Status {
    state: LifecycleState,
    halt_reason: Option<HaltReason>,
}

/// Whether a clock tick may touch the CPU.
enum Gate {
    Run,
    Idle,
    Stop,
}

struct Shared {
    cpu: Mutex<Cpu>,
    keyboard: Mutex<Box<dyn KeyboardSource>>,
    /// Byte read for a `READ_KEYBOARD` that has not executed yet.
    pending_key: Mutex<Option<u8>>,
    status: Mutex<Status>,
    changed: Condvar,
}

impl Shared {
    fn state(&self) -> LifecycleState {
        lock_unpoisoned(&self.status).state
    }

    /// Moves along the whitelisted edge `from → to`, provided the current
    /// state is `from`.
    fn transition(&self, from: LifecycleState, to: LifecycleState) -> Result<(), LifecycleError> {
        let mut status = lock_unpoisoned(&self.status);
        let current = status.state;
        if current != from || !from.can_transition_to(to) {
            return Err(LifecycleError::InvalidTransition { from: current, to });
        }
        status.state = to;
        tracing::info!(%from, %to, "lifecycle transition");
        self.changed.notify_all();
        Ok(())
    }

    /// Records the end of a run. A run that already halted keeps its reason.
    fn halt(&self, reason: HaltReason) {
        let mut status = lock_unpoisoned(&self.status);
        let from = status.state;
        if from.can_transition_to(LifecycleState::Halted) {
            status.state = LifecycleState::Halted;
            tracing::info!(%from, to = %LifecycleState::Halted, reason = %reason, "lifecycle transition");
            status.halt_reason = Some(reason);
            self.changed.notify_all();
        }
    }

    fn gate(&self, cancel: &AtomicBool) -> Gate {
        if cancel.load(Ordering::Acquire) {
            return Gate::Stop;
        }
        match self.state() {
            LifecycleState::Running => Gate::Run,
            LifecycleState::Halted => Gate::Stop,
            LifecycleState::Uninitialized | LifecycleState::Ready | LifecycleState::Paused => {
                Gate::Idle
            }
        }
    }

    /// Runs `tick`, turning a panic into a halt so the controller never
    /// keeps running with a dead clock.
    fn guarded(
        &self,
        clock: &'static str,
        cancel: &AtomicBool,
        tick: impl FnOnce() -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        panic::catch_unwind(AssertUnwindSafe(tick)).unwrap_or_else(|_| {
            tracing::error!(clock, "clock tick panicked; shutting down");
            cancel.store(true, Ordering::Release);
            self.halt(HaltReason::ClockPanic {
                clock: clock.to_owned(),
            });
            ControlFlow::Break(())
        })
    }

    fn instruction_tick(&self, cancel: &AtomicBool) -> ControlFlow<()> {
        let mut cpu = lock_unpoisoned(&self.cpu);
        match self.gate(cancel) {
            Gate::Run => {}
            Gate::Idle => return ControlFlow::Continue(()),
            Gate::Stop => return ControlFlow::Break(()),
        }

        let mut key = lock_unpoisoned(&self.pending_key).take();
        if key.is_none() && matches!(cpu.peek(), Some(Instruction::ReadKeyboard { .. })) {
            drop(cpu);
            let byte = lock_unpoisoned(&self.keyboard).read_hex_byte();
            cpu = lock_unpoisoned(&self.cpu);
            match self.gate(cancel) {
                Gate::Run => key = Some(byte),
                Gate::Idle => {
                    tracing::debug!(byte, "keyboard byte held until resume");
                    *lock_unpoisoned(&self.pending_key) = Some(byte);
                    return ControlFlow::Continue(());
                }
                Gate::Stop => {
                    tracing::debug!(byte, "keyboard byte dropped after shutdown");
                    return ControlFlow::Break(());
                }
            }
        }

        let pc = cpu.state().registers.pc();
        let result = cpu.step(&mut ScriptedKeyboard::new(key));

        let reason = match result {
            Ok(StepOutcome::Executed { .. }) => return ControlFlow::Continue(()),
            Ok(StepOutcome::Halted { pc, message }) => HaltReason::Program { pc, message },
            Err(fault) => {
                tracing::error!(
                    pc,
                    %fault,
                    code = fault.code(),
                    class = ?fault.class(),
                    "fatal fault; shutting down"
                );
                HaltReason::Fault { pc, fault }
            }
        };
        cancel.store(true, Ordering::Release);
        self.halt(reason);
        ControlFlow::Break(())
    }

    fn timer_tick(&self) -> ControlFlow<()> {
        let mut cpu = lock_unpoisoned(&self.cpu);
        match self.state() {
            LifecycleState::Running => {
                if let Some(value) = cpu.tick_timer() {
                    tracing::trace!(value, "timer tick");
                }
                ControlFlow::Continue(())
            }
            LifecycleState::Halted => ControlFlow::Break(()),
            LifecycleState::Uninitialized | LifecycleState::Ready | LifecycleState::Paused => {
                ControlFlow::Continue(())
            }
        }
    }
}

/// D5700 emulator: CPU context, event bus and the two clocks, gated by an
/// explicit lifecycle.
///
/// Event subscribers run on the clock threads while the CPU lock is held and
/// must not call back into the emulator's snapshot accessors. A subscriber
/// that panics halts the run with [`HaltReason::ClockPanic`].
pub struct Emulator {
    config: EmulatorConfig,
    bus: EventBus,
    shared: Arc<Shared>,
    cancel: Arc<AtomicBool>,
    clocks: Vec<ClockHandle>,
}

impl fmt::Debug for Emulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emulator")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("bus", &self.bus)
            .field("clocks", &self.clocks.len())
            .finish_non_exhaustive()
    }
}

impl Emulator {
    /// Creates an emulator in [`LifecycleState::Uninitialized`].
    pub fn new(config: EmulatorConfig, keyboard: impl KeyboardSource + 'static) -> Self {
        let bus = EventBus::new();
        let shared = Shared {
            cpu: Mutex::new(Cpu::new(bus.clone())),
            keyboard: Mutex::new(Box::new(keyboard)),
            pending_key: Mutex::new(None),
            status: Mutex::new(Status::default()),
            changed: Condvar::new(),
        };
        Self {
            config,
            bus,
            shared: Arc::new(shared),
            cancel: Arc::new(AtomicBool::new(false)),
            clocks: Vec::new(),
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.shared.state()
    }

    /// Why the last run ended; `None` until a run has halted.
    #[must_use]
    pub fn halt_reason(&self) -> Option<HaltReason> {
        lock_unpoisoned(&self.shared.status).halt_reason.clone()
    }

    /// Validates `program`, resets the CPU and moves to
    /// [`LifecycleState::Ready`].
    ///
    /// # Errors
    ///
    /// [`EmulatorError::Lifecycle`] unless the emulator is uninitialized or
    /// halted, [`EmulatorError::Rom`] for an invalid image. State is unchanged
    /// on error.
    pub fn load(&mut self, program: &[u8]) -> Result<(), EmulatorError> {
        self.reap_clocks();

        let mut cpu = lock_unpoisoned(&self.shared.cpu);
        let mut pending_key = lock_unpoisoned(&self.shared.pending_key);
        let mut status = lock_unpoisoned(&self.shared.status);
        let from = status.state;
        if !from.accepts_program() {
            return Err(LifecycleError::InvalidTransition {
                from,
                to: LifecycleState::Ready,
            }
            .into());
        }
        cpu.load_program(program)?;
        *pending_key = None;

        status.state = LifecycleState::Ready;
        status.halt_reason = None;
        tracing::info!(%from, to = %LifecycleState::Ready, bytes = program.len(), "program loaded");
        self.shared.changed.notify_all();
        Ok(())
    }

    /// Reads a ROM file and [`load`](Self::load)s it.
    ///
    /// # Errors
    ///
    /// As [`load`](Self::load), plus [`crate::RomError::Io`] when the file
    /// cannot be read.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<(), EmulatorError> {
        let program = load_rom_file(path)?;
        self.load(&program)
    }

    /// Starts both clocks: `Ready → Running`.
    ///
    /// # Errors
    ///
    /// [`EmulatorError::Lifecycle`] unless the emulator is ready;
    /// [`EmulatorError::Spawn`] if a clock thread cannot be started, in which
    /// case the emulator ends up halted.
    pub fn start(&mut self) -> Result<(), EmulatorError> {
        self.reap_clocks();
        self.shared
            .transition(LifecycleState::Ready, LifecycleState::Running)?;

        self.cancel = Arc::new(AtomicBool::new(false));
        if let Err(err) = self.spawn_clocks() {
            tracing::error!(%err, "clock thread spawn failed");
            self.cancel.store(true, Ordering::Release);
            self.reap_clocks();
            self.shared.halt(HaltReason::Shutdown);
            return Err(EmulatorError::Spawn(err));
        }
        Ok(())
    }

    fn spawn_clocks(&mut self) -> std::io::Result<()> {
        let shared = Arc::clone(&self.shared);
        let cancel = Arc::clone(&self.cancel);
        let instruction = spawn_clock(
            INSTRUCTION_CLOCK_NAME,
            self.config.instruction_period(),
            Arc::clone(&self.cancel),
            move || {
                shared.guarded(INSTRUCTION_CLOCK_NAME, &cancel, || {
                    shared.instruction_tick(&cancel)
                })
            },
        )?;
        self.clocks.push(instruction);

        let shared = Arc::clone(&self.shared);
        let cancel = Arc::clone(&self.cancel);
        let timer = spawn_clock(
            TIMER_CLOCK_NAME,
            self.config.timer_period(),
            Arc::clone(&self.cancel),
            move || shared.guarded(TIMER_CLOCK_NAME, &cancel, || shared.timer_tick()),
        )?;
        self.clocks.push(timer);
        Ok(())
    }

    /// Suppresses clock ticks: `Running → Paused`.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::InvalidTransition`] unless running.
    pub fn pause(&self) -> Result<(), LifecycleError> {
        self.shared
            .transition(LifecycleState::Running, LifecycleState::Paused)
    }

    /// Re-enables clock ticks: `Paused → Running`.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::InvalidTransition`] unless paused.
    pub fn resume(&self) -> Result<(), LifecycleError> {
        self.shared
            .transition(LifecycleState::Paused, LifecycleState::Running)
    }

    /// Stops both clocks and moves to [`LifecycleState::Halted`].
    ///
    /// Returns immediately when already halted. Otherwise each clock thread is
    /// given [`EmulatorConfig::shutdown_timeout`] to exit; stragglers are
    /// logged and detached.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::InvalidTransition`] when no program was ever loaded.
    pub fn shutdown(&mut self) -> Result<(), LifecycleError> {
        let from = self.state();
        match from {
            LifecycleState::Halted => return Ok(()),
            LifecycleState::Uninitialized => {
                return Err(LifecycleError::InvalidTransition {
                    from,
                    to: LifecycleState::Halted,
                });
            }
            LifecycleState::Ready | LifecycleState::Running | LifecycleState::Paused => {}
        }

        self.cancel.store(true, Ordering::Release);
        self.reap_clocks();
        self.shared.halt(HaltReason::Shutdown);
        Ok(())
    }

    /// Blocks until the emulator is halted or `timeout` elapses.
    ///
    /// Returns `true` when halted.
    pub fn wait_until_halted(&self, timeout: Duration) -> bool {
        let status = lock_unpoisoned(&self.shared.status);
        let (status, _) = self
            .shared
            .changed
            .wait_timeout_while(status, timeout, |status| {
                status.state != LifecycleState::Halted
            })
            .unwrap_or_else(PoisonError::into_inner);
        status.state == LifecycleState::Halted
    }

    /// Registers an event subscriber.
    pub fn subscribe(&self, subscriber: SharedSubscriber) -> SubscriberId {
        self.bus.subscribe(subscriber)
    }

    /// Removes an event subscriber; returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Copy of the register file.
    #[must_use]
    pub fn registers(&self) -> RegisterFile {
        lock_unpoisoned(&self.shared.cpu).state().registers.clone()
    }

    /// Copy of RAM.
    #[must_use]
    pub fn ram(&self) -> Vec<u8> {
        lock_unpoisoned(&self.shared.cpu).state().ram.as_bytes().to_vec()
    }

    /// Joins finished or cancelled clock threads, bounded by the shutdown
    /// timeout per thread.
    fn reap_clocks(&mut self) {
        for clock in self.clocks.drain(..) {
            let name = clock.name();
            let deadline = Instant::now() + self.config.shutdown_timeout;
            if !clock.join_until(deadline) {
                tracing::warn!(
                    clock = name,
                    timeout = ?self.config.shutdown_timeout,
                    "clock did not stop in time; detaching"
                );
            }
        }
    }
}

impl Drop for Emulator {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Release);
        self.reap_clocks();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{Emulator, HaltReason};
    use crate::config::EmulatorConfig;
    use crate::error::EmulatorError;
    use crate::peripherals::ScriptedKeyboard;
    use crate::rom::RomError;
    use crate::state::{LifecycleError, LifecycleState};
    use crate::Fault;

    const WAIT: Duration = Duration::from_secs(5);

    fn emulator() -> Emulator {
        Emulator::new(EmulatorConfig::default(), ScriptedKeyboard::default())
    }

    #[test]
    fn new_emulator_is_uninitialized() {
        let emulator = emulator();
        assert_eq!(emulator.state(), LifecycleState::Uninitialized);
        assert_eq!(emulator.halt_reason(), None);
    }

    #[test]
    fn start_before_load_is_rejected() {
        let mut emulator = emulator();
        assert!(matches!(
            emulator.start(),
            Err(EmulatorError::Lifecycle(LifecycleError::InvalidTransition {
                from: LifecycleState::Uninitialized,
                to: LifecycleState::Running
            }))
        ));
        assert_eq!(emulator.state(), LifecycleState::Uninitialized);
    }

    #[test]
    fn invalid_rom_keeps_state() {
        let mut emulator = emulator();
        assert!(matches!(
            emulator.load(&[]),
            Err(EmulatorError::Rom(RomError::Empty))
        ));
        assert_eq!(emulator.state(), LifecycleState::Uninitialized);
    }

    #[test]
    fn halt_program_runs_to_halted() {
        let mut emulator = emulator();
        emulator.load(&[0x00, 0x00]).unwrap();
        assert_eq!(emulator.state(), LifecycleState::Ready);
        emulator.start().unwrap();
        assert!(emulator.wait_until_halted(WAIT));
        assert_eq!(
            emulator.halt_reason(),
            Some(HaltReason::Program {
                pc: 0,
                message: String::from("encountered HALT instruction at PC=0x0000")
            })
        );
    }

    #[test]
    fn fault_is_recorded_as_halt_reason() {
        let mut emulator = emulator();
        emulator.load(&[0x50, 0x03]).unwrap();
        emulator.start().unwrap();
        assert!(emulator.wait_until_halted(WAIT));
        let reason = emulator.halt_reason().unwrap();
        assert_eq!(reason.fault(), Some(Fault::OddJumpAddress { address: 3 }));
        assert_eq!(
            reason.to_string(),
            "fault at PC=0x0000: jump address must be even, got 0x003"
        );
        assert_eq!(emulator.registers().pc(), 0);
    }

    #[test]
    fn shutdown_is_idempotent_and_allows_reload() {
        let mut emulator = emulator();
        assert!(emulator.shutdown().is_err());
        emulator.load(&[0x50, 0x00]).unwrap();
        emulator.start().unwrap();
        emulator.shutdown().unwrap();
        assert_eq!(emulator.state(), LifecycleState::Halted);
        assert_eq!(emulator.halt_reason(), Some(HaltReason::Shutdown));
        emulator.shutdown().unwrap();

        emulator.load(&[0x00, 0x00]).unwrap();
        assert_eq!(emulator.state(), LifecycleState::Ready);
        assert_eq!(emulator.halt_reason(), None);
    }

    #[test]
    fn halt_reason_displays_program_message() {
        let reason = HaltReason::Program {
            pc: 2,
            message: String::from("encountered HALT instruction at PC=0x0002"),
        };
        assert_eq!(reason.to_string(), "encountered HALT instruction at PC=0x0002");
        assert_eq!(HaltReason::Shutdown.fault(), None);

        let panicked = HaltReason::ClockPanic {
            clock: String::from("timer-clock"),
        };
        assert_eq!(panicked.to_string(), "timer-clock tick panicked");
        assert_eq!(panicked.fault(), None);
    }
}
