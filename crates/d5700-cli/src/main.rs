//! `d5700` command-line runner and disassembler.

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use d5700_core::config::{DEFAULT_INSTRUCTION_HZ, DEFAULT_TIMER_HZ};
use d5700_core::{
    disassemble, disassemble_window, load_rom_file, Display, Emulator, EmulatorConfig, HaltReason,
    LineKeyboard, RenderStyle, RenderedDisplay, TimerMonitor,
};
#[cfg(test)]
use tempfile as _;
use tracing_subscriber::EnvFilter;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Exit status after Ctrl-C.
const INTERRUPTED_STATUS: u8 = 130;

/// Exit status when a clock tick panicked.
const PANIC_STATUS: u8 = 101;

/// Words shown on each side of a faulting instruction.
const FAULT_CONTEXT_WORDS: u16 = 3;

/// D5700 virtual CPU emulator
#[derive(Debug, Parser)]
#[command(name = "d5700", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a ROM image until it halts or Ctrl-C is pressed
    Run(RunArgs),
    /// Print one line per instruction word of a ROM image
    Disasm {
        /// ROM image path
        rom: PathBuf,
    },
}

#[derive(Debug, Args)]
struct RunArgs {
    /// ROM image path
    rom: PathBuf,

    /// How the 8x8 display is shown on stdout
    #[arg(long, value_enum, default_value_t = DisplayMode::Console)]
    display: DisplayMode,

    /// Instruction clock rate in Hz
    #[arg(long, default_value_t = DEFAULT_INSTRUCTION_HZ,
          value_parser = clap::value_parser!(u32).range(1..))]
    instruction_hz: u32,

    /// Timer clock rate in Hz
    #[arg(long, default_value_t = DEFAULT_TIMER_HZ,
          value_parser = clap::value_parser!(u32).range(1..))]
    timer_hz: u32,
}

impl RunArgs {
    fn config(&self) -> EmulatorConfig {
        EmulatorConfig {
            instruction_hz: self.instruction_hz,
            timer_hz: self.timer_hz,
            ..EmulatorConfig::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DisplayMode {
    /// Bordered character grid
    Console,
    /// Two-digit hex per cell
    Hex,
    /// No display output
    #[value(name = "none")]
    Off,
}

impl DisplayMode {
    const fn style(self) -> Option<RenderStyle> {
        match self {
            Self::Console => Some(RenderStyle::Console),
            Self::Hex => Some(RenderStyle::Hex),
            Self::Off => None,
        }
    }
}

fn exit_status(reason: &HaltReason) -> u8 {
    match reason {
        HaltReason::Program { .. } => 0,
        HaltReason::Fault { fault, .. } => fault.code(),
        HaltReason::ClockPanic { .. } => PANIC_STATUS,
        HaltReason::Shutdown => INTERRUPTED_STATUS,
    }
}

fn read_image(path: &Path) -> Result<Vec<u8>> {
    load_rom_file(path).with_context(|| format!("failed to load ROM {}", path.display()))
}

fn run(args: &RunArgs) -> Result<u8> {
    let image = read_image(&args.rom)?;
    let config = args.config();

    let mut emulator = Emulator::new(config, LineKeyboard::stdin());
    if let Some(style) = args.display.style() {
        let clear = style == RenderStyle::Console && io::stdout().is_terminal();
        let sink = RenderedDisplay::new(style, io::stdout()).with_clear_screen(clear);
        emulator.subscribe(Arc::new(Mutex::new(Display::new(sink))));
    }
    emulator.subscribe(Arc::new(Mutex::new(TimerMonitor::new(config.timer_hz))));
    emulator.load(&image)?;

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("failed to install Ctrl-C handler")?;

    tracing::info!(rom = %args.rom.display(), bytes = image.len(), ?config, "starting");
    emulator.start()?;
    while !emulator.wait_until_halted(POLL_INTERVAL) {
        if interrupted.load(Ordering::SeqCst) {
            tracing::info!("interrupted; shutting down");
            emulator.shutdown()?;
        }
    }

    let reason = emulator.halt_reason().unwrap_or(HaltReason::Shutdown);
    println!("{reason}");
    if let HaltReason::Fault { pc, .. } = reason {
        for row in disassemble_window(pc, FAULT_CONTEXT_WORDS, FAULT_CONTEXT_WORDS, &image) {
            let marker = if row.address == pc { "=>" } else { "  " };
            eprintln!("{marker} {row}");
        }
    }
    Ok(exit_status(&reason))
}

fn disasm(rom: &Path) -> Result<u8> {
    let image = read_image(rom)?;
    for row in disassemble(&image) {
        println!("{row}");
    }
    Ok(0)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing();

    let status = match &cli.command {
        Command::Run(args) => run(args)?,
        Command::Disasm { rom } => disasm(rom)?,
    };
    Ok(ExitCode::from(status))
}
