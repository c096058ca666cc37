//! Host-side collaborators: keyboard input, display output, timer observer.

pub mod display;
pub mod keyboard;
pub mod timer;

pub use display::{
    display_char, Display, DisplaySink, FrameBuffer, RenderStyle, RenderedDisplay, DISPLAY_SIZE,
};
pub use keyboard::{parse_hex_line, KeyboardSource, LineKeyboard, ScriptedKeyboard, INPUT_PROMPT};
pub use timer::{Countdown, TimerMonitor};
