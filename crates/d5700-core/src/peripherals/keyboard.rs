//! Hexadecimal keyboard sources.

use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, Write};

/// Prompt printed before each blocking keyboard read.
pub const INPUT_PROMPT: &str = "INPUT REQUIRED: ";

/// Blocking source of one hex byte per `READ_KEYBOARD`.
pub trait KeyboardSource: Send {
    /// Reads one byte. Malformed input yields `0`.
    fn read_hex_byte(&mut self) -> u8;
}

/// Parses one keyboard line: the first two characters of the trimmed line as
/// hexadecimal. Empty or malformed input is `None`.
#[must_use]
pub fn parse_hex_line(line: &str) -> Option<u8> {
    let trimmed = line.trim();
    let digits = match trimmed.char_indices().nth(2) {
        Some((end, _)) => &trimmed[..end],
        None => trimmed,
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(digits, 16).ok()
}

/// Line-oriented keyboard over any buffered reader, typically stdin.
pub struct LineKeyboard<R> {
    reader: R,
    prompt: Option<Box<dyn Write + Send>>,
}

impl<R: BufRead + Send> LineKeyboard<R> {
    /// Creates a keyboard that reads without prompting.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            prompt: None,
        }
    }

    /// Writes [`INPUT_PROMPT`] to `out` before every read.
    #[must_use]
    pub fn with_prompt(mut self, out: Box<dyn Write + Send>) -> Self {
        self.prompt = Some(out);
        self
    }

    fn show_prompt(&mut self) -> io::Result<()> {
        if let Some(out) = self.prompt.as_mut() {
            out.write_all(INPUT_PROMPT.as_bytes())?;
            out.flush()?;
        }
        Ok(())
    }
}

impl LineKeyboard<BufReader<io::Stdin>> {
    /// Keyboard reading from the process stdin, prompting on stdout.
    #[must_use]
    pub fn stdin() -> Self {
        Self::new(BufReader::new(io::stdin())).with_prompt(Box::new(io::stdout()))
    }
}

impl<R: BufRead + Send> KeyboardSource for LineKeyboard<R> {
    fn read_hex_byte(&mut self) -> u8 {
        if let Err(err) = self.show_prompt() {
            tracing::debug!(%err, "keyboard prompt not written");
        }

        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => {
                tracing::warn!("keyboard input closed; reading 0");
                0
            }
            Ok(_) => parse_hex_line(&line).unwrap_or_else(|| {
                tracing::warn!(input = line.trim(), "malformed keyboard input; reading 0");
                0
            }),
            Err(err) => {
                tracing::warn!(%err, "keyboard read failed; reading 0");
                0
            }
        }
    }
}

/// Replays a fixed list of bytes, then reads `0` forever.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptedKeyboard {
    pending: VecDeque<u8>,
}

impl ScriptedKeyboard {
    /// Creates a keyboard that returns `bytes` in order.
    pub fn new(bytes: impl IntoIterator<Item = u8>) -> Self {
        Self {
            pending: bytes.into_iter().collect(),
        }
    }

    /// Bytes not yet read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl KeyboardSource for ScriptedKeyboard {
    fn read_hex_byte(&mut self) -> u8 {
        self.pending.pop_front().unwrap_or(0)
    }
}
