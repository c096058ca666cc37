//! 8x8 character display and its render back ends.
//!
//! Coordinates follow the `DRAW` instruction: `x` is the row and `y` the
//! column, so cell `(x, y)` lives at index `x * 8 + y`.

use std::fmt::Write as _;
use std::io::{self, Write};

use crate::event::{EmulatorEvent, EventSubscriber};

/// Rows and columns of the display.
pub const DISPLAY_SIZE: usize = 8;

/// Cells in one frame.
pub const FRAME_CELLS: usize = DISPLAY_SIZE * DISPLAY_SIZE;

const ANSI_CLEAR: &str = "\u{1b}[2J\u{1b}[H";
const BLANK: char = '.';

/// Receiver of display updates.
pub trait DisplaySink: Send {
    /// Stores `value` at row `x`, column `y`. Out-of-range cells are ignored.
    fn draw_pixel(&mut self, x: u8, y: u8, value: u8);

    /// Presents the current frame.
    fn refresh(&mut self);
}

/// Raw 8x8 byte frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameBuffer {
    cells: [u8; FRAME_CELLS],
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self {
            cells: [0; FRAME_CELLS],
        }
    }
}

impl FrameBuffer {
    /// Creates a blank frame.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    const fn index(x: u8, y: u8) -> Option<usize> {
        let (x, y) = (x as usize, y as usize);
        if x < DISPLAY_SIZE && y < DISPLAY_SIZE {
            Some(x * DISPLAY_SIZE + y)
        } else {
            None
        }
    }

    /// Cell at row `x`, column `y`.
    #[must_use]
    pub const fn get(&self, x: u8, y: u8) -> Option<u8> {
        match Self::index(x, y) {
            Some(index) => Some(self.cells[index]),
            None => None,
        }
    }

    /// Writes one cell; returns `false` when the cell is off-screen.
    pub fn set(&mut self, x: u8, y: u8, value: u8) -> bool {
        Self::index(x, y).is_some_and(|index| {
            self.cells[index] = value;
            true
        })
    }

    /// Frame rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.cells.chunks_exact(DISPLAY_SIZE)
    }

    /// Whole frame in row-major order.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; FRAME_CELLS] {
        &self.cells
    }

    /// Blanks every cell.
    pub fn clear(&mut self) {
        self.cells = [0; FRAME_CELLS];
    }
}

impl DisplaySink for FrameBuffer {
    fn draw_pixel(&mut self, x: u8, y: u8, value: u8) {
        if !self.set(x, y, value) {
            tracing::debug!(x, y, "draw outside the display ignored");
        }
    }

    fn refresh(&mut self) {}
}

/// Text layout used when presenting a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RenderStyle {
    /// Bordered character grid.
    #[default]
    Console,
    /// Two-digit hex per cell.
    Hex,
}

/// Printable glyph for a cell value.
#[must_use]
pub fn display_char(value: u8) -> char {
    match value {
        0 => BLANK,
        128.. => '?',
        _ => {
            let c = char::from(value);
            if c.is_ascii_control() || c.is_ascii_whitespace() {
                BLANK
            } else {
                c
            }
        }
    }
}

impl RenderStyle {
    /// Renders `frame` as text, one line per row, newline-terminated.
    #[must_use]
    pub fn render(self, frame: &FrameBuffer) -> String {
        let mut text = String::new();
        match self {
            Self::Console => {
                let border = format!("+{}+\n", "-".repeat(DISPLAY_SIZE * 3));
                text.push_str(&border);
                for row in frame.rows() {
                    text.push('|');
                    for &cell in row {
                        let _ = write!(text, " {} ", display_char(cell));
                    }
                    text.push_str("|\n");
                }
                text.push_str(&border);
            }
            Self::Hex => {
                for row in frame.rows() {
                    let cells: Vec<String> = row.iter().map(|cell| format!("{cell:02X}")).collect();
                    text.push_str(&cells.join(" "));
                    text.push('\n');
                }
            }
        }
        text
    }
}

/// Frame buffer that writes itself to `out` on every refresh.
pub struct RenderedDisplay<W> {
    frame: FrameBuffer,
    style: RenderStyle,
    clear_screen: bool,
    out: W,
}

impl<W: Write + Send> RenderedDisplay<W> {
    /// Creates a blank display rendering through `style`.
    pub fn new(style: RenderStyle, out: W) -> Self {
        Self {
            frame: FrameBuffer::new(),
            style,
            clear_screen: false,
            out,
        }
    }

    /// Emits an ANSI clear-screen sequence before each frame.
    #[must_use]
    pub fn with_clear_screen(mut self, enabled: bool) -> Self {
        self.clear_screen = enabled;
        self
    }

    /// Current frame.
    #[must_use]
    pub const fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    /// Output writer.
    pub const fn writer(&self) -> &W {
        &self.out
    }

    fn present(&mut self) -> io::Result<()> {
        if self.clear_screen {
            self.out.write_all(ANSI_CLEAR.as_bytes())?;
        }
        self.out.write_all(self.style.render(&self.frame).as_bytes())?;
        self.out.flush()
    }
}

impl<W: Write + Send> DisplaySink for RenderedDisplay<W> {
    fn draw_pixel(&mut self, x: u8, y: u8, value: u8) {
        self.frame.draw_pixel(x, y, value);
    }

    fn refresh(&mut self) {
        if let Err(err) = self.present() {
            tracing::warn!(%err, "display refresh failed");
        }
    }
}

/// Event-bus subscriber that drives a [`DisplaySink`].
#[derive(Debug, Default)]
pub struct Display<S> {
    sink: S,
    refreshes: u64,
}

impl<S: DisplaySink> Display<S> {
    /// Wraps `sink`.
    pub const fn new(sink: S) -> Self {
        Self { sink, refreshes: 0 }
    }

    /// Underlying sink.
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Refresh requests handled so far.
    #[must_use]
    pub const fn refresh_count(&self) -> u64 {
        self.refreshes
    }
}

impl<S: DisplaySink> EventSubscriber for Display<S> {
    fn on_event(&mut self, event: &EmulatorEvent) {
        match *event {
            EmulatorEvent::DrawPixel { x, y, value } => self.sink.draw_pixel(x, y, value),
            EmulatorEvent::Refresh => {
                self.refreshes += 1;
                self.sink.refresh();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{display_char, Display, FrameBuffer, RenderStyle, RenderedDisplay};
    use crate::event::{EmulatorEvent, EventSubscriber};

    #[rstest]
    #[case(0, '.')]
    #[case(b' ', '.')]
    #[case(b'\n', '.')]
    #[case(0x7F, '.')]
    #[case(b'A', 'A')]
    #[case(b'~', '~')]
    #[case(200, '?')]
    fn glyphs_hide_unprintable_values(#[case] value: u8, #[case] expected: char) {
        assert_eq!(display_char(value), expected);
    }

    #[test]
    fn x_selects_row_and_y_selects_column() {
        let mut frame = FrameBuffer::new();
        assert!(frame.set(1, 2, b'Z'));
        assert_eq!(frame.as_bytes()[10], b'Z');
        assert_eq!(frame.get(1, 2), Some(b'Z'));
        assert_eq!(frame.get(2, 1), Some(0));
        assert!(!frame.set(8, 0, b'Z'));
        assert_eq!(frame.get(0, 8), None);
    }

    #[test]
    fn console_render_draws_bordered_grid() {
        let mut frame = FrameBuffer::new();
        frame.set(0, 0, b'H');
        frame.set(0, 1, b'i');
        let text = RenderStyle::Console.render(&frame);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], format!("+{}+", "-".repeat(24)));
        assert_eq!(lines[1], "| H  i  .  .  .  .  .  . |");
        assert_eq!(lines[2], "| .  .  .  .  .  .  .  . |");
        assert_eq!(lines[9], lines[0]);
    }

    #[test]
    fn hex_render_prints_raw_bytes() {
        let mut frame = FrameBuffer::new();
        frame.set(7, 7, 0xAB);
        let text = RenderStyle::Hex.render(&frame);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], "00 00 00 00 00 00 00 00");
        assert_eq!(lines[7], "00 00 00 00 00 00 00 AB");
    }

    #[test]
    fn subscriber_draws_and_renders_on_refresh() {
        let mut display = Display::new(RenderedDisplay::new(RenderStyle::Hex, Vec::new()));
        display.on_event(&EmulatorEvent::DrawPixel {
            x: 0,
            y: 3,
            value: 0x41,
        });
        assert!(display.sink().writer().is_empty(), "nothing until refresh");

        display.on_event(&EmulatorEvent::Refresh);
        display.on_event(&EmulatorEvent::TimerTick(4));

        assert_eq!(display.refresh_count(), 1);
        assert_eq!(display.sink().frame().get(0, 3), Some(0x41));
        let written = String::from_utf8(display.sink().writer().clone()).unwrap();
        assert!(written.starts_with("00 00 00 41 00 00 00 00\n"));
    }

    #[test]
    fn clear_screen_prefixes_each_frame() {
        let mut sink = RenderedDisplay::new(RenderStyle::Console, Vec::new()).with_clear_screen(true);
        super::DisplaySink::refresh(&mut sink);
        assert!(sink.writer().starts_with(b"\x1b[2J\x1b[H+"));
    }
}
