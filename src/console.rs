//! Terminal output used by the command engine.

use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;

const BOLD: &str = "\x1b[1m";
const UNDERLINE: &str = "\x1b[4m";
const BRIGHT_RED: &str = "\x1b[91m";
const BRIGHT_YELLOW: &str = "\x1b[93m";
const BRIGHT_PINK: &str = "\x1b[95m";
const COLOR_END: &str = "\x1b[0m";

/// Sequence written by `clear`.
pub const CLEAR_SCREEN: &str = "\x1b[H\x1b[2J\r";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colour {
    Red,
    Yellow,
    Pink,
}

impl Colour {
    fn code(self) -> &'static str {
        match self {
            Colour::Red => BRIGHT_RED,
            Colour::Yellow => BRIGHT_YELLOW,
            Colour::Pink => BRIGHT_PINK,
        }
    }
}

/// Emphasis applied to a coloured line.
#[derive(Debug, Clone, Copy, Default)]
pub struct Style {
    pub bold: bool,
    pub underline: bool,
}

impl Style {
    pub const PLAIN: Style = Style {
        bold: false,
        underline: false,
    };
    pub const HEADING: Style = Style {
        bold: true,
        underline: true,
    };
}

pub struct Console {
    out: Box<dyn Write + Send>,
    colour: bool,
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console").field("colour", &self.colour).finish()
    }
}

impl Console {
    pub fn stdout() -> Self {
        use std::io::IsTerminal;
        let colour = io::stdout().is_terminal();
        Self {
            out: Box::new(io::stdout()),
            colour,
        }
    }

    pub fn with_writer(out: Box<dyn Write + Send>, colour: bool) -> Self {
        Self { out, colour }
    }

    /// Console writing into a shared in-memory buffer, without colour.
    pub fn capture() -> (Self, SharedBuffer) {
        let buffer = SharedBuffer::default();
        (Self::with_writer(Box::new(buffer.clone()), false), buffer)
    }

    pub fn colour_enabled(&self) -> bool {
        self.colour
    }

    pub fn print(&mut self, text: &str) {
        if let Err(err) = self.out.write_all(text.as_bytes()) {
            tracing::warn!(%err, "console write failed");
        }
        self.flush();
    }

    pub fn println(&mut self, text: &str) {
        self.print(&format!("{text}\n"));
    }

    pub fn flush(&mut self) {
        if let Err(err) = self.out.flush() {
            tracing::warn!(%err, "console flush failed");
        }
    }

    /// Wrap `text` in colour codes when colour is enabled.
    pub fn paint(&self, text: &str, colour: Colour, style: Style) -> String {
        if !self.colour {
            return text.to_string();
        }
        let bold = if style.bold { BOLD } else { "" };
        let underline = if style.underline { UNDERLINE } else { "" };
        format!("{bold}{underline}{}{text}{COLOR_END}", colour.code())
    }

    pub fn print_coloured(&mut self, text: &str, colour: Colour, style: Style) {
        let painted = self.paint(text, colour, style);
        self.println(&painted);
    }

    pub fn yellow(&mut self, text: &str) {
        self.print_coloured(text, Colour::Yellow, Style::PLAIN);
    }

    pub fn pink(&mut self, text: &str) {
        self.print_coloured(text, Colour::Pink, Style::PLAIN);
    }

    pub fn red(&mut self, text: &str) {
        self.print_coloured(text, Colour::Red, Style::PLAIN);
    }

    pub fn clear_screen(&mut self) {
        self.print(CLEAR_SCREEN);
    }
}

/// Cloneable in-memory writer for capturing console output.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
