//! Nested source tracking for diagnostics.
//!
//! Every active input (the typed command, or an included test plan file)
//! occupies one [`SourceFrame`] on the [`SourceStack`]. The stack recovers the
//! exact text of the statement a diagnostic refers to, including lines that
//! were consumed silently such as block comments.

use crate::input::{CharStream, FileStream, StreamError};
use std::fmt;
use std::path::Path;

/// Deepest allowed chain of nested inclusions.
pub const MAX_INCLUSION_DEPTH: usize = 64;

/// Position of the reader inside one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    name: String,
    lineno: usize,
    // Counting terminators can overshoot the real number of lines.
    max_lines: usize,
}

impl SourceInfo {
    pub fn new(name: impl Into<String>, lineno: usize, max_lines: usize) -> Self {
        Self {
            name: name.into(),
            lineno,
            max_lines,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lineno(&self) -> usize {
        self.lineno
    }

    pub fn max_lines(&self) -> usize {
        self.max_lines
    }

    pub fn increment_lineno(&mut self) {
        self.lineno += 1;
    }

    pub fn decrement_lineno(&mut self) {
        self.lineno = self.lineno.saturating_sub(1);
    }

    /// Line number clamped for display.
    pub fn display_line(&self) -> usize {
        self.lineno.min(self.max_lines)
    }
}

impl fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file '{}', line {}", self.name, self.display_line())
    }
}

/// One nested level of input.
#[derive(Debug)]
pub struct SourceFrame {
    stream: Box<dyn CharStream>,
    info: SourceInfo,
    saved_previous_line: usize,
}

impl SourceFrame {
    pub fn stream(&self) -> &dyn CharStream {
        self.stream.as_ref()
    }

    pub fn stream_mut(&mut self) -> &mut dyn CharStream {
        self.stream.as_mut()
    }

    pub fn info(&self) -> &SourceInfo {
        &self.info
    }

    pub fn info_mut(&mut self) -> &mut SourceInfo {
        &mut self.info
    }
}

/// Stack of active inputs; the last opened source is on top.
#[derive(Debug, Default)]
pub struct SourceStack {
    frames: Vec<SourceFrame>,
    // Line at which the previous listing of the top frame was taken.
    previous_line: usize,
}

impl SourceStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stream: Box<dyn CharStream>, info: SourceInfo) {
        tracing::trace!(source = %info.name(), depth = self.frames.len() + 1, "push source");
        self.frames.push(SourceFrame {
            stream,
            info,
            saved_previous_line: self.previous_line,
        });
        self.previous_line = 0;
    }

    /// Remove the active frame, closing its stream, and resume the listing
    /// state of the frame underneath.
    pub fn pop(&mut self) -> Option<SourceFrame> {
        let mut frame = self.frames.pop()?;
        frame.stream.close();
        self.previous_line = frame.saved_previous_line;
        tracing::trace!(source = %frame.info.name(), depth = self.frames.len(), "pop source");
        Some(frame)
    }

    /// Open `path` as a file stream and make it the active frame.
    pub fn include(&mut self, path: &Path) -> Result<(), StreamError> {
        if self.frames.len() >= MAX_INCLUSION_DEPTH {
            return Err(StreamError::NestingTooDeep {
                depth: self.frames.len(),
            });
        }
        let stream = FileStream::open(path)?;
        let max_lines = stream.line_count().max(1);
        let info = SourceInfo::new(stream.name().to_string(), 1, max_lines);
        self.push(Box::new(stream), info);
        Ok(())
    }

    pub fn top(&self) -> Option<&SourceFrame> {
        self.frames.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut SourceFrame> {
        self.frames.last_mut()
    }

    /// Close every open stream, bottom first, and empty the stack.
    pub fn clear(&mut self) {
        for frame in self.frames.iter_mut() {
            frame.stream.close();
        }
        self.frames.clear();
        self.previous_line = 0;
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn previous_line(&self) -> usize {
        self.previous_line
    }

    /// Text of the most recently completed line of the active frame.
    ///
    /// When more than one line went by since the last call, every skipped
    /// line is returned so that listings never lose context.
    pub fn current_source_text(&mut self) -> String {
        let Some(frame) = self.frames.last() else {
            return String::new();
        };
        // The reader is already positioned at the start of the next line.
        let current_line = frame.info.lineno().saturating_sub(1);
        let text = if current_line.saturating_sub(self.previous_line) > 1 {
            (self.previous_line + 1..=current_line)
                .map(|line| frame.stream.line_text(line))
                .collect()
        } else {
            frame.stream.line_text(current_line)
        };
        self.previous_line = current_line;
        text
    }

    /// Independent snapshot of the active position; stays valid after the
    /// stack is cleared.
    pub fn source_info(&self) -> Option<SourceInfo> {
        self.frames.last().map(|frame| frame.info.clone())
    }

    pub fn source_info_ref(&self) -> Option<&SourceInfo> {
        self.frames.last().map(|frame| &frame.info)
    }
}
