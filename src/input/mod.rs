//! Input abstraction shared by typed commands and test plan files.
//!
//! The front end reads characters through [`CharStream`] and cannot tell
//! whether they were typed at the prompt or read from disk.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Display name of the stream wrapping an interactively entered command.
pub const PSEUDO_STREAM_NAME: &str = "«stdin»";

/// Sentinel appended as the final line of every file-backed stream.
pub const END_OF_INPUT: char = '\0';

/// Failures raised while opening a file-backed stream.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Test plan file '{}' I/O error, {reason}", path.display())]
    Io { path: PathBuf, reason: String },
    #[error("Deeply nested test plan file inclusion, possibly cyclic (depth {depth})")]
    NestingTooDeep { depth: usize },
}

/// Random-access character source consumed by the language front end.
///
/// No operation fails on out-of-range access: reads clamp at the end of the
/// content and an empty read is the end-of-input signal.
pub trait CharStream: fmt::Debug {
    fn name(&self) -> &str;

    /// Return up to `size` characters and advance past them.
    fn read(&mut self, size: usize) -> String;

    /// Move the cursor by a relative offset, clamped to the content.
    fn seek(&mut self, offset: isize);

    /// Literal text of the 1-based logical line `line`.
    fn line_text(&self, line: usize) -> String;

    fn line_count(&self) -> usize;

    fn position(&self) -> usize;

    /// Release any handle held by the stream. Idempotent.
    fn close(&mut self) {}

    fn roll_back(&mut self) {
        self.seek(-1);
    }

    fn next_char(&mut self) -> Option<char> {
        self.read(1).chars().next()
    }
}

#[derive(Debug, Clone, Default)]
struct CharBuffer {
    chars: Vec<char>,
    pointer: usize,
}

impl CharBuffer {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pointer: 0,
        }
    }

    fn read(&mut self, size: usize) -> String {
        let end = self.pointer.saturating_add(size).min(self.chars.len());
        let data: String = self.chars[self.pointer..end].iter().collect();
        self.pointer = end;
        data
    }

    fn seek(&mut self, offset: isize) {
        let target = self.pointer as isize + offset;
        self.pointer = target.clamp(0, self.chars.len() as isize) as usize;
    }

    fn newlines(&self) -> usize {
        self.chars.iter().filter(|c| **c == '\n').count()
    }
}

/// A typed command presented as a one-line stream.
#[derive(Debug, Clone)]
pub struct PseudoStream {
    text: String,
    buffer: CharBuffer,
}

impl PseudoStream {
    pub fn new(command: &str) -> Self {
        // The trailing terminator is required by statements that wait for
        // the end of the line before acting.
        let text = format!("{command}\n");
        let buffer = CharBuffer::new(&text);
        Self { text, buffer }
    }
}

impl CharStream for PseudoStream {
    fn name(&self) -> &str {
        PSEUDO_STREAM_NAME
    }

    fn read(&mut self, size: usize) -> String {
        self.buffer.read(size)
    }

    fn seek(&mut self, offset: isize) {
        self.buffer.seek(offset);
    }

    fn line_text(&self, _line: usize) -> String {
        self.text.clone()
    }

    fn line_count(&self) -> usize {
        self.buffer.newlines()
    }

    fn position(&self) -> usize {
        self.buffer.pointer
    }
}

/// A test plan file loaded into memory.
///
/// The handle stays open until [`CharStream::close`] or drop so that the
/// file cannot be replaced underneath an executing inclusion.
pub struct FileStream {
    name: String,
    file: Option<File>,
    lines: Vec<String>,
    buffer: CharBuffer,
}

impl FileStream {
    pub fn open(path: &Path) -> Result<Self, StreamError> {
        let io_error = |err: std::io::Error| StreamError::Io {
            path: path.to_path_buf(),
            reason: err.to_string().to_lowercase(),
        };
        let mut file = File::open(path).map_err(io_error)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(io_error)?;
        let text = String::from_utf8_lossy(&bytes);

        let mut lines: Vec<String> = text.split_inclusive('\n').map(str::to_string).collect();
        if let Some(last) = lines.last_mut() {
            if last.chars().last().is_some_and(|c| (c as u32) <= 31) {
                last.pop();
                last.push('\n');
            }
        }
        lines.push(END_OF_INPUT.to_string());

        let buffer = CharBuffer::new(&lines.concat());
        tracing::debug!(path = %path.display(), lines = lines.len(), "opened test plan file");
        Ok(Self {
            name: path.display().to_string(),
            file: Some(file),
            lines,
            buffer,
        })
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }
}

impl fmt::Debug for FileStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStream")
            .field("name", &self.name)
            .field("open", &self.is_open())
            .field("pointer", &self.buffer.pointer)
            .finish()
    }
}

impl CharStream for FileStream {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self, size: usize) -> String {
        self.buffer.read(size)
    }

    fn seek(&mut self, offset: isize) {
        self.buffer.seek(offset);
    }

    fn line_text(&self, line: usize) -> String {
        line.checked_sub(1)
            .and_then(|index| self.lines.get(index))
            .cloned()
            .unwrap_or_default()
    }

    fn line_count(&self) -> usize {
        self.buffer.newlines()
    }

    fn position(&self) -> usize {
        self.buffer.pointer
    }

    fn close(&mut self) {
        self.file.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(contents: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[test]
    fn rollback_reproduces_last_character() {
        let mut stream = PseudoStream::new("print 42");
        for size in 1..=9 {
            let mut probe = stream.clone();
            probe.seek(0);
            let chunk = probe.read(size);
            probe.seek(-1);
            assert_eq!(probe.read(1), chunk.chars().last().unwrap().to_string());
        }
        assert_eq!(stream.read(3), "pri");
        stream.roll_back();
        assert_eq!(stream.next_char(), Some('i'));
    }

    #[test]
    fn reads_past_end_shrink_then_stop() {
        let mut stream = PseudoStream::new("abc");
        assert_eq!(stream.read(3), "abc");
        assert_eq!(stream.read(3), "\n");
        assert_eq!(stream.position(), 4);
        assert_eq!(stream.read(3), "");
        assert_eq!(stream.position(), 4);
        assert_eq!(stream.next_char(), None);
    }

    #[test]
    fn seek_never_leaves_the_content() {
        let mut stream = PseudoStream::new("xy");
        stream.seek(-10);
        assert_eq!(stream.position(), 0);
        stream.seek(100);
        assert_eq!(stream.position(), 3);
    }

    #[test]
    fn pseudo_stream_lines_are_the_whole_command() {
        let stream = PseudoStream::new("a := 1");
        assert_eq!(stream.name(), PSEUDO_STREAM_NAME);
        assert_eq!(stream.line_text(1), "a := 1\n");
        assert_eq!(stream.line_text(7), "a := 1\n");
        assert_eq!(stream.line_count(), 1);
    }

    #[test]
    fn file_stream_appends_sentinel_line() {
        let file = file_with(b"one\ntwo\n");
        let stream = FileStream::open(file.path()).unwrap();
        assert_eq!(stream.line_text(1), "one\n");
        assert_eq!(stream.line_text(2), "two\n");
        assert_eq!(stream.line_text(3), "\0");
        assert_eq!(stream.line_text(0), "");
        assert_eq!(stream.line_text(42), "");
        assert_eq!(stream.line_count(), 2);
    }

    #[test]
    fn trailing_control_byte_becomes_terminator() {
        let file = file_with(b"one\ntwo\x1a");
        let mut stream = FileStream::open(file.path()).unwrap();
        assert_eq!(stream.line_text(2), "two\n");
        assert_eq!(stream.read(100), "one\ntwo\n\0");
    }

    #[test]
    fn close_releases_handle() {
        let file = file_with(b"x\n");
        let mut stream = FileStream::open(file.path()).unwrap();
        assert!(stream.is_open());
        stream.close();
        stream.close();
        assert!(!stream.is_open());
        assert_eq!(stream.read(1), "x");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileStream::open(&dir.path().join("absent.tpf")).unwrap_err();
        assert!(matches!(err, StreamError::Io { .. }));
        assert!(err.to_string().contains("absent.tpf"));
    }
}
