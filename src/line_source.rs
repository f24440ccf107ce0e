//! Where the engine gets its lines: the line editor, plain stdin, or a script.

use crate::completer::{AitessHelper, Vocabulary};
use crate::history::HistoryManager;
use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// Ctrl-C while waiting for input.
    Interrupted,
    /// No more input.
    Eof,
}

pub trait LineSource {
    /// Read one command line after showing `prompt`.
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome>;

    /// Read an answer to a question; never recorded in history.
    fn ask(&mut self, prompt: &str) -> Result<ReadOutcome> {
        self.read_line(prompt)
    }

    /// Whether a person is typing at a line editor.
    fn is_interactive(&self) -> bool;

    /// Persist whatever state outlives the session.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Interactive prompt with completion and persisted history.
pub struct EditorSource {
    editor: Editor<AitessHelper, DefaultHistory>,
    history: HistoryManager,
}

impl EditorSource {
    pub fn new(vocabulary: Vocabulary, history: HistoryManager) -> Result<Self> {
        let mut editor = Editor::<AitessHelper, DefaultHistory>::new()?;
        editor.set_helper(Some(AitessHelper::new(vocabulary)));
        for entry in history.entries() {
            let _ = editor.add_history_entry(entry.as_str());
        }
        Ok(Self { editor, history })
    }

    fn read(&mut self, prompt: &str, record: bool) -> Result<ReadOutcome> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if record {
                    let _ = self.editor.add_history_entry(line.as_str());
                    self.history.add(&line);
                }
                Ok(ReadOutcome::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(err) => Err(err.into()),
        }
    }
}

impl LineSource for EditorSource {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        self.read(prompt, true)
    }

    fn ask(&mut self, prompt: &str) -> Result<ReadOutcome> {
        self.read(prompt, false)
    }

    fn is_interactive(&self) -> bool {
        true
    }

    fn finish(&mut self) -> Result<()> {
        self.history.save()
    }
}

/// Batch input read line by line from standard input.
///
/// Command prompts are not written; the engine echoes each line instead.
#[derive(Debug, Default)]
pub struct StdinSource;

impl StdinSource {
    pub fn new() -> Self {
        Self
    }

    fn next_line() -> Result<ReadOutcome> {
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(ReadOutcome::Eof);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(ReadOutcome::Line(line))
    }
}

impl LineSource for StdinSource {
    fn read_line(&mut self, _prompt: &str) -> Result<ReadOutcome> {
        Self::next_line()
    }

    fn ask(&mut self, prompt: &str) -> Result<ReadOutcome> {
        let mut stdout = io::stdout();
        stdout.write_all(prompt.as_bytes())?;
        stdout.flush()?;
        Self::next_line()
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

/// Predetermined input, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    queue: VecDeque<ReadOutcome>,
    interactive: bool,
}

impl ScriptedSource {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queue: lines
                .into_iter()
                .map(|line| ReadOutcome::Line(line.into()))
                .collect(),
            interactive: false,
        }
    }

    /// Behave like a person at the prompt.
    pub fn interactive(mut self) -> Self {
        self.interactive = true;
        self
    }

    pub fn push_line(&mut self, line: impl Into<String>) {
        self.queue.push_back(ReadOutcome::Line(line.into()));
    }

    pub fn interrupt(&mut self) {
        self.queue.push_back(ReadOutcome::Interrupted);
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl LineSource for ScriptedSource {
    fn read_line(&mut self, _prompt: &str) -> Result<ReadOutcome> {
        Ok(self.queue.pop_front().unwrap_or(ReadOutcome::Eof))
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }
}
