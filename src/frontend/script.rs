//! Line-oriented front end shipped with the runtime.
//!
//! One statement per line:
//!
//! ```text
//! ! line comment
//! !# block
//!    comment #!
//! @plan.tpf                 include a test plan file
//! symb alt addr=0x40 dtype=u16
//! count := 3
//! print count
//! display off | logging on
//! delete count
//! assert count
//! exit
//! ```

use super::{FrontEnd, Message, MessageKind};
use crate::engine::Session;
use crate::error::Failure;
use crate::input::{CharStream, END_OF_INPUT, PSEUDO_STREAM_NAME};
use crate::source::{SourceFrame, SourceInfo};
use crate::symbol::{Attribute, Entry, EntryData, SymbolAttributes, Value};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Instant;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\A[A-Za-z_]\w*\z").expect("identifier pattern is valid"));

const KEYWORDS: [&str; 9] = [
    "print", "display", "logging", "symb", "delete", "exit", "assert", "on", "off",
];

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Name(String),
}

impl Expr {
    fn parse(text: &str) -> Result<Self, Failure> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Failure::parse("Expected an expression"));
        }
        if let Some(body) = text.strip_prefix('"') {
            return match body.strip_suffix('"') {
                Some(inner) => Ok(Expr::Literal(Value::Text(inner.to_string()))),
                None => Err(Failure::scan("Unterminated string literal")),
            };
        }
        match Value::parse(text) {
            Value::Text(word) if IDENTIFIER.is_match(&word) => Ok(Expr::Name(word.to_lowercase())),
            Value::Text(_) => Err(Failure::parse(format!("Invalid expression '{text}'"))),
            literal => Ok(Expr::Literal(literal)),
        }
    }
}

fn split_word(text: &str) -> (&str, &str) {
    match text.find(char::is_whitespace) {
        Some(idx) => (&text[..idx], text[idx..].trim()),
        None => (text, ""),
    }
}

fn on_off(keyword: &str, argument: &str) -> Result<bool, Failure> {
    match argument.to_lowercase().as_str() {
        "on" => Ok(true),
        "off" => Ok(false),
        _ => Err(Failure::parse(format!(
            "Expected 'on' or 'off' after '{keyword}'"
        ))),
    }
}

/// Read one statement from the active frame. Comments are dropped; the line
/// counter advances past the statement's terminator.
fn read_statement(frame: &mut SourceFrame) -> Result<Option<String>, &'static str> {
    let mut text = String::new();
    loop {
        let Some(c) = frame.stream_mut().next_char() else {
            return Ok((!text.is_empty()).then_some(text));
        };
        match c {
            END_OF_INPUT => {
                if text.is_empty() {
                    return Ok(None);
                }
                frame.info_mut().increment_lineno();
                return Ok(Some(text));
            }
            '\n' => {
                frame.info_mut().increment_lineno();
                return Ok(Some(text));
            }
            '!' => match frame.stream_mut().next_char() {
                Some('#') => skip_block_comment(frame)?,
                Some(_) => {
                    frame.stream_mut().roll_back();
                    skip_line_comment(frame);
                }
                None => {}
            },
            '"' => {
                text.push('"');
                loop {
                    match frame.stream_mut().next_char() {
                        Some('"') => {
                            text.push('"');
                            break;
                        }
                        Some('\n') | Some(END_OF_INPUT) | None => {
                            return Err("Unterminated string literal");
                        }
                        Some(other) => text.push(other),
                    }
                }
            }
            other => text.push(other),
        }
    }
}

fn skip_line_comment(frame: &mut SourceFrame) {
    while let Some(c) = frame.stream_mut().next_char() {
        if c == '\n' || c == END_OF_INPUT {
            frame.stream_mut().roll_back();
            return;
        }
    }
}

fn skip_block_comment(frame: &mut SourceFrame) -> Result<(), &'static str> {
    let mut previous = '\0';
    loop {
        match frame.stream_mut().next_char() {
            None | Some(END_OF_INPUT) => return Err("Unterminated block comment"),
            Some('!') if previous == '#' => return Ok(()),
            Some(c) => {
                if c == '\n' {
                    frame.info_mut().increment_lineno();
                }
                previous = c;
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct ScriptFrontEnd {
    profile_level: u8,
    skip_evaluation: bool,
    statements: usize,
}

impl ScriptFrontEnd {
    pub fn new() -> Self {
        Self::default()
    }

    fn run_frame(&mut self, session: &mut Session) -> Result<(), Failure> {
        while let Some(statement) = self.next_statement(session)? {
            self.execute(session, &statement)?;
        }
        Ok(())
    }

    fn next_statement(&mut self, session: &mut Session) -> Result<Option<String>, Failure> {
        let Some(frame) = session.sources.top_mut() else {
            return Ok(None);
        };
        match read_statement(frame) {
            Ok(statement) => Ok(statement),
            Err(message) => {
                let location = session.sources.source_info();
                let listing = session.sources.current_source_text();
                Err(Failure::scan(message).at(location, listing))
            }
        }
    }

    fn execute(&mut self, session: &mut Session, statement: &str) -> Result<(), Failure> {
        let text = statement.trim();
        if text.is_empty() {
            return Ok(());
        }
        let listing = session.sources.current_source_text();
        let typed = session
            .sources
            .top()
            .is_some_and(|frame| frame.info().name() == PSEUDO_STREAM_NAME);
        if !typed {
            session.record_listing(&listing);
        }
        self.statements += 1;
        self.run_statement(session, text).map_err(|failure| {
            let mut location = session.sources.source_info();
            if let Some(info) = location.as_mut() {
                info.decrement_lineno();
            }
            failure.or_at(location, listing)
        })
    }

    fn run_statement(&mut self, session: &mut Session, text: &str) -> Result<(), Failure> {
        if let Some(file) = text.strip_prefix('@') {
            return self.include(session, file.trim());
        }
        if let Some((name, value)) = text.split_once(":=") {
            let name = name.trim();
            if IDENTIFIER.is_match(name) {
                return self.assign(session, &name.to_lowercase(), value);
            }
        }
        let (word, rest) = split_word(text);
        match word.to_lowercase().as_str() {
            "print" => {
                let expr = Expr::parse(rest)?;
                if !self.skip_evaluation {
                    let value = evaluate(session, &expr)?;
                    session.output.push(Message::output(value.to_string()));
                }
                Ok(())
            }
            "display" => {
                let state = on_off("display", rest)?;
                if !self.skip_evaluation {
                    session.display_state = state;
                }
                Ok(())
            }
            "logging" => {
                let state = on_off("logging", rest)?;
                if !self.skip_evaluation {
                    session.logging_state = state;
                }
                Ok(())
            }
            "symb" => self.declare_symbol(session, rest),
            "delete" => {
                if !IDENTIFIER.is_match(rest) {
                    return Err(Failure::parse("Expected a name after 'delete'"));
                }
                if self.skip_evaluation {
                    return Ok(());
                }
                let name = rest.to_lowercase();
                session
                    .symbols
                    .remove(&name)
                    .map(|_| ())
                    .ok_or_else(|| Failure::evaluation(format!("Name '{name}' is not defined")))
            }
            "exit" => {
                if !rest.is_empty() {
                    return Err(Failure::parse("'exit' takes no arguments"));
                }
                if self.skip_evaluation {
                    return Ok(());
                }
                Err(Failure::exit("Test plan terminated by 'exit'"))
            }
            "assert" => {
                let expr = Expr::parse(rest)?;
                if self.skip_evaluation || evaluate(session, &expr)?.is_truthy() {
                    return Ok(());
                }
                Err(Failure::assert(format!("Assertion '{rest}' failed")))
            }
            _ => Err(Failure::parse(format!("Syntax error, unexpected '{word}'"))),
        }
    }

    fn include(&mut self, session: &mut Session, file: &str) -> Result<(), Failure> {
        if file.is_empty() {
            return Err(Failure::parse("Expected a test plan file name after '@'"));
        }
        let path = session.resolve_tpf_path(file);
        session.sources.include(&path)?;
        let result = self.run_frame(session);
        session.sources.pop();
        result
    }

    fn assign(&mut self, session: &mut Session, name: &str, value: &str) -> Result<(), Failure> {
        let expr = Expr::parse(value)?;
        if self.skip_evaluation {
            return Ok(());
        }
        if session.symbols.get(name).is_some_and(Entry::is_symbol) {
            return Err(Failure::evaluation(format!(
                "Cannot assign to symbol '{name}'"
            )));
        }
        let value = evaluate(session, &expr)?;
        let source = loaded_from(session);
        session
            .symbols
            .insert(Entry::new(name, EntryData::Variable(value), source));
        Ok(())
    }

    fn declare_symbol(&mut self, session: &mut Session, rest: &str) -> Result<(), Failure> {
        let (name, pairs) = split_word(rest);
        if !IDENTIFIER.is_match(name) {
            return Err(Failure::parse(format!("Invalid symbol name '{name}'")));
        }
        let mut assignments = Vec::new();
        for pair in pairs.split_whitespace() {
            let Some((attribute, value)) = pair.split_once('=') else {
                return Err(Failure::parse(format!(
                    "Expected attribute=value, found '{pair}'"
                )));
            };
            let attribute: Attribute = attribute.to_lowercase().parse().map_err(|_| {
                Failure::parse(format!("Unknown symbol attribute '{attribute}'"))
            })?;
            assignments.push((attribute, value));
        }
        if self.skip_evaluation {
            return Ok(());
        }
        let mut attributes = SymbolAttributes::default();
        for (attribute, value) in assignments {
            attributes.set(attribute, value)?;
        }
        let source = loaded_from(session);
        session.symbols.insert(Entry::new(
            name.to_lowercase(),
            EntryData::Symbol(attributes),
            source,
        ));
        Ok(())
    }
}

/// File the active statement came from; `None` for typed commands.
fn loaded_from(session: &Session) -> Option<String> {
    session
        .sources
        .top()
        .map(|frame| frame.info().name())
        .filter(|name| *name != PSEUDO_STREAM_NAME)
        .map(str::to_string)
}

fn evaluate(session: &Session, expr: &Expr) -> Result<Value, Failure> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Name(name) => match session.symbols.get(name).map(|entry| &entry.data) {
            Some(EntryData::Variable(value)) => Ok(value.clone()),
            Some(EntryData::Macro(body)) => Ok(Value::Text(body.clone())),
            Some(EntryData::Symbol(_)) => Err(Failure::evaluation(format!(
                "Symbol '{name}' cannot be read without hardware access"
            ))),
            None => Err(Failure::evaluation(format!("Name '{name}' is not defined"))),
        },
    }
}

impl FrontEnd for ScriptFrontEnd {
    fn parse(&mut self, session: &mut Session, stream: Box<dyn CharStream>) -> Result<(), Failure> {
        let outermost = session.sources.is_empty();
        if outermost {
            self.statements = 0;
        }
        let info = SourceInfo::new(stream.name().to_string(), 1, stream.line_count().max(1));
        let started = Instant::now();
        session.sources.push(stream, info);
        let result = self.run_frame(session);
        session.sources.pop();

        if outermost && self.profile_level > 0 {
            let elapsed = started.elapsed();
            let mut report = format!(
                "Profile: {} statement(s) in {:.3} ms",
                self.statements,
                elapsed.as_secs_f64() * 1000.0
            );
            if self.profile_level > 1 && self.statements > 0 {
                let per_statement = elapsed.as_secs_f64() * 1e6 / self.statements as f64;
                report.push_str(&format!(", {per_statement:.1} us/statement"));
            }
            session
                .output
                .push(Message::forced(report, MessageKind::Profile));
        }
        result
    }

    fn keywords(&self) -> Vec<String> {
        KEYWORDS.iter().map(|word| word.to_string()).collect()
    }

    fn profile_level(&self) -> u8 {
        self.profile_level
    }

    fn set_profile_level(&mut self, level: u8) {
        self.profile_level = level;
    }

    fn skip_evaluation(&self) -> bool {
        self.skip_evaluation
    }

    fn set_skip_evaluation(&mut self, skip: bool) {
        self.skip_evaluation = skip;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::input::PseudoStream;
    use crate::paths::RuntimePaths;
    use std::fs;
    use std::path::Path;

    fn session(dir: &Path) -> Session {
        Session::new(RuntimePaths::rooted(dir, dir))
    }

    fn run(front: &mut ScriptFrontEnd, session: &mut Session, text: &str) -> Result<(), Failure> {
        front.parse(session, Box::new(PseudoStream::new(text)))
    }

    fn printed(session: &mut Session) -> Vec<String> {
        session.output.drain().into_iter().map(|m| m.text).collect()
    }

    #[test]
    fn assignment_and_print() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path());
        let mut front = ScriptFrontEnd::new();
        run(&mut front, &mut session, "Count := 3").unwrap();
        run(&mut front, &mut session, "print count").unwrap();
        run(&mut front, &mut session, "print \"a ! b\" ! trailing comment").unwrap();
        assert_eq!(printed(&mut session), vec!["3", "a ! b"]);
        assert!(session.sources.is_empty());
        assert_eq!(session.symbols.get("count").unwrap().source, None);
    }

    #[test]
    fn unknown_statement_is_parse_error_with_position() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path());
        let mut front = ScriptFrontEnd::new();
        let failure = run(&mut front, &mut session, "frobnicate 1").unwrap_err();
        assert_eq!(failure.kind(), FailureKind::Parse);
        assert_eq!(failure.location().unwrap().to_string(), "file '«stdin»', line 1");
        assert_eq!(failure.listing(), Some("frobnicate 1\n"));
    }

    #[test]
    fn included_file_reports_inner_line_and_block_comment_listing() {
        let dir = tempfile::tempdir().unwrap();
        let plan = dir.path().join("plan.tpf");
        fs::write(&plan, "x := 1\n!# note\n   more #!\nprint y\nprint x\n").unwrap();
        let mut session = session(dir.path());
        let mut front = ScriptFrontEnd::new();

        let failure = run(&mut front, &mut session, &format!("@{}", plan.display())).unwrap_err();
        assert_eq!(failure.kind(), FailureKind::Evaluation);
        let location = failure.location().unwrap();
        assert_eq!(location.name(), plan.display().to_string());
        assert_eq!(location.lineno(), 4);
        assert_eq!(failure.listing(), Some("!# note\n   more #!\nprint y\n"));
        assert!(session.sources.is_empty());
        assert_eq!(session.symbols.get("x").unwrap().source.as_deref(), Some(plan.to_str().unwrap()));
    }

    #[test]
    fn unterminated_block_comment_is_scan_error() {
        let dir = tempfile::tempdir().unwrap();
        let plan = dir.path().join("open.tpf");
        fs::write(&plan, "!# never closed\nprint 1\n").unwrap();
        let mut session = session(dir.path());
        let failure = run(&mut ScriptFrontEnd::new(), &mut session, &format!("@{}", plan.display()))
            .unwrap_err();
        assert_eq!(failure.kind(), FailureKind::Scan);
    }

    #[test]
    fn self_inclusion_is_cyclic() {
        let dir = tempfile::tempdir().unwrap();
        let plan = dir.path().join("loop.tpf");
        fs::write(&plan, format!("@{}\n", plan.display())).unwrap();
        let mut session = session(dir.path());
        let failure = run(&mut ScriptFrontEnd::new(), &mut session, &format!("@{}", plan.display()))
            .unwrap_err();
        assert_eq!(failure.kind(), FailureKind::CyclicInclusion);
        assert!(session.sources.is_empty());
    }

    #[test]
    fn missing_include_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path());
        let failure = run(&mut ScriptFrontEnd::new(), &mut session, "@/nonexistent/plan.tpf").unwrap_err();
        assert_eq!(failure.kind(), FailureKind::Io);
    }

    #[test]
    fn exit_and_assert_failures() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path());
        let mut front = ScriptFrontEnd::new();
        assert_eq!(run(&mut front, &mut session, "exit").unwrap_err().kind(), FailureKind::Exit);
        assert_eq!(run(&mut front, &mut session, "assert 0").unwrap_err().kind(), FailureKind::Assert);
        run(&mut front, &mut session, "assert 1").unwrap();
    }

    #[test]
    fn skip_evaluation_still_checks_syntax() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path());
        let mut front = ScriptFrontEnd::new();
        front.set_skip_evaluation(true);
        run(&mut front, &mut session, "print undefined_name").unwrap();
        run(&mut front, &mut session, "exit").unwrap();
        assert!(session.output.is_empty());
        assert_eq!(run(&mut front, &mut session, "print \"open").unwrap_err().kind(), FailureKind::Scan);
    }

    #[test]
    fn symbols_declared_with_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path());
        let mut front = ScriptFrontEnd::new();
        run(&mut front, &mut session, "symb ALT addr=0x40 dtype=u16").unwrap();
        assert!(session.symbols.get("alt").unwrap().is_symbol());
        let failure = run(&mut front, &mut session, "alt := 2").unwrap_err();
        assert_eq!(failure.kind(), FailureKind::Evaluation);
        let failure = run(&mut front, &mut session, "symb bad colour=red").unwrap_err();
        assert_eq!(failure.kind(), FailureKind::Parse);
    }

    #[test]
    fn profile_report_is_forced() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path());
        session.display_state = false;
        let mut front = ScriptFrontEnd::new();
        front.set_profile_level(1);
        run(&mut front, &mut session, "x := 1").unwrap();
        let messages = session.output.drain();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].can_display(false));
        assert!(messages[0].text.starts_with("Profile: 1 statement(s)"));
    }
}
