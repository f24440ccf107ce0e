// Shared fixtures: a temporary AITESS working directory and an engine wired
// to scripted input and captured output.
#![allow(dead_code)]

use aitess::completer::Vocabulary;
use aitess::console::{Console, SharedBuffer};
use aitess::frontend::ScriptFrontEnd;
use aitess::hardware::SimulatedTransport;
use aitess::line_source::ScriptedSource;
use aitess::paths::RuntimePaths;
use aitess::progress::ProgressIndicator;
use aitess::settings::Settings;
use aitess::{CommandEngine, EngineParts};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Working directory holding `config.dat`; `{dir}` in `config` expands to
/// the directory path.
pub fn workspace(config: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), config);
    dir
}

pub fn write_config(dir: &Path, config: &str) {
    let text = config.replace("{dir}", &dir.display().to_string());
    fs::write(dir.join("config.dat"), text).unwrap();
}

pub fn write_file(dir: &Path, name: &str, text: &str) {
    fs::write(dir.join(name), text).unwrap();
}

pub fn engine(dir: &Path, lines: &[&str]) -> (CommandEngine, SharedBuffer) {
    engine_with(dir, ScriptedSource::new(lines.iter().copied()))
}

pub fn engine_with(dir: &Path, input: ScriptedSource) -> (CommandEngine, SharedBuffer) {
    let (console, buffer) = Console::capture();
    let engine = CommandEngine::new(EngineParts {
        front_end: Box::new(ScriptFrontEnd::new()),
        transport: Box::new(SimulatedTransport::new()),
        input: Box::new(input),
        console,
        progress: ProgressIndicator::new(false),
        paths: RuntimePaths::rooted(dir, dir),
        settings: Settings::default(),
        vocabulary: Vocabulary::new(),
        batch: true,
    });
    (engine, buffer)
}

/// Engine that has completed its startup sequence.
pub fn started(dir: &Path, lines: &[&str]) -> (CommandEngine, SharedBuffer) {
    let (mut engine, buffer) = engine(dir, lines);
    engine.startup().unwrap();
    (engine, buffer)
}
