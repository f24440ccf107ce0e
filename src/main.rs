//=====================================================
// File: main.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: AITESS command runtime entry point
// Objective: Parse command-line options, wire the line source, front end
//            and hardware transport into the command engine, and run it
//=====================================================

use aitess::completer::Vocabulary;
use aitess::console::{Colour, Console, Style};
use aitess::engine::TITLE;
use aitess::frontend::ScriptFrontEnd;
use aitess::hardware::SimulatedTransport;
use aitess::history::HistoryManager;
use aitess::line_source::{EditorSource, LineSource, StdinSource};
use aitess::paths::RuntimePaths;
use aitess::progress::ProgressIndicator;
use aitess::settings::Settings;
use aitess::{logging, CommandEngine, EngineParts};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "aitess", version, about = TITLE)]
pub struct Args {
    /// Read commands from standard input without line editing.
    #[arg(short = 'i', long = "batch")]
    pub batch: bool,

    /// Configuration file to use instead of ./config.dat.
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Disable the startup progress indicator.
    #[arg(long = "no-animation")]
    pub no_animation: bool,
}

fn banner(console: &mut Console) {
    let heading = console.paint(TITLE, Colour::Yellow, Style::HEADING);
    console.println(&heading);
    console.println(&format!(
        "AITESS version {} (Aeronautical Development Establishment)",
        aitess::RUNTIME_VERSION
    ));
    console.println("Type 'exit' or press Ctrl-D to leave.");
    console.println("");
}

fn build_engine(args: &Args) -> Result<CommandEngine> {
    let settings = match Settings::load() {
        Ok((settings, path)) => {
            tracing::debug!(path = %path.display(), "settings loaded");
            settings
        }
        Err(err) => {
            tracing::warn!(%err, "using default settings");
            Settings::default()
        }
    };

    let mut paths = RuntimePaths::discover();
    if let Some(config) = &args.config {
        paths = paths.with_config_file(config);
    }

    let vocabulary = Vocabulary::new();
    let input: Box<dyn LineSource> = if args.batch {
        Box::new(StdinSource::new())
    } else {
        let history = HistoryManager::load(&paths.history_file, settings.history_limit)
            .context("failed to load command history")?;
        Box::new(
            EditorSource::new(vocabulary.clone(), history)
                .context("failed to initialise the line editor")?,
        )
    };

    let mut console = Console::stdout();
    banner(&mut console);

    let animate = settings.progress_animation && !args.no_animation;
    Ok(CommandEngine::new(EngineParts {
        front_end: Box::new(ScriptFrontEnd::new()),
        transport: Box::new(SimulatedTransport::new()),
        input,
        console,
        progress: ProgressIndicator::new(animate),
        paths,
        settings,
        vocabulary,
        batch: args.batch,
    }))
}

fn main() {
    let args = Args::parse();
    logging::init("aitess");

    let mut engine = match build_engine(&args) {
        Ok(engine) => engine,
        Err(error) => {
            eprintln!("aitess error: {error:?}");
            std::process::exit(1);
        }
    };
    if let Err(failure) = engine.startup() {
        tracing::warn!(kind = %failure.kind(), "startup aborted");
        engine.shutdown();
        std::process::exit(-1);
    }
    let result = engine.run();
    engine.shutdown();
    if let Err(error) = result {
        eprintln!("aitess error: {error:?}");
        std::process::exit(1);
    }
}
