//! The command engine: prompt loop, built-in dispatch, execution modes,
//! startup sequence and error recovery.

pub mod builtin;
pub mod mode;
pub mod registry;
pub mod session;

pub use mode::{ExecutionMode, ModeError, ModeState};
pub use registry::{CommandHandler, CommandInvocation, Flow, Registry};
pub use session::Session;

use crate::cache::{CacheLoad, CacheStore};
use crate::completer::{path_file_names, Vocabulary};
use crate::config::ConfigStore;
use crate::console::{Colour, Console, Style};
use crate::error::{Failure, FailureKind};
use crate::frontend::FrontEnd;
use crate::hardware::{HardwareTransport, Region, RegionMap};
use crate::input::PseudoStream;
use crate::line_source::{LineSource, ReadOutcome};
use crate::paths::RuntimePaths;
use crate::progress::ProgressIndicator;
use crate::settings::Settings;
use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

pub const TITLE: &str = "Advanced Integrated Test Environment System Software";

const INIT_ERROR_TITLE: &str = "Environment Initialization Error";

/// Configuration entries executed at startup, in order.
const CONFIG_ENTRIES: [(&str, &str, &str, &str); 6] = [
    (
        "sysdbfpath",
        "sysdbf",
        "Loading system database file...",
        "Configuration File Error: System Database File",
    ),
    (
        "usrdbfpath",
        "usrdbf",
        "Loading user database file...",
        "Configuration File Error: User Database File",
    ),
    (
        "sysmacpath",
        "sysmacfile",
        "Loading system macro file...",
        "Configuration File Error: System Macro File",
    ),
    (
        "usrmacpath",
        "usrmacfile",
        "Loading user macro file...",
        "Configuration File Error: User Macro File",
    ),
    (
        "syslibpath",
        "syslibfile",
        "Loading system library file...",
        "Configuration File Error: System Library File",
    ),
    (
        "usrlibpath",
        "usrlibfile",
        "Loading user library file...",
        "Configuration File Error: User Library File",
    ),
];

/// Result of processing one command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    /// A recoverable failure was reported.
    Failed(FailureKind),
    Exit,
}

/// Collaborators handed to [`CommandEngine::new`].
pub struct EngineParts {
    pub front_end: Box<dyn FrontEnd>,
    pub transport: Box<dyn HardwareTransport>,
    pub input: Box<dyn LineSource>,
    pub console: Console,
    pub progress: ProgressIndicator,
    pub paths: RuntimePaths,
    pub settings: Settings,
    pub vocabulary: Vocabulary,
    pub batch: bool,
}

pub struct CommandEngine {
    session: Session,
    front_end: Box<dyn FrontEnd>,
    transport: Box<dyn HardwareTransport>,
    input: Box<dyn LineSource>,
    console: Console,
    progress: ProgressIndicator,
    vocabulary: Vocabulary,
    registry: Arc<Registry>,
    settings: Settings,
    cache: CacheStore,
    region_status: RegionMap<bool>,
}

impl std::fmt::Debug for CommandEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandEngine")
            .field("mode", &self.session.modes.mode())
            .field("sources", &self.session.sources.depth())
            .field("symbols", &self.session.symbols.len())
            .finish()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unexpected failure".to_string()
    }
}

impl CommandEngine {
    pub fn new(parts: EngineParts) -> Self {
        let registry = Arc::new(Registry::new());
        builtin::register(&registry);

        let mut session = Session::new(parts.paths.clone());
        session.modes = ModeState::new(parts.batch);
        session.high_priority = parts.settings.high_priority;
        let cache = CacheStore::new(parts.paths.cache_file.clone(), crate::RUNTIME_VERSION);

        Self {
            session,
            front_end: parts.front_end,
            transport: parts.transport,
            input: parts.input,
            console: parts.console,
            progress: parts.progress,
            vocabulary: parts.vocabulary,
            registry,
            settings: parts.settings,
            cache,
            region_status: RegionMap::uniform(false),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn front_end(&self) -> &dyn FrontEnd {
        self.front_end.as_ref()
    }

    pub fn front_end_mut(&mut self) -> &mut dyn FrontEnd {
        self.front_end.as_mut()
    }

    pub fn transport_mut(&mut self) -> &mut dyn HardwareTransport {
        self.transport.as_mut()
    }

    pub fn console(&mut self) -> &mut Console {
        &mut self.console
    }

    pub fn progress_mut(&mut self) -> &mut ProgressIndicator {
        &mut self.progress
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Regions that attached when the transport was opened.
    pub fn region_status(&self) -> RegionMap<bool> {
        self.region_status
    }

    // ---- startup -------------------------------------------------------

    /// Load the configuration, open the transport, restore or rebuild the
    /// symbol table and run the startup scripts.
    ///
    /// Fails only when the configuration file is unusable.
    pub fn startup(&mut self) -> Result<(), Failure> {
        self.progress.start(TITLE, "Loading AITESS...");
        let config_name = self.session.paths.config_file_name();

        self.step(&format!(
            "Reading configuration file '{config_name}' into memory..."
        ));
        let config_path = self.session.paths.config_file.clone();
        match ConfigStore::load(&config_path) {
            Ok(config) => self.session.config = Some(config),
            Err(err) => {
                self.progress.stop();
                let failure = Failure::from(err);
                self.show_init_error(
                    INIT_ERROR_TITLE,
                    &format!(
                        "{}, AITESS cannot continue without fixing the error",
                        failure.message()
                    ),
                );
                return Err(failure);
            }
        }
        self.transport.reset_tables();

        self.step("Opening shared memory...");
        self.region_status = self.transport.open();
        self.step("Initializing parser...");

        let mut cached = false;
        let use_cache = self
            .session
            .config
            .as_ref()
            .is_some_and(ConfigStore::use_cache);
        if use_cache && self.cache.exists() {
            self.step(&format!(
                "Loading information cached from '{config_name}'..."
            ));
            match self.cache.load() {
                Ok(CacheLoad::Fresh(table)) => {
                    tracing::info!(entries = table.len(), "using cached configuration");
                    self.session.symbols = table;
                    cached = true;
                }
                Ok(CacheLoad::Stale { found }) => {
                    tracing::info!(%found, "cache written by another version");
                    self.rebuild_symbols("AITESS version change re-caching the information...");
                }
                Err(err) => {
                    tracing::warn!(%err, "discarding unreadable cache");
                    self.rebuild_symbols("AITESS version change re-caching the information...");
                }
            }
        } else if use_cache {
            self.step(&format!(
                "Executing contents of configuration file '{config_name}' and caching the information..."
            ));
            self.execute_config();
            self.save_cache();
        } else {
            self.step(&format!(
                "Executing contents of configuration file '{config_name}'..."
            ));
            self.execute_config();
            // kept current so that enabling the cache later is cheap
            self.save_cache();
        }
        self.progress.stop();

        self.show_region_status();
        self.load_startup_files();
        if cached {
            self.console.pink("Message: Using cached 'config.dat'");
        }
        self.configure_uut();
        self.check_configuration();
        Ok(())
    }

    fn rebuild_symbols(&mut self, message: &str) {
        self.session.symbols.clear();
        self.session
            .symbols
            .update_cache_version(crate::RUNTIME_VERSION);
        self.step(message);
        self.execute_config();
        self.save_cache();
    }

    fn step(&mut self, message: &str) {
        tracing::debug!(step = message, "startup");
        self.progress.update(message);
    }

    fn show_init_error(&mut self, title: &str, message: &str) {
        let text = format!("Error: {title} : {message}");
        self.console.red(&text);
    }

    fn show_region_status(&mut self) {
        for region in Region::ALL {
            if !self.region_status.get(region) {
                self.console.red(&format!(
                    "SharedMemory: Memory allocation failed for {region}"
                ));
            }
        }
    }

    pub fn save_cache(&mut self) {
        if let Err(err) = self.cache.save(&mut self.session.symbols) {
            tracing::warn!(%err, "unable to cache configuration");
            self.console
                .pink(&format!("Message: Configuration not cached, {err}"));
        }
    }

    /// Execute the database, macro and library files named in the
    /// configuration with the display suppressed.
    pub fn execute_config(&mut self) {
        let display_state = self.session.display_state;
        self.session.display_state = false;
        for (path_option, file_option, message, title) in CONFIG_ENTRIES {
            self.step(message);
            let directory = self.session.config_value(path_option);
            let file = self.session.config_value(file_option);
            if !directory.is_empty() && !file.is_empty() {
                self.setup_environment(&format!("{directory}{file}"), title);
            }
        }
        self.session.display_state = display_state;
    }

    /// Run `file`, reporting any failure under `title` without stopping.
    pub fn setup_environment(&mut self, file: &str, title: &str) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.execute_file(file)))
            .unwrap_or_else(|payload| Err(Failure::internal(panic_message(payload))));
        match result {
            Ok(()) => self.print_output_queue(),
            Err(failure) => {
                self.progress.stop();
                self.print_output_queue();
                let message = match failure.kind() {
                    FailureKind::Exit => "Exit Warning: Startup script exited".to_string(),
                    FailureKind::UserExit => "User Exit Warning: Startup script exited".to_string(),
                    FailureKind::Assert => {
                        "Assert Error: Assertion failure in startup script".to_string()
                    }
                    FailureKind::Input
                    | FailureKind::Scan
                    | FailureKind::Parse
                    | FailureKind::Evaluation
                    | FailureKind::CyclicInclusion
                    | FailureKind::Io
                    | FailureKind::Config
                    | FailureKind::Internal => failure.render(),
                };
                tracing::info!(file, kind = %failure.kind(), "startup file failed");
                self.show_init_error(title, &message);
                self.session.sources.clear();
            }
        }
    }

    pub fn load_startup_files(&mut self) {
        for path in [
            self.session.paths.system_startup.clone(),
            self.session.paths.user_startup.clone(),
        ] {
            if path.exists() {
                self.setup_environment(&path.display().to_string(), INIT_ERROR_TITLE);
            }
        }
    }

    pub fn configure_uut(&mut self) {
        let Some(config) = &self.session.config else {
            return;
        };
        let uut = config.unit_under_test();
        let recognized = config.is_uut_recognized();
        self.transport.set_unit_under_test(uut.code());
        if recognized {
            self.console
                .pink(&format!("Message: AITESS configured for {}", uut.label()));
        } else {
            self.console.pink(
                "Message: UUT not/incorrectly specified, AITESS configured for LADC/DFCC Mk1",
            );
        }
    }

    pub fn check_configuration(&mut self) {
        let notices = self
            .session
            .config
            .as_ref()
            .map(ConfigStore::check_configuration)
            .unwrap_or_default();
        for notice in notices {
            self.console.pink(&notice);
        }
    }

    // ---- front end -----------------------------------------------------

    /// Hand one typed command to the front end.
    pub fn execute_command(&mut self, command: &str) -> Result<(), Failure> {
        self.front_end
            .parse(&mut self.session, Box::new(PseudoStream::new(command)))
    }

    /// Run a test plan file through the front end's inclusion statement.
    pub fn execute_file(&mut self, file: &str) -> Result<(), Failure> {
        self.execute_command(&format!("@{file}"))
    }

    /// Print queued results the display state allows.
    pub fn print_output_queue(&mut self) {
        let display_state = self.session.display_state;
        for message in self.session.output.drain() {
            if message.can_display(display_state) {
                self.console.println(&message.text);
                self.session.man.write(&message.text);
            }
        }
    }

    fn recover(&mut self, failure: &Failure) {
        tracing::debug!(kind = %failure.kind(), "recovering from failure");
        self.print_output_queue();
        let response = failure.render();
        self.console.red(&response);
        self.session.man.write(&response);
        self.session.sources.clear();
    }

    /// Print an `Error:` response that does not abort anything.
    pub fn report_error(&mut self, message: &str) {
        let response = format!("Error: {message}");
        self.console.red(&response);
        self.session.man.write(&response);
    }

    // ---- prompt loop ---------------------------------------------------

    /// Run the session until `exit` or end of input.
    pub fn run(&mut self) -> anyhow::Result<()> {
        self.check_log_file_size();
        if let Err(err) = self.session.audit.open() {
            tracing::warn!(%err, path = %self.session.audit.path().display(), "audit log unavailable");
        }
        let result = self.process_commands();
        self.session.audit.close();
        self.session.man.close();
        self.input.finish()?;
        result
    }

    fn check_log_file_size(&mut self) {
        if !self.input.is_interactive() || !self.session.audit.is_oversized() {
            return;
        }
        let name = self
            .session
            .audit
            .path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let question = format!("Log file '{name}' size is greater than 1MB, clear it (Y/N)? ");
        if self.confirm(&question) {
            if let Err(err) = self.session.audit.remove() {
                self.report_error(&format!("Log file '{name}' cannot be cleared, {err}."));
            }
        }
    }

    pub fn prompt(&self) -> String {
        let status = match (self.session.display_state, self.session.modes.is_man()) {
            (false, true) => "(DISP=OFF, MODE=MAN)",
            (false, false) => "(DISP=OFF)",
            (true, true) => "(MODE=MAN)",
            (true, false) => "",
        };
        let status = if status.is_empty() {
            String::new()
        } else {
            self.console.paint(status, Colour::Red, Style::PLAIN)
        };
        format!("{status}{}", self.settings.prompt)
    }

    /// Rebuild the completion words from keywords, commands, test plan
    /// directories and symbol names.
    pub fn refresh_vocabulary(&mut self) {
        self.vocabulary.clear();
        self.vocabulary.extend(self.front_end.keywords());
        self.vocabulary.extend(self.registry.all_commands());
        let tpf = self.session.config_value("tpfpath");
        let download = self.session.config_value("downloadpath");
        self.vocabulary
            .extend(path_file_names([tpf.as_str(), download.as_str()]));
        self.vocabulary
            .extend(self.session.symbols.names().map(str::to_string));
    }

    fn process_commands(&mut self) -> anyhow::Result<()> {
        loop {
            self.session.rdf_filename.clear();
            self.refresh_vocabulary();
            self.session.modes.reset_auto();

            let prompt = self.prompt();
            let text = match self.input.read_line(&prompt)? {
                ReadOutcome::Line(text) => text,
                ReadOutcome::Interrupted => {
                    self.console.println("");
                    continue;
                }
                ReadOutcome::Eof => {
                    self.session.man.write("exit (^D)");
                    self.session.man.close();
                    self.session.modes.leave_man();
                    if self.session.logging_state {
                        self.session.audit.write("exit (^D)");
                    }
                    self.console.println("");
                    return Ok(());
                }
            };
            if !self.input.is_interactive() {
                self.console.print(&format!("\n{}{text}\n", self.settings.prompt));
            }
            if self.execute_line(&text, false) == StepOutcome::Exit {
                return Ok(());
            }
        }
    }

    /// Process one logical command line.
    ///
    /// `replay` marks lines fed from an `auto` file.
    pub fn execute_line(&mut self, raw: &str, replay: bool) -> StepOutcome {
        let raw = raw.trim_end_matches(['\n', '\r']);
        self.session.record_command(raw);
        let text = raw.trim();
        if text.is_empty() {
            return StepOutcome::Completed;
        }

        let lowered = text.to_lowercase();
        let parts = shell_words::split(&lowered).unwrap_or_else(|_| vec![lowered.clone()]);
        let handler = parts.first().and_then(|name| self.registry.resolve(name));

        let result = match handler {
            Some(handler) => {
                let original = shell_words::split(text).unwrap_or_else(|_| vec![text.to_string()]);
                let invocation = CommandInvocation {
                    name: parts[0].clone(),
                    args: parts[1..].to_vec(),
                    original_args: original.get(1..).map(<[String]>::to_vec).unwrap_or_default(),
                    text: text.to_string(),
                };
                tracing::debug!(
                    command = handler.name(),
                    summary = handler.summary(),
                    replay,
                    "built-in command"
                );
                panic::catch_unwind(AssertUnwindSafe(|| handler.handle(self, &invocation)))
            }
            None => panic::catch_unwind(AssertUnwindSafe(|| {
                self.execute_command(text)?;
                self.print_output_queue();
                Ok(Flow::Continue)
            })),
        };

        let outcome = match result {
            Ok(Ok(Flow::Exit)) => return StepOutcome::Exit,
            Ok(Ok(Flow::Quiet)) => return StepOutcome::Completed,
            Ok(Ok(Flow::Continue)) => StepOutcome::Completed,
            Ok(Err(failure)) => {
                self.recover(&failure);
                StepOutcome::Failed(failure.kind())
            }
            Err(payload) => {
                let failure = Failure::internal(panic_message(payload));
                tracing::warn!(reason = failure.message(), "command panicked");
                self.recover(&failure);
                StepOutcome::Failed(FailureKind::Internal)
            }
        };

        // line comments print nothing, so they get no separator either
        if !text.starts_with('!') || text.starts_with("!#") {
            self.console.println("");
        }
        outcome
    }

    /// Replay every line of a test plan file as if typed.
    pub fn call_batch_file(&mut self, filename: &str) {
        let path = self.session.resolve_tpf_path(filename);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) => {
                self.report_error(&format!(
                    "Batch file '{}' I/O error, {}.",
                    path.display(),
                    err.to_string().to_lowercase()
                ));
                return;
            }
        };
        for line in text.lines() {
            self.console.println(&format!("{}{line}", self.settings.prompt));
            if self.execute_line(line, true) == StepOutcome::Exit {
                break;
            }
        }
    }

    // ---- confirmations and administrative actions ---------------------

    /// Ask a Y/N question until answered; end of input counts as "no".
    pub fn confirm(&mut self, question: &str) -> bool {
        loop {
            match self.input.ask(question) {
                Ok(ReadOutcome::Line(answer)) => match answer.trim().to_lowercase().as_str() {
                    "y" => return true,
                    "n" => return false,
                    _ => continue,
                },
                Ok(ReadOutcome::Interrupted) | Ok(ReadOutcome::Eof) => return false,
                Err(err) => {
                    tracing::warn!(%err, "confirmation read failed");
                    return false;
                }
            }
        }
    }

    /// Read a free-form answer; `None` when input ended.
    pub fn ask(&mut self, question: &str) -> Option<String> {
        match self.input.ask(question) {
            Ok(ReadOutcome::Line(answer)) => Some(answer),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(%err, "answer read failed");
                None
            }
        }
    }

    fn warning(&self, text: &str) -> String {
        format!(
            "{}\n{}",
            self.console.paint("Warning!!!", Colour::Red, Style::HEADING),
            self.console.paint(
                &format!("{text}\nDo you wish to continue (Y/N)? "),
                Colour::Red,
                Style {
                    bold: true,
                    underline: false
                }
            )
        )
    }

    pub fn purge_file(&mut self, filename: &str) {
        let question = self.warning(&format!(
            "This will clear all entries including session variables, functions, macros, symbols \
             etc. which were loaded from the file '{filename}' (if present)."
        ));
        if !self.confirm(&question) {
            return;
        }
        self.console
            .print(&format!("Trying to purge names loaded from file '{filename}'..."));
        match self.session.symbols.purge_file(filename) {
            Ok(removed) => {
                tracing::info!(file = filename, removed, "purged file");
                self.console.print("done.");
            }
            Err(err) => self.console.print(&format!("\n{err}\n")),
        }
        self.vocabulary.clear();
    }

    /// Numbered menu of files that contributed entries.
    pub fn purge_menu(&mut self) {
        loop {
            let sources = self.session.symbols.external_sources();
            self.console.println("");
            self.console
                .print_coloured("Purge File", Colour::Red, Style::HEADING);
            for (index, source) in sources.iter().enumerate() {
                self.console.println(&format!("{:3} : {source}", index + 1));
            }
            let Some(answer) = self.ask("Enter file number to purge or 0 to exit: ") else {
                return;
            };
            let Ok(choice) = answer.trim().parse::<usize>() else {
                self.console.println("Error: Expected a number.");
                continue;
            };
            if choice == 0 {
                return;
            }
            match sources.get(choice - 1) {
                Some(source) => self.purge_file(source),
                None => self.console.println("Error: Invalid choice."),
            }
        }
    }

    pub fn purge_config(&mut self) {
        let question = self.warning(
            "This will clear all symbol table entries. All entries including session variables, \
             functions, macros, symbols etc. will be lost.",
        );
        if !self.confirm(&question) {
            return;
        }
        self.console.print("Purging internal symbol table...");
        self.session.symbols.clear();
        self.vocabulary.clear();
    }

    pub fn reload_config(&mut self) {
        let question = self.warning(
            "This will clear all symbol table entries and reload them from the configuration file. \
             All entries including session variables, functions, macros, symbols etc. will be lost.",
        );
        if !self.confirm(&question) {
            return;
        }
        self.console
            .println("Purging and reloading internal symbol table...");
        self.progress.start(TITLE, "Reloading configuration...");
        if let Err(err) = self.cache.remove() {
            tracing::warn!(%err, "stale cache not removed");
        }
        self.session.symbols.clear();
        self.vocabulary.clear();

        let config_name = self.session.paths.config_file_name();
        self.step(&format!(
            "Reading configuration file '{config_name}' into memory..."
        ));
        let config_path = self.session.paths.config_file.clone();
        match ConfigStore::load(&config_path) {
            Ok(config) => self.session.config = Some(config),
            Err(err) => {
                self.progress.stop();
                let failure = Failure::from(err);
                self.show_init_error("Configuration Reload Error", failure.message());
                return;
            }
        }
        self.transport.reset_tables();

        let caching = if self
            .session
            .config
            .as_ref()
            .is_some_and(ConfigStore::use_cache)
        {
            " and caching the information"
        } else {
            ""
        };
        self.step(&format!(
            "Executing contents of configuration file '{config_name}'{caching}..."
        ));
        self.execute_config();
        self.save_cache();
        self.progress.stop();

        self.load_startup_files();
        self.configure_uut();
        self.check_configuration();
    }

    pub fn edit_symbol(&mut self, name: &str, attribute: &str) {
        use crate::symbol::{Attribute, SymbolError};

        let attributes = match self.session.symbols.symbol_attributes_mut(name) {
            Ok(attributes) => attributes.clone(),
            Err(err) => {
                self.report_error(&err.to_string());
                return;
            }
        };
        let Ok(parsed) = attribute.parse::<Attribute>() else {
            self.report_error(&SymbolError::InvalidAttribute.to_string());
            return;
        };
        let nil = self.console.paint("«nil»", Colour::Red, Style::PLAIN);
        let current = attributes.current(parsed).unwrap_or(nil);
        let answer = self
            .ask(&format!("{name} => {attribute}[={current}]=? "))
            .unwrap_or_default();
        match self.session.symbols.edit_attribute(name, attribute, &answer) {
            Ok(()) => self.console.println("Updated the attribute value."),
            Err(err) => self.report_error(&err.to_string()),
        }
    }

    /// Shut the transport down; called once on process exit.
    pub fn shutdown(&mut self) {
        self.progress.stop();
        self.session.sources.clear();
        self.transport.close();
    }

    pub fn config_path(&self) -> &Path {
        &self.session.paths.config_file
    }
}
