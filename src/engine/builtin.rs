//! Administrative commands handled by the engine itself.

use super::registry::{CommandHandler, CommandInvocation, Flow, Registry};
use super::CommandEngine;
use crate::console::{Colour, Style};
use crate::error::Failure;
use crate::hardware::Region;
use crate::paths::MAN_REPORT_FILE;
use std::sync::Arc;

const EDIT_CONFIGURATION_NOTICE: &str = "Editing the configuration from the application is no longer supported.\n\
The correct procedure is to exit AITESS go to the directory containing the\n\
configuration file and edit the 'config.dat' file using any text editor of\n\
your choice, save the file and restart AITESS and type 'reload_configuration'\n\
in the AITESS prompt.";

pub fn register(registry: &Arc<Registry>) {
    registry.insert_builtin("exit", Arc::new(ExitCommand));
    registry.insert_builtin("clear", Arc::new(ClearCommand));
    registry.insert_builtin("auto", Arc::new(AutoCommand));
    registry.insert_builtin("man", Arc::new(ManCommand));
    registry.insert_builtin("purge_file", Arc::new(PurgeFileCommand));
    registry.insert_builtin("purge_configuration", Arc::new(PurgeConfigurationCommand));
    registry.insert_builtin("reload_configuration", Arc::new(ReloadConfigurationCommand));
    registry.insert_builtin("edit_configuration", Arc::new(EditConfigurationCommand));
    registry.insert_builtin("list_configuration", Arc::new(ListConfigurationCommand));
    registry.insert_builtin("high_priority", Arc::new(Toggle::HighPriority));
    registry.insert_builtin("progress_animation", Arc::new(Toggle::ProgressAnimation));
    registry.insert_builtin("skip_evaluation", Arc::new(Toggle::SkipEvaluation));
    registry.insert_builtin("shm_info", Arc::new(ShmInfoCommand));
    registry.insert_builtin("shm_clear", Arc::new(ShmClearCommand));
    registry.insert_builtin("edit_symbol", Arc::new(EditSymbolCommand));
    registry.insert_builtin("profile_level", Arc::new(ProfileLevelCommand));
}

/// Usage problems are reported inline and never abort a replay.
fn usage(engine: &mut CommandEngine, message: String) -> Result<Flow, Failure> {
    engine.report_error(&message);
    Ok(Flow::Continue)
}

fn takes_no_parameters(
    engine: &mut CommandEngine,
    invocation: &CommandInvocation,
    wording: &str,
) -> Option<Result<Flow, Failure>> {
    if invocation.args.is_empty() {
        return None;
    }
    Some(usage(
        engine,
        format!("System command '{}' {wording}", invocation.name),
    ))
}

struct ExitCommand;

impl CommandHandler for ExitCommand {
    fn name(&self) -> &str {
        "exit"
    }

    fn summary(&self) -> &str {
        "Leave AITESS"
    }

    fn handle(
        &self,
        engine: &mut CommandEngine,
        invocation: &CommandInvocation,
    ) -> Result<Flow, Failure> {
        if let Some(result) = takes_no_parameters(engine, invocation, "has no parameters.") {
            return result;
        }
        Ok(Flow::Exit)
    }
}

struct ClearCommand;

impl CommandHandler for ClearCommand {
    fn name(&self) -> &str {
        "clear"
    }

    fn summary(&self) -> &str {
        "Clear the screen"
    }

    fn handle(
        &self,
        engine: &mut CommandEngine,
        invocation: &CommandInvocation,
    ) -> Result<Flow, Failure> {
        if let Some(result) = takes_no_parameters(engine, invocation, "has no parameters.") {
            return result;
        }
        engine.console().clear_screen();
        Ok(Flow::Quiet)
    }
}

struct AutoCommand;

impl CommandHandler for AutoCommand {
    fn name(&self) -> &str {
        "auto"
    }

    fn summary(&self) -> &str {
        "Replay a test plan file line by line"
    }

    fn handle(
        &self,
        engine: &mut CommandEngine,
        invocation: &CommandInvocation,
    ) -> Result<Flow, Failure> {
        let [file] = invocation.original_args.as_slice() else {
            return usage(
                engine,
                format!("System command '{}' expects one parameter.", invocation.name),
            );
        };
        if let Err(err) = engine.session_mut().modes.enter_auto() {
            return usage(engine, err.to_string());
        }
        engine.call_batch_file(file);
        engine.session_mut().modes.leave_auto();
        Ok(Flow::Continue)
    }
}

struct ManCommand;

impl CommandHandler for ManCommand {
    fn name(&self) -> &str {
        "man"
    }

    fn summary(&self) -> &str {
        "Toggle recording of the session into a report file"
    }

    fn handle(
        &self,
        engine: &mut CommandEngine,
        invocation: &CommandInvocation,
    ) -> Result<Flow, Failure> {
        if let Some(result) = takes_no_parameters(engine, invocation, "expects no parameters.") {
            return result;
        }
        let session = engine.session_mut();
        if session.modes.is_man() {
            session.man.close();
            session.modes.leave_man();
            tracing::info!("man mode off");
            return Ok(Flow::Continue);
        }
        if let Err(err) = session.modes.enter_man() {
            return usage(engine, err.to_string());
        }

        let session = engine.session_mut();
        let report = session.resolve_rdf_path(MAN_REPORT_FILE);
        match session.man.open(&report) {
            Ok(()) => {
                tracing::info!(report = %report.display(), "man mode on");
                Ok(Flow::Continue)
            }
            Err(err) => {
                session.modes.leave_man();
                usage(
                    engine,
                    format!(
                        "Cannot enter 'man' mode since RDF file '{}' cannot be cleared, {}.",
                        report.display(),
                        err.to_string().to_lowercase()
                    ),
                )
            }
        }
    }
}

struct PurgeFileCommand;

impl CommandHandler for PurgeFileCommand {
    fn name(&self) -> &str {
        "purge_file"
    }

    fn summary(&self) -> &str {
        "Remove the names loaded from one file"
    }

    fn handle(
        &self,
        engine: &mut CommandEngine,
        invocation: &CommandInvocation,
    ) -> Result<Flow, Failure> {
        match invocation.original_args.as_slice() {
            [] => engine.purge_menu(),
            [file] => engine.purge_file(file),
            _ => {
                return usage(
                    engine,
                    format!(
                        "System command '{}' expects zero or one parameter.",
                        invocation.name
                    ),
                )
            }
        }
        Ok(Flow::Continue)
    }
}

struct PurgeConfigurationCommand;

impl CommandHandler for PurgeConfigurationCommand {
    fn name(&self) -> &str {
        "purge_configuration"
    }

    fn summary(&self) -> &str {
        "Clear the whole symbol table"
    }

    fn handle(
        &self,
        engine: &mut CommandEngine,
        invocation: &CommandInvocation,
    ) -> Result<Flow, Failure> {
        if let Some(result) = takes_no_parameters(engine, invocation, "expects no parameters.") {
            return result;
        }
        engine.purge_config();
        Ok(Flow::Continue)
    }
}

struct ReloadConfigurationCommand;

impl CommandHandler for ReloadConfigurationCommand {
    fn name(&self) -> &str {
        "reload_configuration"
    }

    fn summary(&self) -> &str {
        "Rebuild the symbol table from the configuration file"
    }

    fn handle(
        &self,
        engine: &mut CommandEngine,
        invocation: &CommandInvocation,
    ) -> Result<Flow, Failure> {
        if let Some(result) = takes_no_parameters(engine, invocation, "expects no parameters.") {
            return result;
        }
        engine.reload_config();
        Ok(Flow::Continue)
    }
}

struct EditConfigurationCommand;

impl CommandHandler for EditConfigurationCommand {
    fn name(&self) -> &str {
        "edit_configuration"
    }

    fn summary(&self) -> &str {
        "Explain how to change the configuration file"
    }

    fn handle(
        &self,
        engine: &mut CommandEngine,
        _invocation: &CommandInvocation,
    ) -> Result<Flow, Failure> {
        engine.console().println(EDIT_CONFIGURATION_NOTICE);
        Ok(Flow::Continue)
    }
}

struct ListConfigurationCommand;

impl CommandHandler for ListConfigurationCommand {
    fn name(&self) -> &str {
        "list_configuration"
    }

    fn summary(&self) -> &str {
        "Show the values read from the configuration file"
    }

    fn handle(
        &self,
        engine: &mut CommandEngine,
        invocation: &CommandInvocation,
    ) -> Result<Flow, Failure> {
        if let Some(result) = takes_no_parameters(engine, invocation, "expects no parameters.") {
            return result;
        }
        let Some(config) = engine.session().config.clone() else {
            return usage(engine, "No configuration file loaded.".to_string());
        };
        let console = engine.console();
        console.println("Configuration information");
        console.println("—————————————————————————");
        console.println(&format!("  From file '{}'", config.path().display()));
        for (option, value) in config.listing() {
            let value = if value.is_empty() {
                console.paint("«nil»", Colour::Red, Style::PLAIN)
            } else {
                value
            };
            console.println(&format!("     {option:<13} = {value}"));
        }
        Ok(Flow::Continue)
    }
}

/// On/off switches sharing one reporting format.
#[derive(Debug, Clone, Copy)]
enum Toggle {
    HighPriority,
    ProgressAnimation,
    SkipEvaluation,
}

impl Toggle {
    fn get(self, engine: &mut CommandEngine) -> bool {
        match self {
            Toggle::HighPriority => engine.session().high_priority,
            Toggle::ProgressAnimation => engine.progress_mut().is_enabled(),
            Toggle::SkipEvaluation => engine.front_end().skip_evaluation(),
        }
    }

    fn set(self, engine: &mut CommandEngine, on: bool) {
        match self {
            Toggle::HighPriority => engine.session_mut().high_priority = on,
            Toggle::ProgressAnimation => engine.progress_mut().set_enabled(on),
            Toggle::SkipEvaluation => engine.front_end_mut().set_skip_evaluation(on),
        }
    }
}

fn on_off(state: bool) -> &'static str {
    if state {
        "on"
    } else {
        "off"
    }
}

impl CommandHandler for Toggle {
    fn name(&self) -> &str {
        match self {
            Toggle::HighPriority => "high_priority",
            Toggle::ProgressAnimation => "progress_animation",
            Toggle::SkipEvaluation => "skip_evaluation",
        }
    }

    fn summary(&self) -> &str {
        match self {
            Toggle::HighPriority => "Show or set scheduling priority",
            Toggle::ProgressAnimation => "Show or set the startup progress indicator",
            Toggle::SkipEvaluation => "Show or set parse-only execution",
        }
    }

    fn handle(
        &self,
        engine: &mut CommandEngine,
        invocation: &CommandInvocation,
    ) -> Result<Flow, Failure> {
        let name = self.name();
        match invocation.args.as_slice() {
            [] => {
                let state = self.get(engine);
                engine
                    .console()
                    .println(&format!("{name} is '{}'", on_off(state)));
            }
            [param] if param == "on" || param == "off" => {
                let on = param == "on";
                self.set(engine, on);
                tracing::info!(setting = name, on, "toggled");
                engine
                    .console()
                    .println(&format!("{name} set to '{}'", on_off(on)));
            }
            [param] => {
                return usage(
                    engine,
                    format!("Unknown parameter '{param}' for system command '{name}'."),
                )
            }
            _ => {
                return usage(
                    engine,
                    format!("System command '{name}' expects zero or one parameter."),
                )
            }
        }
        Ok(Flow::Continue)
    }
}

struct ShmInfoCommand;

impl CommandHandler for ShmInfoCommand {
    fn name(&self) -> &str {
        "shm_info"
    }

    fn summary(&self) -> &str {
        "Show the shared memory region addresses"
    }

    fn handle(
        &self,
        engine: &mut CommandEngine,
        invocation: &CommandInvocation,
    ) -> Result<Flow, Failure> {
        if let Some(result) = takes_no_parameters(engine, invocation, "has no parameters.") {
            return result;
        }
        let info = engine.transport_mut().info();
        let console = engine.console();
        console.print_coloured("Shared memory information", Colour::Yellow, Style::HEADING);
        for region in Region::ALL {
            console.println(&format!(
                "  {:<6} = 0x{:08x}",
                region.label(),
                info.get(region)
            ));
        }
        Ok(Flow::Continue)
    }
}

struct ShmClearCommand;

impl CommandHandler for ShmClearCommand {
    fn name(&self) -> &str {
        "shm_clear"
    }

    fn summary(&self) -> &str {
        "Zero the shared memory regions"
    }

    fn handle(
        &self,
        engine: &mut CommandEngine,
        invocation: &CommandInvocation,
    ) -> Result<Flow, Failure> {
        if let Some(result) = takes_no_parameters(engine, invocation, "has no parameters.") {
            return result;
        }
        engine.transport_mut().clear();
        engine.console().println("Shared memory cleared");
        Ok(Flow::Continue)
    }
}

struct EditSymbolCommand;

impl CommandHandler for EditSymbolCommand {
    fn name(&self) -> &str {
        "edit_symbol"
    }

    fn summary(&self) -> &str {
        "Change one attribute of a symbol"
    }

    fn handle(
        &self,
        engine: &mut CommandEngine,
        invocation: &CommandInvocation,
    ) -> Result<Flow, Failure> {
        let [name, attribute] = invocation.args.as_slice() else {
            return usage(
                engine,
                format!("System command '{}' expects two parameters.", invocation.name),
            );
        };
        engine.edit_symbol(name, attribute);
        Ok(Flow::Continue)
    }
}

struct ProfileLevelCommand;

impl CommandHandler for ProfileLevelCommand {
    fn name(&self) -> &str {
        "profile_level"
    }

    fn summary(&self) -> &str {
        "Show or set statement profiling detail (0-3)"
    }

    fn handle(
        &self,
        engine: &mut CommandEngine,
        invocation: &CommandInvocation,
    ) -> Result<Flow, Failure> {
        let name = self.name();
        match invocation.args.as_slice() {
            [] => {
                let level = engine.front_end().profile_level();
                engine
                    .console()
                    .println(&format!("{name} is {level}"));
            }
            [param] => match param.parse::<u8>() {
                Ok(level) if level <= 3 => {
                    engine.front_end_mut().set_profile_level(level);
                    engine
                        .console()
                        .println(&format!("{name} set to {level}"));
                }
                _ => {
                    return usage(
                        engine,
                        format!("Unknown parameter '{param}' for system command '{name}'."),
                    )
                }
            },
            _ => {
                return usage(
                    engine,
                    format!("System command '{name}' expects zero or one parameter."),
                )
            }
        }
        Ok(Flow::Continue)
    }
}
