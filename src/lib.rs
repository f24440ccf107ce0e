//=====================================================
// File: lib.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: AITESS command runtime library root
// Objective: Expose the input abstraction, source tracking, configuration,
//            cache and command engine used by the interactive shell
//=====================================================

pub mod cache;
pub mod completer;
pub mod config;
pub mod console;
pub mod engine;
pub mod error;
pub mod frontend;
pub mod hardware;
pub mod history;
pub mod input;
pub mod line_source;
pub mod logging;
pub mod paths;
pub mod progress;
pub mod settings;
pub mod source;
pub mod symbol;
pub mod transcript;

pub use engine::{CommandEngine, EngineParts, StepOutcome};
pub use error::{Failure, FailureKind};

/// Version stamped into every cache snapshot written by this build.
pub const RUNTIME_VERSION: &str = env!("CARGO_PKG_VERSION");

//=====================================================
// End of file
//=====================================================
