//! Recoverable failures raised by the front end and command handlers.

use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::input::StreamError;
use crate::source::SourceInfo;
use crate::symbol::SymbolError;
use std::fmt;
use thiserror::Error;

/// Origin of a failure; drives how the engine reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Input,
    Scan,
    Parse,
    Evaluation,
    /// `exit` statement in a script.
    Exit,
    /// Termination requested by the operator while a script waited.
    UserExit,
    Assert,
    CyclicInclusion,
    Io,
    Config,
    Internal,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Input => "InputError",
            FailureKind::Scan => "ScanError",
            FailureKind::Parse => "ParseError",
            FailureKind::Evaluation => "EvaluationError",
            FailureKind::Exit => "ExitError",
            FailureKind::UserExit => "UserExitError",
            FailureKind::Assert => "AssertError",
            FailureKind::CyclicInclusion => "CyclicInclusionError",
            FailureKind::Io => "IOError",
            FailureKind::Config => "ConfigError",
            FailureKind::Internal => "InternalError",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct Failure {
    kind: FailureKind,
    message: String,
    location: Option<SourceInfo>,
    listing: Option<String>,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
            listing: None,
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Input, message)
    }

    pub fn scan(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Scan, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Parse, message)
    }

    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Evaluation, message)
    }

    pub fn exit(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Exit, message)
    }

    pub fn user_exit(message: impl Into<String>) -> Self {
        Self::new(FailureKind::UserExit, message)
    }

    pub fn assert(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Assert, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Io, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Internal, message)
    }

    /// Attach the position and listing captured when the failure was detected.
    pub fn at(mut self, location: Option<SourceInfo>, listing: impl Into<String>) -> Self {
        self.location = location;
        let listing = listing.into();
        self.listing = (!listing.trim().is_empty()).then_some(listing);
        self
    }

    /// Like [`Failure::at`], but keeps a position captured deeper down.
    pub fn or_at(self, location: Option<SourceInfo>, listing: impl Into<String>) -> Self {
        if self.location.is_some() {
            self
        } else {
            self.at(location, listing)
        }
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn location(&self) -> Option<&SourceInfo> {
        self.location.as_ref()
    }

    pub fn listing(&self) -> Option<&str> {
        self.listing.as_deref()
    }

    /// Single response shown to the operator.
    pub fn render(&self) -> String {
        let prefix = match self.kind {
            FailureKind::Exit => "Exit Warning",
            FailureKind::UserExit => "User Exit Warning",
            FailureKind::Assert => "Assert Error",
            FailureKind::Input
            | FailureKind::Scan
            | FailureKind::Parse
            | FailureKind::Evaluation
            | FailureKind::CyclicInclusion
            | FailureKind::Io
            | FailureKind::Config
            | FailureKind::Internal => "Error",
        };
        let mut text = match self.kind {
            FailureKind::Internal => format!("{prefix}: Internal error, {}", self.message),
            _ => format!("{prefix}: {}", self.message),
        };
        if let Some(location) = &self.location {
            text.push_str(&format!(" ({location})"));
        }
        if let Some(listing) = &self.listing {
            for line in listing.lines() {
                text.push_str("\n  | ");
                text.push_str(line);
            }
        }
        text
    }
}

impl From<StreamError> for Failure {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Io { .. } => Failure::io(err.to_string()),
            StreamError::NestingTooDeep { .. } => {
                Failure::new(FailureKind::CyclicInclusion, err.to_string())
            }
        }
    }
}

impl From<ConfigError> for Failure {
    fn from(err: ConfigError) -> Self {
        Failure::new(FailureKind::Config, format!("ConfigurationFileError: {err}"))
    }
}

impl From<CacheError> for Failure {
    fn from(err: CacheError) -> Self {
        Failure::io(err.to_string())
    }
}

impl From<SymbolError> for Failure {
    fn from(err: SymbolError) -> Self {
        Failure::evaluation(err.to_string())
    }
}

impl From<std::io::Error> for Failure {
    fn from(err: std::io::Error) -> Self {
        Failure::io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_prefix_per_kind() {
        assert_eq!(Failure::parse("bad").render(), "Error: bad");
        assert_eq!(Failure::exit("stop").render(), "Exit Warning: stop");
        assert_eq!(Failure::user_exit("stop").render(), "User Exit Warning: stop");
        assert_eq!(Failure::assert("x").render(), "Assert Error: x");
        assert_eq!(Failure::internal("boom").render(), "Error: Internal error, boom");
    }

    #[test]
    fn renders_location_and_listing() {
        let failure = Failure::parse("Syntax error")
            .at(Some(SourceInfo::new("a.tpf", 4, 9)), "x :=\ny\n");
        assert_eq!(
            failure.render(),
            "Error: Syntax error (file 'a.tpf', line 4)\n  | x :=\n  | y"
        );
    }

    #[test]
    fn nesting_maps_to_cyclic_inclusion() {
        let failure = Failure::from(StreamError::NestingTooDeep { depth: 64 });
        assert_eq!(failure.kind(), FailureKind::CyclicInclusion);
    }
}
