//! Language front end boundary.
//!
//! The engine hands every command or test plan file to a [`FrontEnd`] as a
//! character stream. The front end consumes it to completion and leaves its
//! results in the session's output queue, or stops with a [`Failure`].

pub mod output;
pub mod script;

use crate::engine::Session;
use crate::error::Failure;
use crate::input::CharStream;

pub use output::{Message, MessageKind, OutputQueue};
pub use script::ScriptFrontEnd;

pub trait FrontEnd {
    /// Consume `stream` and evaluate every statement in it.
    fn parse(&mut self, session: &mut Session, stream: Box<dyn CharStream>) -> Result<(), Failure>;

    /// Reserved words offered for completion.
    fn keywords(&self) -> Vec<String>;

    fn profile_level(&self) -> u8;

    fn set_profile_level(&mut self, level: u8);

    fn skip_evaluation(&self) -> bool;

    fn set_skip_evaluation(&mut self, skip: bool);
}
