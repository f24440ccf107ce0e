//! Execution modes of the command engine.

use crate::source::MAX_INCLUSION_DEPTH;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Interactive,
    Batch,
    /// Replaying a test plan file; `depth` counts nested `auto` calls.
    Auto { depth: usize },
    /// Recording a report.
    Man,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModeError {
    #[error("Cannot enter 'man' mode while executing in 'auto' mode.")]
    ManDuringAuto,
    #[error("Cannot enter 'auto' mode while executing in 'man' mode.")]
    AutoDuringMan,
    #[error("Deeply nested 'auto' batch file execution, possibly cyclic (depth {depth})")]
    AutoTooDeep { depth: usize },
}

/// Auto and Man are mutually exclusive; Auto nests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModeState {
    batch: bool,
    auto_depth: usize,
    man: bool,
}

impl ModeState {
    pub fn new(batch: bool) -> Self {
        Self {
            batch,
            ..Self::default()
        }
    }

    pub fn is_batch(&self) -> bool {
        self.batch
    }

    pub fn set_batch(&mut self, batch: bool) {
        self.batch = batch;
    }

    pub fn is_auto(&self) -> bool {
        self.auto_depth > 0
    }

    pub fn auto_depth(&self) -> usize {
        self.auto_depth
    }

    pub fn is_man(&self) -> bool {
        self.man
    }

    pub fn enter_auto(&mut self) -> Result<usize, ModeError> {
        if self.man {
            return Err(ModeError::AutoDuringMan);
        }
        if self.auto_depth >= MAX_INCLUSION_DEPTH {
            return Err(ModeError::AutoTooDeep {
                depth: self.auto_depth,
            });
        }
        self.auto_depth += 1;
        tracing::debug!(depth = self.auto_depth, "enter auto mode");
        Ok(self.auto_depth)
    }

    /// Unwind one `auto` level; the mode ends when the outermost returns.
    pub fn leave_auto(&mut self) {
        self.auto_depth = self.auto_depth.saturating_sub(1);
        tracing::debug!(depth = self.auto_depth, "leave auto mode");
    }

    /// Forget any `auto` nesting left over from an aborted command.
    pub fn reset_auto(&mut self) {
        self.auto_depth = 0;
    }

    pub fn enter_man(&mut self) -> Result<(), ModeError> {
        if self.is_auto() {
            return Err(ModeError::ManDuringAuto);
        }
        self.man = true;
        Ok(())
    }

    pub fn leave_man(&mut self) {
        self.man = false;
    }

    /// Dominant mode, for logging and the prompt.
    pub fn mode(&self) -> ExecutionMode {
        if self.is_auto() {
            ExecutionMode::Auto {
                depth: self.auto_depth,
            }
        } else if self.man {
            ExecutionMode::Man
        } else if self.batch {
            ExecutionMode::Batch
        } else {
            ExecutionMode::Interactive
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_nests_and_unwinds() {
        let mut modes = ModeState::new(false);
        assert_eq!(modes.enter_auto(), Ok(1));
        assert_eq!(modes.enter_auto(), Ok(2));
        modes.leave_auto();
        assert!(modes.is_auto());
        modes.leave_auto();
        assert!(!modes.is_auto());
        assert_eq!(modes.mode(), ExecutionMode::Interactive);
        modes.leave_auto();
        assert_eq!(modes.auto_depth(), 0);
    }

    #[test]
    fn auto_nesting_is_bounded() {
        let mut modes = ModeState::new(false);
        for _ in 0..MAX_INCLUSION_DEPTH {
            modes.enter_auto().unwrap();
        }
        assert_eq!(
            modes.enter_auto(),
            Err(ModeError::AutoTooDeep {
                depth: MAX_INCLUSION_DEPTH
            })
        );
        assert_eq!(modes.auto_depth(), MAX_INCLUSION_DEPTH);
    }

    #[test]
    fn auto_and_man_exclude_each_other() {
        let mut modes = ModeState::new(true);
        modes.enter_man().unwrap();
        assert_eq!(modes.enter_auto(), Err(ModeError::AutoDuringMan));
        assert_eq!(modes.mode(), ExecutionMode::Man);
        modes.leave_man();

        modes.enter_auto().unwrap();
        assert_eq!(modes.enter_man(), Err(ModeError::ManDuringAuto));
        assert!(!modes.is_man());
        assert_eq!(modes.mode(), ExecutionMode::Auto { depth: 1 });
    }
}
