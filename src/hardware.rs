//! Capability boundary to the shared-memory hardware transport.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Input,
    Output,
    Task,
    Error,
}

impl Region {
    pub const ALL: [Region; 4] = [Region::Input, Region::Output, Region::Task, Region::Error];

    /// Short name used in operator messages.
    pub fn label(self) -> &'static str {
        match self {
            Region::Input => "in",
            Region::Output => "out",
            Region::Task => "task",
            Region::Error => "error",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One value per shared-memory region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegionMap<T> {
    pub input: T,
    pub output: T,
    pub task: T,
    pub error: T,
}

impl<T: Copy> RegionMap<T> {
    pub fn uniform(value: T) -> Self {
        Self {
            input: value,
            output: value,
            task: value,
            error: value,
        }
    }

    pub fn get(&self, region: Region) -> T {
        match region {
            Region::Input => self.input,
            Region::Output => self.output,
            Region::Task => self.task,
            Region::Error => self.error,
        }
    }
}

/// Operations the engine sequences on the transport.
pub trait HardwareTransport: Send {
    /// Attach every region; `false` marks a failed allocation.
    fn open(&mut self) -> RegionMap<bool>;

    fn close(&mut self);

    fn clear(&mut self);

    /// Base address of each region.
    fn info(&self) -> RegionMap<u64>;

    fn set_unit_under_test(&mut self, code: u8);

    /// Rebuild the transport's lookup tables after the configuration changed.
    fn reset_tables(&mut self) {}
}

/// Development stand-in used when no test equipment is attached.
#[derive(Debug, Default)]
pub struct SimulatedTransport {
    open: bool,
    unit_under_test: Option<u8>,
    clear_count: usize,
    table_resets: usize,
}

impl SimulatedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn unit_under_test(&self) -> Option<u8> {
        self.unit_under_test
    }

    pub fn clear_count(&self) -> usize {
        self.clear_count
    }

    pub fn table_resets(&self) -> usize {
        self.table_resets
    }
}

impl HardwareTransport for SimulatedTransport {
    fn open(&mut self) -> RegionMap<bool> {
        self.open = true;
        RegionMap::uniform(true)
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn clear(&mut self) {
        self.clear_count += 1;
    }

    fn info(&self) -> RegionMap<u64> {
        RegionMap::uniform(0)
    }

    fn set_unit_under_test(&mut self, code: u8) {
        tracing::debug!(code, "unit under test selected");
        self.unit_under_test = Some(code);
    }

    fn reset_tables(&mut self) {
        self.table_resets += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_transport_records_requests() {
        let mut shm = SimulatedTransport::new();
        let status = shm.open();
        assert!(Region::ALL.iter().all(|region| status.get(*region)));
        shm.set_unit_under_test(3);
        shm.clear();
        assert_eq!(shm.unit_under_test(), Some(3));
        assert_eq!(shm.clear_count(), 1);
        assert_eq!(shm.info().get(Region::Task), 0);
        shm.close();
        assert!(!shm.is_open());
    }
}
