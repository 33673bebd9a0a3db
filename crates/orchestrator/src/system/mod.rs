mod memory;
mod niceness;
mod procfs_system;

pub use memory::{InMemorySystem, MemoryProcess};
pub use procfs_system::ProcfsSystem;

use crate::domain::{LoadAverage, ProcessStat};
use crate::error::{Error, ProbeError};
use std::time::Duration;

/// Access to the OS process table.
///
/// Every per-process call may fail with [`ProbeError::Vanished`] when the
/// process exits between enumeration and inspection.
pub trait ProcessTable: Send + Sync {
    /// Ids of all visible processes, in the order the OS lists them.
    fn pids(&self) -> Result<Vec<u32>, Error>;

    /// Ownership, niceness and CPU accounting of one process.
    fn stat(&self, pid: u32) -> Result<ProcessStat, ProbeError>;

    /// CPU usage of one process in percent of one core, sampled over
    /// `interval`. Blocks the caller for `interval`.
    fn cpu_percent(&self, pid: u32, interval: Duration) -> Result<f32, ProbeError>;

    /// Current niceness of one process.
    fn nice(&self, pid: u32) -> Result<i32, ProbeError>;

    /// Change the niceness of one process.
    fn set_nice(&self, pid: u32, nice: i32) -> Result<(), ProbeError>;
}

pub trait LoadSource: Send + Sync {
    fn load_average(&self) -> Result<LoadAverage, Error>;
}
