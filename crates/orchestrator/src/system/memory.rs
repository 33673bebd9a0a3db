#![forbid(unsafe_code)]

use super::{LoadSource, ProcessTable};
use crate::domain::{LoadAverage, ProcessStat};
use crate::error::{Error, ProbeError};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// One entry of an [`InMemorySystem`].
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryProcess {
    pub stat: ProcessStat,
    pub cpu_percent: f32,
}

impl MemoryProcess {
    pub fn new(pid: u32, uid: u32, username: impl Into<String>) -> Self {
        Self {
            stat: ProcessStat {
                pid,
                uid,
                euid: uid,
                username: username.into(),
                nice: 0,
                cpu_time: 0.0,
                start_time: SystemTime::UNIX_EPOCH,
            },
            cpu_percent: 0.0,
        }
    }

    pub fn euid(mut self, euid: u32) -> Self {
        self.stat.euid = euid;
        self
    }

    pub fn nice(mut self, nice: i32) -> Self {
        self.stat.nice = nice;
        self
    }

    pub fn cpu_time(mut self, secs: f64) -> Self {
        self.stat.cpu_time = secs;
        self
    }

    pub fn cpu_percent(mut self, percent: f32) -> Self {
        self.cpu_percent = percent;
        self
    }

    pub fn started_at(mut self, start_time: SystemTime) -> Self {
        self.stat.start_time = start_time;
        self
    }
}

#[derive(Debug, Default)]
struct Inner {
    processes: Vec<MemoryProcess>,
    load: LoadAverage,
    /// Listed by `pids` but gone by the time they are inspected.
    ghosts: Vec<u32>,
    denied: HashSet<u32>,
    /// Owner and CPU accounting cannot be read.
    unreadable: HashSet<u32>,
    /// Stat is readable, but reading the niceness right before a change fails.
    nice_unreadable: HashSet<u32>,
    scans: usize,
    nice_changes: Vec<(u32, i32)>,
}

/// A process table held in memory.
///
/// Clones share the same table, so a test can keep a handle while the engine
/// owns another. CPU sampling returns immediately.
#[derive(Debug, Default, Clone)]
pub struct InMemorySystem {
    inner: Arc<Mutex<Inner>>,
}

impl InMemorySystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, process: MemoryProcess) {
        let mut inner = self.inner.lock();
        inner.processes.retain(|p| p.stat.pid != process.stat.pid);
        inner.processes.push(process);
    }

    pub fn remove(&self, pid: u32) {
        self.inner.lock().processes.retain(|p| p.stat.pid != pid);
    }

    /// List `pid` during enumeration, then report it as vanished.
    pub fn insert_ghost(&self, pid: u32) {
        self.inner.lock().ghosts.push(pid);
    }

    /// Refuse every niceness change of `pid`.
    pub fn deny(&self, pid: u32) {
        self.inner.lock().denied.insert(pid);
    }

    /// Fail `stat` and `cpu_percent` of `pid` with a permission error.
    pub fn deny_read(&self, pid: u32) {
        self.inner.lock().unreadable.insert(pid);
    }

    /// Fail `nice` of `pid` with a permission error.
    pub fn deny_nice_read(&self, pid: u32) {
        self.inner.lock().nice_unreadable.insert(pid);
    }

    pub fn set_load(&self, load: LoadAverage) {
        self.inner.lock().load = load;
    }

    /// Number of full table enumerations so far.
    pub fn scans(&self) -> usize {
        self.inner.lock().scans
    }

    /// Every successful `set_nice` call, in order.
    pub fn nice_changes(&self) -> Vec<(u32, i32)> {
        self.inner.lock().nice_changes.clone()
    }

    pub fn nice_of(&self, pid: u32) -> Option<i32> {
        self.inner
            .lock()
            .processes
            .iter()
            .find(|p| p.stat.pid == pid)
            .map(|p| p.stat.nice)
    }

    fn with_process<T>(
        &self,
        pid: u32,
        f: impl FnOnce(&mut MemoryProcess) -> T,
    ) -> Result<T, ProbeError> {
        let mut inner = self.inner.lock();
        inner
            .processes
            .iter_mut()
            .find(|p| p.stat.pid == pid)
            .map(f)
            .ok_or(ProbeError::Vanished { pid })
    }
}

impl ProcessTable for InMemorySystem {
    fn pids(&self) -> Result<Vec<u32>, Error> {
        let mut inner = self.inner.lock();
        inner.scans += 1;
        let mut pids: Vec<u32> = inner.processes.iter().map(|p| p.stat.pid).collect();
        pids.extend(inner.ghosts.iter().copied());
        Ok(pids)
    }

    fn stat(&self, pid: u32) -> Result<ProcessStat, ProbeError> {
        if self.inner.lock().unreadable.contains(&pid) {
            return Err(ProbeError::PermissionDenied { pid });
        }
        self.with_process(pid, |p| p.stat.clone())
    }

    fn cpu_percent(&self, pid: u32, _interval: Duration) -> Result<f32, ProbeError> {
        if self.inner.lock().unreadable.contains(&pid) {
            return Err(ProbeError::PermissionDenied { pid });
        }
        self.with_process(pid, |p| p.cpu_percent)
    }

    fn nice(&self, pid: u32) -> Result<i32, ProbeError> {
        if self.inner.lock().nice_unreadable.contains(&pid) {
            return Err(ProbeError::PermissionDenied { pid });
        }
        self.with_process(pid, |p| p.stat.nice)
    }

    fn set_nice(&self, pid: u32, nice: i32) -> Result<(), ProbeError> {
        if self.inner.lock().denied.contains(&pid) {
            return Err(ProbeError::PermissionDenied { pid });
        }
        self.with_process(pid, |p| p.stat.nice = nice)?;
        self.inner.lock().nice_changes.push((pid, nice));
        Ok(())
    }
}

impl LoadSource for InMemorySystem {
    fn load_average(&self) -> Result<LoadAverage, Error> {
        Ok(self.inner.lock().load)
    }
}
