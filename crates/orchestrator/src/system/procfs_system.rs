#![forbid(unsafe_code)]

use super::niceness::set_priority;
use super::{LoadSource, ProcessTable};
use crate::domain::{LoadAverage, ProcessStat};
use crate::error::{Error, ProbeError};
use nix::unistd::{Uid, User};
use procfs::Current;
use procfs::process::{Process, Stat};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{trace, warn};

/// [`ProcessTable`] and [`LoadSource`] backed by `/proc`.
#[derive(Debug, Clone)]
pub struct ProcfsSystem {
    ticks_per_second: f64,
    boot_time: SystemTime,
}

impl ProcfsSystem {
    pub fn new() -> Result<Self, Error> {
        let ticks_per_second = procfs::ticks_per_second() as f64;
        let boot_time = UNIX_EPOCH + Duration::from_secs(procfs::boot_time_secs()?);
        Ok(Self {
            ticks_per_second,
            boot_time,
        })
    }

    fn process(pid: u32) -> Result<Process, ProbeError> {
        Process::new(pid as i32).map_err(|err| ProbeError::from_procfs(pid, err))
    }

    fn read_stat(process: &Process, pid: u32) -> Result<Stat, ProbeError> {
        process.stat().map_err(|err| ProbeError::from_procfs(pid, err))
    }

    fn cpu_ticks(stat: &Stat) -> u64 {
        stat.utime.saturating_add(stat.stime)
    }

    /// Account name for `uid`, or the numeric id when it has none.
    fn username(uid: u32) -> String {
        match User::from_uid(Uid::from_raw(uid)) {
            Ok(Some(user)) => user.name,
            Ok(None) => uid.to_string(),
            Err(err) => {
                trace!(uid, %err, "failed to resolve user name");
                uid.to_string()
            }
        }
    }
}

impl ProcessTable for ProcfsSystem {
    fn pids(&self) -> Result<Vec<u32>, Error> {
        let mut pids = Vec::new();
        for process in procfs::process::all_processes()? {
            match process {
                Ok(p) => pids.push(p.pid as u32),
                Err(err) => {
                    warn!(?err, "failed to read process entry");
                }
            }
        }
        Ok(pids)
    }

    fn stat(&self, pid: u32) -> Result<ProcessStat, ProbeError> {
        let process = Self::process(pid)?;
        let stat = Self::read_stat(&process, pid)?;
        let status = process
            .status()
            .map_err(|err| ProbeError::from_procfs(pid, err))?;

        let cpu_time = Self::cpu_ticks(&stat) as f64 / self.ticks_per_second;
        let since_boot = Duration::from_secs_f64(stat.starttime as f64 / self.ticks_per_second);

        Ok(ProcessStat {
            pid,
            uid: status.ruid,
            euid: status.euid,
            username: Self::username(status.ruid),
            nice: stat.nice as i32,
            cpu_time,
            start_time: self.boot_time + since_boot,
        })
    }

    fn cpu_percent(&self, pid: u32, interval: Duration) -> Result<f32, ProbeError> {
        let process = Self::process(pid)?;
        let started = Instant::now();
        let before = Self::read_stat(&process, pid)?;
        std::thread::sleep(interval);
        let after = Self::read_stat(&process, pid)?;
        let elapsed = started.elapsed();

        let ticks = Self::cpu_ticks(&after).saturating_sub(Self::cpu_ticks(&before));
        Ok(usage_percent(ticks, self.ticks_per_second, elapsed))
    }

    fn nice(&self, pid: u32) -> Result<i32, ProbeError> {
        let process = Self::process(pid)?;
        Ok(Self::read_stat(&process, pid)?.nice as i32)
    }

    fn set_nice(&self, pid: u32, nice: i32) -> Result<(), ProbeError> {
        set_priority(pid, nice).map_err(|err| ProbeError::from_io(pid, err))
    }
}

/// CPU usage in percent of one core for `ticks` spent over `elapsed`.
///
/// `elapsed` is the measured time, which exceeds the requested sample
/// interval whenever the sampler oversleeps.
fn usage_percent(ticks: u64, ticks_per_second: f64, elapsed: Duration) -> f32 {
    if elapsed.is_zero() {
        return 0.0;
    }
    let busy = ticks as f64 / ticks_per_second;
    (busy / elapsed.as_secs_f64() * 100.0) as f32
}

impl LoadSource for ProcfsSystem {
    fn load_average(&self) -> Result<LoadAverage, Error> {
        let load = procfs::LoadAverage::current()?;
        Ok(LoadAverage::new(
            load.one as f64,
            load.five as f64,
            load.fifteen as f64,
        ))
    }
}
