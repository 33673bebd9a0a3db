use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use config::{Config, TimeSpan};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// aprio: automatic process priority
///
/// aprio watches the system load average. While it is high, processes that
/// have been hogging the CPU for a long time get their niceness raised, the
/// more so the longer they have been running. Processes owned by root are
/// never touched and priorities are never raised.
#[derive(Debug, Parser, Clone)]
#[command(about, long_about, version)]
pub struct Cli {
    /// Path to configuration file.
    ///
    /// If not provided, the default locations are checked. They are
    /// `/etc/aprio/config.toml` and `/etc/aprio/config.d/*.toml`, where the
    /// latter being a glob pattern. If they don't exist, the default
    /// configuration is used. Command line options override the file.
    #[arg(long, value_parser = validate_file)]
    pub config: Option<PathBuf>,

    /// Fork into background.
    #[arg(short, long)]
    pub daemon: bool,

    /// Path to log file.
    ///
    /// Logs go to stderr when not given.
    #[arg(short = 'L', long)]
    pub logfile: Option<PathBuf>,

    /// Limit to processes owned by this user.
    #[arg(short, long)]
    pub user: Option<String>,

    /// Trigger once a process uses more than this percentage of one CPU.
    #[arg(short, long, value_parser = validate_non_negative::<f32>)]
    pub cpu_threshold: Option<f32>,

    /// Trigger once a process accumulated more CPU time than this.
    ///
    /// A number followed by one of the units s, m, h, d, w, M (four weeks)
    /// or y (48 weeks), e.g. `30m`.
    #[arg(short = 't', long)]
    pub cputime_threshold: Option<TimeSpan>,

    /// Only scan processes while the mean load average is at least this.
    #[arg(short, long, value_parser = validate_non_negative::<f64>)]
    pub load_threshold: Option<f64>,

    /// Accumulated time over which niceness grows to its maximum, e.g. `1w`.
    #[arg(long)]
    pub time_scale: Option<TimeSpan>,

    /// Multiplier applied to the time scale.
    #[arg(long, value_parser = validate_non_negative::<f64>)]
    pub time_factor: Option<f64>,

    /// Wait this many seconds between polls.
    #[arg(short, long, value_parser = validate_poll)]
    pub poll: Option<Duration>,

    /// Do not modify processes; report only.
    #[arg(short = 'T', long)]
    pub test: bool,

    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,
}

impl Cli {
    /// Override `config` with the values given on the command line.
    pub fn apply(&self, config: &mut Config) {
        if let Some(user) = &self.user {
            config.daemon.user = Some(user.clone());
        }
        if let Some(cpu_percent) = self.cpu_threshold {
            config.thresholds.cpu_percent = cpu_percent;
        }
        if let Some(cpu_time) = self.cputime_threshold {
            config.thresholds.cpu_time = cpu_time;
        }
        if let Some(load) = self.load_threshold {
            config.thresholds.load = load;
        }
        if let Some(time_scale) = self.time_scale {
            config.priority.time_scale = time_scale;
        }
        if let Some(time_factor) = self.time_factor {
            config.priority.time_factor = time_factor;
        }
        if let Some(poll) = self.poll {
            config.daemon.poll = poll;
        }
        if self.test {
            config.daemon.dry_run = true;
        }
    }
}

/// Check if the file exists.
#[inline(always)]
fn validate_file(file: &str) -> Result<PathBuf, String> {
    let path = Path::new(file);
    if path.exists() {
        Ok(path.to_owned())
    } else {
        Err(format!("File not found: {:?}", path))
    }
}

/// Parse a number that is not negative.
fn validate_non_negative<T>(value: &str) -> Result<T, String>
where
    T: std::str::FromStr + PartialOrd + Default + Copy,
{
    let number: T = value
        .parse()
        .map_err(|_| format!("`{value}` is not a valid number"))?;
    // NaN fails both comparisons
    if number >= T::default() {
        Ok(number)
    } else {
        Err(format!("`{value}` must be a non-negative number"))
    }
}

/// Validate the poll interval in seconds.
#[inline(always)]
fn validate_poll(secs: &str) -> Result<Duration, String> {
    let secs: f64 = secs
        .parse()
        .map_err(|_| format!("`{secs}` is not a valid number of seconds"))?;
    match Duration::try_from_secs_f64(secs) {
        Ok(poll) if !poll.is_zero() => Ok(poll),
        _ => Err("Poll interval must be a positive number of seconds".to_string()),
    }
}
