#![forbid(unsafe_code)]

use anyhow::Context;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// Logs go to `logfile` when given, otherwise to stderr.
pub fn init(verbosity: &Verbosity<InfoLevel>, logfile: Option<&Path>) -> anyhow::Result<()> {
    // NOTE: The verbosity flag takes precedence over the environment variable
    // for log control. For example, `APRIO_LOG=warn aprio -v` will still log
    // at the debug level. The environment variable (`APRIO_LOG`) can only set
    // the log level per crate, not override the verbosity flag. Eg.
    // `APRIO_LOG=orchestrator=trace aprio` logs at the trace level for the
    // orchestrator crate only.
    let env_filter = EnvFilter::builder()
        .with_env_var("APRIO_LOG")
        .from_env()?
        .add_directive(verbosity.log_level_filter().as_str().parse()?);

    let registry = tracing_subscriber::registry().with(env_filter);

    match logfile {
        Some(path) => {
            // opened before daemonizing, so a relative path stays valid
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_level(true)
                .with_file(false)
                .with_line_number(false)
                .with_writer(Mutex::new(file));
            registry.with(layer).init();
        }
        None => {
            let layer = tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_file(false)
                .with_line_number(false)
                .with_writer(std::io::stderr);
            registry.with(layer).init();
        }
    }
    Ok(())
}
