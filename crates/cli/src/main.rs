use anyhow::Context;
use aprio::{cli::Cli, daemon::daemonize, signals::Signals};
use clap::Parser;
use config::Config;
use orchestrator::{ProcfsSystem, ReniceEngine, Services, SystemClock};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

#[cfg(feature = "jemalloc")]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    aprio::logging::init(&cli.verbosity, cli.logfile.as_deref())?;

    // everything that can fail at startup happens before forking, so errors
    // still reach the terminal
    let config = load_config(&cli)?;
    debug!(?config, ?cli);
    if config.daemon.dry_run {
        debug!("test mode (processes will not be modified)");
    }
    let system = ProcfsSystem::new().context("failed to read system information")?;

    if cli.daemon {
        if cli.logfile.is_none() {
            warn!("running as a daemon without a log file, log output is discarded");
        }
        debug!("daemon mode");
        daemonize()?;
    } else {
        debug!("foreground mode");
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(config, system))
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        _ => {
            let mut candidates = glob::glob("/etc/aprio/config.d/*.toml")?
                .filter_map(Result::ok)
                .collect::<Vec<_>>();
            candidates.insert(0, "/etc/aprio/config.toml".into());
            trace!(?candidates, "config file candidates");
            Config::load_multiple(candidates)?
        }
    };
    cli.apply(&mut config);
    config.validate()?;
    Ok(config)
}

async fn run(config: Config, system: ProcfsSystem) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let (control_tx, control_rx) = mpsc::unbounded_channel();

    let signals = Signals::install().context("failed to install signal handlers")?;
    let signal_handle = tokio::spawn(signals.forward(cancel.clone(), control_tx));

    let services = Services {
        table: Box::new(system.clone()),
        load: Box::new(system),
        clock: Box::new(SystemClock),
    };
    let mut engine = ReniceEngine::new(config, services)?;
    let result = engine.run_until(cancel, control_rx).await;

    signal_handle.abort();
    Ok(result?)
}
