#![forbid(unsafe_code)]

use crate::actuator::{ReniceOutcome, Renicer};
use crate::clock::Clock;
use crate::domain::LoadState;
use crate::error::{Error, ProbeError};
use crate::policy::{PriorityPolicy, ProcessFilter};
use crate::system::{LoadSource, ProcessTable};
use config::Config;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

pub struct Services {
    pub table: Box<dyn ProcessTable>,
    pub load: Box<dyn LoadSource>,
    pub clock: Box<dyn Clock>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// Log the configuration and the last poll report.
    DumpStatus,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub poll_id: u64,
    pub state: LoadState,
    /// Mean of the load averages.
    pub load: f64,
    pub candidates: usize,
    /// Niceness raised, or would have been in test mode.
    pub reniced: usize,
    /// Protected or already nice enough.
    pub unchanged: usize,
    pub denied: usize,
    pub vanished: usize,
    pub failed: usize,
}

pub struct ReniceEngine {
    config: Config,
    services: Services,
    filter: ProcessFilter,
    policy: PriorityPolicy,
    renicer: Renicer,
    poll_id: u64,
    last_report: Option<TickReport>,
}

impl ReniceEngine {
    /// Create an engine that never touches the calling process.
    pub fn new(config: Config, services: Services) -> Result<Self, Error> {
        Self::with_self_pid(config, services, std::process::id())
    }

    pub fn with_self_pid(config: Config, services: Services, self_pid: u32) -> Result<Self, Error> {
        config.validate()?;
        let filter = ProcessFilter::new(&config, self_pid);
        let policy = PriorityPolicy::new(&config.priority);
        let renicer = Renicer::from_config(&config);
        Ok(Self {
            config,
            services,
            filter,
            policy,
            renicer,
            poll_id: 0,
            last_report: None,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one poll: check the load and, when it is high enough, renice every
    /// offending process. Does not sleep.
    ///
    /// Failures of single processes are counted in the report; only a failure
    /// to read the load or to enumerate processes is returned as an error.
    pub fn tick(&mut self) -> Result<TickReport, Error> {
        self.poll_id = self.poll_id.saturating_add(1);
        let threshold = self.config.thresholds.load;
        let load = self.services.load.load_average()?.mean();

        let mut report = TickReport {
            poll_id: self.poll_id,
            state: LoadState::classify(load, threshold),
            load,
            ..TickReport::default()
        };

        if report.state == LoadState::Idle {
            debug!(load, threshold, "load threshold nominal");
            return Ok(report);
        }
        debug!(load, threshold, "load threshold exceeded");

        let now = self.services.clock.now();
        let table = self.services.table.as_ref();
        for snapshot in self.filter.candidates(table)? {
            report.candidates += 1;
            let target = self.policy.target(&snapshot.stat, now);
            trace!(pid = snapshot.stat.pid, target, "target niceness");
            if target == 0 {
                continue;
            }

            match self.renicer.apply(table, &snapshot, target) {
                Ok(ReniceOutcome::Applied { .. } | ReniceOutcome::Simulated { .. }) => {
                    report.reniced += 1;
                }
                Ok(ReniceOutcome::Protected { .. } | ReniceOutcome::Unchanged { .. }) => {
                    report.unchanged += 1;
                }
                Err(ProbeError::PermissionDenied { .. }) => report.denied += 1,
                Err(ProbeError::Vanished { .. }) => report.vanished += 1,
                Err(_) => report.failed += 1,
            }
        }

        Ok(report)
    }

    /// Poll until `cancel` is triggered, sleeping `daemon.poll` between polls.
    ///
    /// On a multi-thread runtime each poll runs under
    /// [`block_in_place`](tokio::task::block_in_place). A current-thread
    /// runtime is stalled for the duration of every poll instead.
    pub async fn run_until(
        &mut self,
        cancel: CancellationToken,
        mut control_rx: mpsc::UnboundedReceiver<ControlEvent>,
    ) -> Result<(), Error> {
        let poll = self.config.daemon.poll;
        info!(
            ?poll,
            dry_run = self.config.daemon.dry_run,
            load_threshold = self.config.thresholds.load,
            "poll loop started"
        );

        loop {
            if cancel.is_cancelled() {
                info!("shutdown requested");
                break;
            }

            match self.tick_blocking() {
                Ok(report) => {
                    trace!(?report, "poll finished");
                    self.last_report = Some(report);
                }
                Err(err) => {
                    warn!(%err, "poll failed");
                }
            }

            let sleep = self.services.clock.sleep(poll);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("shutdown requested");
                        return Ok(());
                    }
                    Some(event) = control_rx.recv() => {
                        self.handle_control(event);
                    }
                    _ = &mut sleep => break,
                }
            }
        }

        Ok(())
    }

    /// Run [`tick`](Self::tick) without starving the other tasks of the runtime.
    fn tick_blocking(&mut self) -> Result<TickReport, Error> {
        match Handle::current().runtime_flavor() {
            // block_in_place panics here
            RuntimeFlavor::CurrentThread => self.tick(),
            // process sampling blocks, keep it off the async workers
            _ => tokio::task::block_in_place(|| self.tick()),
        }
    }

    fn handle_control(&self, event: ControlEvent) {
        match event {
            ControlEvent::DumpStatus => self.dump_status(),
        }
    }

    fn dump_status(&self) {
        info!(?self.config, "current config");
        match &self.last_report {
            Some(report) => info!(?report, "last poll"),
            None => info!("no poll finished yet"),
        }
    }
}
