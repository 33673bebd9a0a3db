#![forbid(unsafe_code)]

use async_trait::async_trait;
use config::{Config, TimeModel, TimeSpan};
use orchestrator::{
    Clock, InMemorySystem, LoadAverage, LoadState, MemoryProcess, ReniceEngine, Services,
};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

const SELF_PID: u32 = 4242;

/// Clock frozen at a fixed instant.
#[derive(Debug)]
struct FixedClock(SystemTime);

#[async_trait]
impl Clock for FixedClock {
    fn now(&self) -> SystemTime {
        self.0
    }

    async fn sleep(&self, _duration: Duration) {}
}

fn epoch(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

fn config() -> Config {
    let mut config = Config::default();
    config.thresholds.cpu_percent = 50.0;
    config.thresholds.cpu_time = TimeSpan::from_secs_f64(1800.0);
    config.thresholds.load = 2.0;
    config.priority.time_scale = TimeSpan::from_secs_f64(8000.0);
    config
}

fn engine(config: Config, system: &InMemorySystem) -> ReniceEngine {
    let services = Services {
        table: Box::new(system.clone()),
        load: Box::new(system.clone()),
        clock: Box::new(FixedClock(epoch(100_000))),
    };
    ReniceEngine::with_self_pid(config, services, SELF_PID).unwrap()
}

/// Log sink that keeps everything written to it.
#[derive(Debug, Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with info level events written to the returned buffer.
fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, buffer.contents())
}

fn offender(pid: u32) -> MemoryProcess {
    MemoryProcess::new(pid, 1000, "alice")
        .cpu_percent(80.0)
        .cpu_time(3700.0)
        .started_at(epoch(90_000))
}

#[test]
fn busy_process_is_reniced_under_load() {
    let system = InMemorySystem::new();
    system.set_load(LoadAverage::new(4.0, 4.0, 4.0));
    system.insert(offender(1234));

    let mut engine = engine(config(), &system);
    let (report, logs) = capture_logs(|| engine.tick().unwrap());

    assert_eq!(report.state, LoadState::Scanning);
    assert_eq!(report.load, 4.0);
    assert_eq!(report.candidates, 1);
    assert_eq!(report.reniced, 1);
    assert_eq!(system.nice_of(1234), Some(9));
    assert_eq!(system.nice_changes(), vec![(1234, 9)]);

    let line = logs
        .lines()
        .find(|line| line.contains("priority modified"))
        .unwrap_or_else(|| panic!("no priority change logged in:\n{logs}"));
    assert!(line.contains("INFO"), "{line}");
    assert!(line.contains("pid=1234"), "{line}");
    assert!(line.contains("previous=0"), "{line}");
    assert!(line.contains("current=9"), "{line}");
}

#[test]
fn idle_system_is_not_scanned() {
    let system = InMemorySystem::new();
    system.set_load(LoadAverage::new(1.0, 1.0, 1.0));
    system.insert(offender(1234));

    let mut engine = engine(config(), &system);
    let report = engine.tick().unwrap();

    assert_eq!(report.state, LoadState::Idle);
    assert_eq!(report.candidates, 0);
    assert_eq!(system.scans(), 0);
    assert_eq!(system.nice_of(1234), Some(0));
}

#[test]
fn load_is_averaged_over_all_samples() {
    let system = InMemorySystem::new();
    // mean is exactly the threshold
    system.set_load(LoadAverage::new(3.0, 2.0, 1.0));
    system.insert(offender(1234));

    let mut engine = engine(config(), &system);
    let report = engine.tick().unwrap();

    assert_eq!(report.state, LoadState::Scanning);
    assert_eq!(system.scans(), 1);
}

#[test]
fn root_process_is_never_touched() {
    let system = InMemorySystem::new();
    system.set_load(LoadAverage::new(4.0, 4.0, 4.0));
    system.insert(
        MemoryProcess::new(1, 0, "root")
            .cpu_percent(99.0)
            .cpu_time(1e6),
    );
    system.insert(offender(SELF_PID));

    let mut engine = engine(config(), &system);
    let report = engine.tick().unwrap();

    assert_eq!(report.candidates, 0);
    assert!(system.nice_changes().is_empty());
}

#[test]
fn dry_run_changes_nothing() {
    let system = InMemorySystem::new();
    system.set_load(LoadAverage::new(4.0, 4.0, 4.0));
    system.insert(offender(1234));

    let mut config = config();
    config.daemon.dry_run = true;
    let mut engine = engine(config, &system);
    let report = engine.tick().unwrap();

    assert_eq!(report.reniced, 1);
    assert!(system.nice_changes().is_empty());
    assert_eq!(system.nice_of(1234), Some(0));
}

#[test]
fn failures_do_not_stop_the_scan() {
    let system = InMemorySystem::new();
    system.set_load(LoadAverage::new(4.0, 4.0, 4.0));
    system.insert_ghost(1000);
    system.insert(offender(1001));
    system.insert(offender(1002));
    system.insert(offender(1003).nice(-5));
    system.insert(offender(1004).nice(15));
    system.deny(1001);

    let mut engine = engine(config(), &system);
    let report = engine.tick().unwrap();

    assert_eq!(report.candidates, 4);
    assert_eq!(report.denied, 1);
    assert_eq!(report.reniced, 1);
    assert_eq!(report.unchanged, 2);
    assert_eq!(system.nice_changes(), vec![(1002, 9)]);
    assert_eq!(system.nice_of(1003), Some(-5));
    assert_eq!(system.nice_of(1004), Some(15));
}

#[test]
fn unreadable_niceness_is_counted_as_denied() {
    let system = InMemorySystem::new();
    system.set_load(LoadAverage::new(4.0, 4.0, 4.0));
    system.insert(offender(1001));
    system.insert(offender(1002));
    system.insert(offender(1003));
    system.deny_read(1001);
    system.deny_nice_read(1002);

    let mut engine = engine(config(), &system);
    let report = engine.tick().unwrap();

    // 1001 never becomes a candidate, 1002 fails right before the change
    assert_eq!(report.candidates, 2);
    assert_eq!(report.denied, 1);
    assert_eq!(report.reniced, 1);
    assert_eq!(system.nice_changes(), vec![(1003, 9)]);
    assert_eq!(system.nice_of(1002), Some(0));
}

#[test]
fn repeated_polls_do_not_reapply() {
    let system = InMemorySystem::new();
    system.set_load(LoadAverage::new(4.0, 4.0, 4.0));
    system.insert(offender(1234));

    let mut engine = engine(config(), &system);
    engine.tick().unwrap();
    let second = engine.tick().unwrap();

    assert_eq!(second.poll_id, 2);
    assert_eq!(second.unchanged, 1);
    assert_eq!(system.nice_changes(), vec![(1234, 9)]);
}

#[test]
fn wall_clock_age_is_used_when_cpu_time_maps_to_zero() {
    let system = InMemorySystem::new();
    system.set_load(LoadAverage::new(4.0, 4.0, 4.0));
    // 1900 s of CPU time maps to 0, 10000 s of age maps to 2
    system.insert(offender(1234).cpu_time(1900.0));

    let mut config = config();
    config.priority.time_scale = TimeSpan::from_secs_f64(80_000.0);
    let mut engine = engine(config, &system);
    engine.tick().unwrap();

    assert_eq!(system.nice_of(1234), Some(2));
}

#[test]
fn kernel_model_alone_leaves_young_usage_alone() {
    let system = InMemorySystem::new();
    system.set_load(LoadAverage::new(4.0, 4.0, 4.0));
    system.insert(offender(1234).cpu_time(1900.0));

    let mut config = config();
    config.priority.time_scale = TimeSpan::from_secs_f64(80_000.0);
    config.priority.models = vec![TimeModel::Kernel];
    let mut engine = engine(config, &system);
    let report = engine.tick().unwrap();

    assert_eq!(report.candidates, 1);
    assert_eq!(report.reniced, 0);
    assert!(system.nice_changes().is_empty());
}

#[test]
fn zero_time_scale_applies_maximum_niceness() {
    let system = InMemorySystem::new();
    system.set_load(LoadAverage::new(4.0, 4.0, 4.0));
    system.insert(offender(1234));

    let mut config = config();
    config.priority.time_scale = TimeSpan::from_secs_f64(0.0);
    let mut engine = engine(config, &system);
    engine.tick().unwrap();

    // nice_max of 20 is clamped to the kernel limit
    assert_eq!(system.nice_of(1234), Some(19));
}

#[test]
fn invalid_config_is_rejected() {
    let system = InMemorySystem::new();
    let mut config = config();
    config.daemon.poll = Duration::ZERO;
    let services = Services {
        table: Box::new(system.clone()),
        load: Box::new(system),
        clock: Box::new(FixedClock(epoch(0))),
    };
    assert!(ReniceEngine::new(config, services).is_err());
}
