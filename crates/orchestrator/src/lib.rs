#![deny(unsafe_code)]

pub mod actuator;
pub mod clock;
pub mod domain;
pub mod engine;
pub mod error;
pub mod policy;
pub mod system;

pub use actuator::{NICE_LIMIT, ReniceOutcome, Renicer};
pub use engine::{ControlEvent, ReniceEngine, Services, TickReport};
pub use policy::{
    Candidates, MapError, PriorityMapper, PriorityPolicy, ProcessFilter, RejectReason,
};
pub use system::{InMemorySystem, LoadSource, MemoryProcess, ProcessTable, ProcfsSystem};

pub use clock::{Clock, SystemClock};
pub use domain::{LoadAverage, LoadState, ProcessSnapshot, ProcessStat};
pub use error::{Error, ProbeError};
