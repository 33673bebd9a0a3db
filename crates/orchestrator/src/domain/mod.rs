#![forbid(unsafe_code)]

mod load;
mod process;

pub use load::{LoadAverage, LoadState};
pub use process::{ProcessSnapshot, ProcessStat};
