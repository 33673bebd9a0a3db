pub mod cli;
pub mod daemon;
pub mod logging;
pub mod signals;
