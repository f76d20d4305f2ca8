//! Process-wide `tracing` setup shared by the tezlink binaries.

mod logging;

pub use logging::{filter, init, LogConfig, LogFormat, LogOutput};
