//! Library side of the `dirwatch` binary: config, logging and console output

pub mod config;
pub mod console;
pub mod logging;

pub use config::{AppConfig, Overrides};
pub use console::{ConsoleListener, OutputFormat};
