/// Installs the process-wide `log` backend with console and file output.
pub mod logger_setup;

pub use logger_setup::*;
