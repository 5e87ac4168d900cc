//! Infrastructure layer - config file reading and diagnostics output

pub mod config_file;
pub mod logging;

pub use config_file::{parse_config_str, read_config_file};
pub use logging::Diagnostics;
