pub mod commands;
pub mod config;
pub mod fetch;
pub mod shell;

pub use config::{Config, ConfigError};
pub use shell::{describe_finished, Flow, Shell, ShellError};
