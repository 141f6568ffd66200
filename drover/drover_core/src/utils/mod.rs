//! Utility types used across drover: configuration values and log levels.

pub mod config;
pub mod logging;

pub use config::ConfigValue;
pub use logging::LogLevel;
