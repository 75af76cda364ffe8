//! Configuration Module
//!
//! Session and runtime configuration loaded from the environment.

mod settings;

pub use settings::{
    ClientConfig, ConfigError, DEFAULT_ADDR, DEFAULT_AUTH_TIMEOUT, DEFAULT_CONNECT_TIMEOUT,
    RuntimeSettings,
};
