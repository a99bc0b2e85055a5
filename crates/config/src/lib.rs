//! Configuration module for the AV1 watch-folder transcoder
//!
//! Handles loading configuration from TOML files and environment variable overrides.

pub mod config;

pub use config::*;
