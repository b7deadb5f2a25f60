//! Aegis client library: configuration and the delegated-signing flow
//! behind the `aegis` binary.

pub mod config;
pub mod scenario;

pub use config::{ClientConfig, ConfigError, Settings};
pub use scenario::{delegate_address, RunReport, Scenario, FAUCET_AMOUNT, TRANSFER_AMOUNT};
