//! validtime core library
//!
//! Accounting engine for "valid operating time": wall-clock time during which
//! a tracked instance is visible. Storage and time are reached through the
//! ports in [`ports`]; this crate has no knowledge of infrastructure concerns.

pub mod accumulator;
pub mod business_process;
pub mod config;
pub mod domain;
pub mod ports;
pub mod session;
pub mod tracker;
pub mod visibility_controller;

#[cfg(test)]
mod fakes;

pub use accumulator::{PersistentAccumulator, DEFAULT_STORAGE_KEY};
pub use business_process::{EndBusinessProcess, StartBusinessProcess};
pub use config::{Config, ConfigError, DaemonConfig, StorageConfig, TrackerConfig};
pub use domain::{BusinessKey, Visibility};
pub use ports::{Clock, KeyValueStore, KeyValueStoreError, ManualClock, SystemClock};
pub use session::{FlushOutcome, SessionTracker, TimerHandle, DEFAULT_INTERVAL_MS};
pub use tracker::{InitOptions, TrackerStatus, ValidTimeTracker};
pub use visibility_controller::VisibilityController;
