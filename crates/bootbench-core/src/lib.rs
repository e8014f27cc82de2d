//! Cluster-wide boot timing measurement and aggregation.
//!
//! A fleet of compute instances is provisioned by external collaborators
//! (cloud create calls, state polling, SSH/RDP reachability checks) that
//! stamp lifecycle timestamps onto each instance as it comes up. This crate
//! turns those timestamps into structured timing samples:
//!
//! - [`boot_time_samples`] reduces a fully booted fleet into per-instance
//!   and cluster-wide boot metrics, measured against the earliest create
//!   call so that staggered creation starts are accounted for.
//! - [`measure_reboot`] and [`measure_delete`] fan an operation out across
//!   the whole fleet concurrently and measure per-instance and cluster
//!   durations.
//!
//! The crate performs no provisioning, no I/O and no reporting; it only
//! reads instances through the [`ClusterInstance`] trait and returns
//! [`Sample`] records for a downstream sink.

mod aggregator;
mod config;
mod instance;
mod runner;
pub mod test_utils;

pub use aggregator::boot_time_samples;
pub use config::MeasurementFlags;
pub use instance::{BootTimeline, ClusterInstance, DeleteTimeline, SshReadiness};
pub use runner::{measure_delete, measure_reboot, run, Operation};

pub use bootbench_common::{BootBenchError, Result, Sample, SECONDS};
