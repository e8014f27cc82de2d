use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use bootbench_common::Result;

/// Signed delta in floating-point seconds, exact to the microsecond.
pub(crate) fn delta_seconds(delta: TimeDelta) -> f64 {
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1e6,
        // Deltas past ~292k years overflow the microsecond count.
        None => delta.num_milliseconds() as f64 / 1e3,
    }
}

/// Lifecycle timestamps recorded while an instance is brought up.
///
/// All fields are populated by external provisioning, polling and
/// connectivity collaborators; this crate only reads them. Which fields are
/// set depends on the provider: synchronous-create clouds never record
/// `create_return_time`, and the port-listening timestamps appear only when
/// the corresponding checks are run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BootTimeline {
    /// Moment immediately before the create call was issued. Every other
    /// timestamp on the same instance follows it.
    pub create_start_time: Option<DateTime<Utc>>,
    /// Moment an asynchronous create call returned to the harness.
    pub create_return_time: Option<DateTime<Utc>>,
    /// Moment state polling first observed the provider's running state.
    pub is_running_time: Option<DateTime<Utc>>,
    /// Moment the remote-command port first accepted a connection.
    pub port_listening_time: Option<DateTime<Utc>>,
    /// Moment the RDP port first accepted a connection.
    pub rdp_port_listening_time: Option<DateTime<Utc>>,
    /// Moment the instance was deemed ready, recorded upstream as the last
    /// of whichever readiness checks applied to it.
    pub bootable_time: Option<DateTime<Utc>>,
}

/// SSH reachability timestamps for instances polled over SSH.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SshReadiness {
    /// First successful SSH response via the internal address.
    pub ssh_internal_time: Option<DateTime<Utc>>,
    /// First successful SSH response via the public address.
    pub ssh_external_time: Option<DateTime<Utc>>,
}

/// Teardown timestamps, stamped by the instance's own delete operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteTimeline {
    pub delete_start_time: Option<DateTime<Utc>>,
    pub delete_end_time: Option<DateTime<Utc>>,
}

/// One provisioned compute node under measurement.
///
/// The aggregator reads timeline snapshots; the operation runner invokes
/// `reboot`/`delete` concurrently, one task per instance. Each task touches
/// only its own instance, so implementations need interior mutability only
/// for their own delete stamps.
#[async_trait]
pub trait ClusterInstance: Send + Sync {
    fn name(&self) -> &str;

    /// Provider OS tag, e.g. "ubuntu2204" or "windows2022".
    fn os_type(&self) -> &str;

    /// Snapshot of the boot timestamps recorded so far.
    fn boot_timeline(&self) -> BootTimeline;

    /// SSH reachability timestamps, or `None` for instances that are never
    /// polled over SSH. Capability is queried here rather than via a
    /// concrete-type check so new instance kinds can opt in freely.
    fn ssh_readiness(&self) -> Option<SshReadiness> {
        None
    }

    /// Reboot the instance, returning the self-measured reboot duration.
    async fn reboot(&self) -> Result<Duration>;

    /// Delete the instance, stamping its [`DeleteTimeline`] on the way.
    async fn delete(&self) -> Result<()>;

    /// Snapshot of the teardown timestamps stamped by `delete`.
    fn delete_timeline(&self) -> DeleteTimeline {
        DeleteTimeline::default()
    }
}
