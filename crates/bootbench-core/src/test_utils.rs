//! Test doubles for exercising the aggregator and runner without real
//! infrastructure.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

use bootbench_common::{BootBenchError, Result};

use crate::instance::{BootTimeline, ClusterInstance, DeleteTimeline, SshReadiness};
use crate::runner::Operation;

/// Fixed epoch used by tests to build absolute timestamps from offsets.
pub fn base_time() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

/// Timestamp at `offset_ms` milliseconds past [`base_time`].
pub fn at_ms(offset_ms: i64) -> DateTime<Utc> {
    base_time() + TimeDelta::milliseconds(offset_ms)
}

/// Timestamp at `offset_sec` whole seconds past [`base_time`].
pub fn at(offset_sec: i64) -> DateTime<Utc> {
    at_ms(offset_sec * 1000)
}

/// A scriptable [`ClusterInstance`] with pre-baked timelines.
///
/// Reboot reports a configured duration (optionally taking real wall-clock
/// time to do so), delete stamps a configured window relative to the moment
/// it is invoked, and either operation can be made to fail.
pub struct FakeInstance {
    name: String,
    os_type: String,
    boot: BootTimeline,
    ssh: Option<SshReadiness>,
    reported_reboot: Duration,
    reboot_latency: Duration,
    delete_window: Option<(Duration, Duration)>,
    fail_operations: bool,
    delete_timeline: Mutex<DeleteTimeline>,
}

impl FakeInstance {
    pub fn new(name: &str, os_type: &str) -> Self {
        Self {
            name: name.to_string(),
            os_type: os_type.to_string(),
            boot: BootTimeline::default(),
            ssh: None,
            reported_reboot: Duration::ZERO,
            reboot_latency: Duration::ZERO,
            delete_window: Some((Duration::ZERO, Duration::ZERO)),
            fail_operations: false,
            delete_timeline: Mutex::new(DeleteTimeline::default()),
        }
    }

    /// Shorthand for the common case: created at `create_start_sec` and
    /// bootable at `bootable_sec`, both offsets from [`base_time`].
    pub fn booted(name: &str, os_type: &str, create_start_sec: i64, bootable_sec: i64) -> Self {
        Self::new(name, os_type).with_boot_timeline(BootTimeline {
            create_start_time: Some(at(create_start_sec)),
            bootable_time: Some(at(bootable_sec)),
            ..BootTimeline::default()
        })
    }

    pub fn with_boot_timeline(mut self, boot: BootTimeline) -> Self {
        self.boot = boot;
        self
    }

    pub fn with_ssh_readiness(mut self, ssh: SshReadiness) -> Self {
        self.ssh = Some(ssh);
        self
    }

    /// Duration the instance reports for its own reboot.
    pub fn with_reported_reboot(mut self, reported: Duration) -> Self {
        self.reported_reboot = reported;
        self
    }

    /// Real wall-clock time the fake reboot takes before returning.
    pub fn with_reboot_latency(mut self, latency: Duration) -> Self {
        self.reboot_latency = latency;
        self
    }

    /// Delete stamps `start = now + delay` and `end = start + duration`.
    pub fn with_delete_window(mut self, delay: Duration, duration: Duration) -> Self {
        self.delete_window = Some((delay, duration));
        self
    }

    /// Delete succeeds but leaves the delete timeline unstamped.
    pub fn without_delete_stamps(mut self) -> Self {
        self.delete_window = None;
        self
    }

    /// Both lifecycle operations fail with an operation error.
    pub fn failing(mut self) -> Self {
        self.fail_operations = true;
        self
    }

    fn operation_error(&self, operation: Operation) -> BootBenchError {
        BootBenchError::Operation {
            operation: operation.to_string(),
            instance: self.name.clone(),
            message: "injected failure".to_string(),
        }
    }
}

#[async_trait]
impl ClusterInstance for FakeInstance {
    fn name(&self) -> &str {
        &self.name
    }

    fn os_type(&self) -> &str {
        &self.os_type
    }

    fn boot_timeline(&self) -> BootTimeline {
        self.boot
    }

    fn ssh_readiness(&self) -> Option<SshReadiness> {
        self.ssh
    }

    async fn reboot(&self) -> Result<Duration> {
        if self.fail_operations {
            return Err(self.operation_error(Operation::Reboot));
        }
        if !self.reboot_latency.is_zero() {
            tokio::time::sleep(self.reboot_latency).await;
        }
        Ok(self.reported_reboot)
    }

    async fn delete(&self) -> Result<()> {
        if self.fail_operations {
            return Err(self.operation_error(Operation::Delete));
        }
        if let Some((delay, duration)) = self.delete_window {
            let delete_start = Utc::now()
                + TimeDelta::from_std(delay).unwrap_or_else(|_| TimeDelta::zero());
            let delete_end = delete_start
                + TimeDelta::from_std(duration).unwrap_or_else(|_| TimeDelta::zero());
            let mut timeline = self
                .delete_timeline
                .lock()
                .expect("delete timeline lock poisoned");
            timeline.delete_start_time = Some(delete_start);
            timeline.delete_end_time = Some(delete_end);
        }
        Ok(())
    }

    fn delete_timeline(&self) -> DeleteTimeline {
        *self
            .delete_timeline
            .lock()
            .expect("delete timeline lock poisoned")
    }
}
