use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use bootbench_common::{BootBenchError, Result, Sample};

use crate::config::MeasurementFlags;
use crate::instance::{delta_seconds, ClusterInstance};

/// Largest tolerated skew between the first and last create call. Above
/// this, cluster-relative metrics include a visible amount of start skew
/// and an advisory warning is logged.
const CREATE_DELAY_WARN_SEC: f64 = 1.0;

/// Compute per-instance and cluster-wide boot timing samples.
///
/// All cluster-relative metrics are measured against the earliest
/// `create_start_time` in the fleet, so instances whose create calls were
/// issued late carry their delay inside their reported times. The one
/// exception is "Time to Running", which is measured against the instance's
/// own create start to isolate provisioning latency from start skew.
///
/// Per-instance samples are emitted in input order, cluster aggregates
/// last. An instance missing a required timestamp (or one demanded by an
/// enabled flag) fails the whole computation: dropping it instead would
/// bias every cluster aggregate computed from an incomplete fleet.
pub fn boot_time_samples(
    instances: &[Arc<dyn ClusterInstance>],
    flags: MeasurementFlags,
) -> Result<Vec<Sample>> {
    if instances.is_empty() {
        return Ok(Vec::new());
    }

    // Validate the whole fleet up front and establish the reference time.
    let mut reference_time = DateTime::<Utc>::MAX_UTC;
    let mut validated = Vec::with_capacity(instances.len());
    for instance in instances {
        let timeline = instance.boot_timeline();
        let create_start = timeline
            .create_start_time
            .ok_or_else(|| missing(instance.as_ref(), "create_start_time"))?;
        let bootable = timeline
            .bootable_time
            .ok_or_else(|| missing(instance.as_ref(), "bootable_time"))?;
        if bootable < create_start {
            return Err(out_of_order(instance.as_ref(), "bootable_time"));
        }
        reference_time = reference_time.min(create_start);
        validated.push((create_start, bootable));
    }

    let mut samples = Vec::new();
    let mut os_types = BTreeSet::new();
    let mut max_create_delay_sec: f64 = 0.0;
    let mut max_boot_time_sec: f64 = 0.0;
    let mut max_port_listening_sec: f64 = 0.0;
    let mut max_rdp_port_listening_sec: f64 = 0.0;

    for (i, (instance, &(create_start, bootable))) in
        instances.iter().zip(validated.iter()).enumerate()
    {
        let timeline = instance.boot_timeline();

        os_types.insert(instance.os_type().to_string());
        let create_delay_sec = seconds_between(reference_time, create_start);
        max_create_delay_sec = max_create_delay_sec.max(create_delay_sec);

        let mut metadata = HashMap::new();
        metadata.insert("machine_instance".to_string(), i.to_string());
        metadata.insert("num_vms".to_string(), instances.len().to_string());
        metadata.insert("os_type".to_string(), instance.os_type().to_string());
        metadata.insert(
            "create_delay_sec".to_string(),
            format!("{create_delay_sec:.1}"),
        );

        if let Some(create_return) = timeline.create_return_time {
            samples.push(Sample::seconds(
                "Time to Create Async Return",
                seconds_between(reference_time, create_return),
                metadata.clone(),
            ));
        }

        if let Some(is_running) = timeline.is_running_time {
            // Deliberately instance-relative, not cluster-relative.
            samples.push(Sample::seconds(
                "Time to Running",
                seconds_between(create_start, is_running),
                metadata.clone(),
            ));
        }

        if let Some(ssh) = instance.ssh_readiness() {
            if let Some(ssh_external) = ssh.ssh_external_time {
                samples.push(Sample::seconds(
                    "Time to SSH - External",
                    seconds_between(reference_time, ssh_external),
                    metadata.clone(),
                ));
            }
            if let Some(ssh_internal) = ssh.ssh_internal_time {
                samples.push(Sample::seconds(
                    "Time to SSH - Internal",
                    seconds_between(reference_time, ssh_internal),
                    metadata.clone(),
                ));
            }
        }

        let boot_time_sec = seconds_between(reference_time, bootable);
        max_boot_time_sec = max_boot_time_sec.max(boot_time_sec);
        samples.push(Sample::seconds("Boot Time", boot_time_sec, metadata.clone()));

        if flags.test_port_listening {
            let port_listening = timeline
                .port_listening_time
                .ok_or_else(|| missing(instance.as_ref(), "port_listening_time"))?;
            if port_listening < create_start {
                return Err(out_of_order(instance.as_ref(), "port_listening_time"));
            }
            let port_listening_sec = seconds_between(reference_time, port_listening);
            max_port_listening_sec = max_port_listening_sec.max(port_listening_sec);
            samples.push(Sample::seconds(
                "Port Listening Time",
                port_listening_sec,
                metadata.clone(),
            ));
        }

        if flags.test_rdp_port_listening {
            let rdp_listening = timeline
                .rdp_port_listening_time
                .ok_or_else(|| missing(instance.as_ref(), "rdp_port_listening_time"))?;
            if rdp_listening < create_start {
                return Err(out_of_order(instance.as_ref(), "rdp_port_listening_time"));
            }
            let rdp_listening_sec = seconds_between(reference_time, rdp_listening);
            max_rdp_port_listening_sec = max_rdp_port_listening_sec.max(rdp_listening_sec);
            samples.push(Sample::seconds(
                "RDP Port Listening Time",
                rdp_listening_sec,
                metadata,
            ));
        }
    }

    let mut metadata = HashMap::new();
    metadata.insert("num_vms".to_string(), instances.len().to_string());
    metadata.insert(
        "os_type".to_string(),
        os_types.into_iter().collect::<Vec<_>>().join(","),
    );
    metadata.insert(
        "max_create_delay_sec".to_string(),
        format!("{max_create_delay_sec:.1}"),
    );

    samples.push(Sample::seconds(
        "Cluster Boot Time",
        max_boot_time_sec,
        metadata.clone(),
    ));
    if flags.test_port_listening {
        samples.push(Sample::seconds(
            "Cluster Port Listening Time",
            max_port_listening_sec,
            metadata.clone(),
        ));
    }
    if flags.test_rdp_port_listening {
        samples.push(Sample::seconds(
            "Cluster RDP Port Listening Time",
            max_rdp_port_listening_sec,
            metadata,
        ));
    }

    if max_create_delay_sec > CREATE_DELAY_WARN_SEC {
        warn!(
            max_create_delay_sec,
            "create calls were not issued near-simultaneously; \
             cluster-relative metrics include start skew"
        );
    }

    Ok(samples)
}

fn seconds_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    delta_seconds(later - earlier)
}

fn missing(instance: &dyn ClusterInstance, field: &'static str) -> BootBenchError {
    BootBenchError::MissingTimestamp {
        instance: instance.name().to_string(),
        field,
    }
}

fn out_of_order(instance: &dyn ClusterInstance, field: &'static str) -> BootBenchError {
    BootBenchError::TimestampOrder {
        instance: instance.name().to_string(),
        field,
    }
}
