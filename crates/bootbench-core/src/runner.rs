use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::debug;

use bootbench_common::{BootBenchError, Result, Sample};

use crate::config::MeasurementFlags;
use crate::instance::{delta_seconds, ClusterInstance};

/// Lifecycle operation fanned out across the whole fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Reboot,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Reboot => write!(f, "Reboot"),
            Operation::Delete => write!(f, "Delete"),
        }
    }
}

/// Flag-gated measurement phase run after the fleet has booted.
///
/// Currently this covers the optional reboot measurement; boot samples and
/// delete samples are produced by the harness calling [`boot_time_samples`]
/// and [`measure_delete`] at the appropriate phases of the run.
///
/// [`boot_time_samples`]: crate::boot_time_samples
pub async fn run(
    instances: &[Arc<dyn ClusterInstance>],
    flags: MeasurementFlags,
) -> Result<Vec<Sample>> {
    if flags.measure_reboot {
        measure_reboot(instances).await
    } else {
        Ok(Vec::new())
    }
}

/// Reboot every instance concurrently and measure the durations.
///
/// Per-instance values are the reboot times the instances measure for
/// themselves. The cluster value is the wall-clock span from just before
/// fan-out until every task has returned, which captures the true
/// end-to-end cost of the concurrent reboot rather than the slowest
/// instance's self-reported time.
pub async fn measure_reboot(instances: &[Arc<dyn ClusterInstance>]) -> Result<Vec<Sample>> {
    if instances.is_empty() {
        return Ok(Vec::new());
    }

    debug!(num_vms = instances.len(), "rebooting fleet");
    let before_reboot = Instant::now();

    let mut tasks = Vec::with_capacity(instances.len());
    for instance in instances {
        let instance = Arc::clone(instance);
        tasks.push(tokio::spawn(async move { instance.reboot().await }));
    }
    let joined = futures::future::try_join_all(tasks)
        .await
        .map_err(|e| BootBenchError::TaskJoin(e.to_string()))?;
    let cluster_reboot_sec = before_reboot.elapsed().as_secs_f64();

    let mut reboot_times_sec = Vec::with_capacity(joined.len());
    for result in joined {
        reboot_times_sec.push(result?.as_secs_f64());
    }

    Ok(operation_samples(
        Operation::Reboot,
        &reboot_times_sec,
        cluster_reboot_sec,
        instances,
    ))
}

/// Delete every instance concurrently and measure the durations.
///
/// Each delete task stamps its own start and end timestamps, so both the
/// per-instance durations and the cluster duration come from those stamps:
/// the cluster value is the latest `delete_end_time` minus the moment the
/// fan-out began. A successful delete that left its timeline unstamped is
/// an upstream defect and fails the whole call.
pub async fn measure_delete(instances: &[Arc<dyn ClusterInstance>]) -> Result<Vec<Sample>> {
    if instances.is_empty() {
        return Ok(Vec::new());
    }

    debug!(num_vms = instances.len(), "deleting fleet");
    let before_delete = Utc::now();

    let mut tasks = Vec::with_capacity(instances.len());
    for instance in instances {
        let instance = Arc::clone(instance);
        tasks.push(tokio::spawn(async move { instance.delete().await }));
    }
    let joined = futures::future::try_join_all(tasks)
        .await
        .map_err(|e| BootBenchError::TaskJoin(e.to_string()))?;
    for result in joined {
        result?;
    }

    let mut delete_times_sec = Vec::with_capacity(instances.len());
    let mut max_delete_end: Option<chrono::DateTime<Utc>> = None;
    for instance in instances {
        let timeline = instance.delete_timeline();
        let delete_start = timeline.delete_start_time.ok_or_else(|| {
            missing(instance.as_ref(), "delete_start_time")
        })?;
        let delete_end = timeline.delete_end_time.ok_or_else(|| {
            missing(instance.as_ref(), "delete_end_time")
        })?;
        if delete_end < delete_start {
            return Err(BootBenchError::TimestampOrder {
                instance: instance.name().to_string(),
                field: "delete_end_time",
            });
        }
        delete_times_sec.push(delta_seconds(delete_end - delete_start));
        max_delete_end = Some(match max_delete_end {
            Some(end) => end.max(delete_end),
            None => delete_end,
        });
    }
    // The fleet is non-empty, so a latest end exists.
    let cluster_delete_sec = max_delete_end
        .map(|end| delta_seconds(end - before_delete))
        .unwrap_or_default();

    Ok(operation_samples(
        Operation::Delete,
        &delete_times_sec,
        cluster_delete_sec,
        instances,
    ))
}

fn missing(instance: &dyn ClusterInstance, field: &'static str) -> BootBenchError {
    BootBenchError::MissingTimestamp {
        instance: instance.name().to_string(),
        field,
    }
}

/// Build one "{Operation} Time" sample per instance plus the cluster
/// aggregate, in instance input order.
fn operation_samples(
    operation: Operation,
    operation_times_sec: &[f64],
    cluster_time_sec: f64,
    instances: &[Arc<dyn ClusterInstance>],
) -> Vec<Sample> {
    let mut samples = Vec::with_capacity(operation_times_sec.len() + 1);
    for (i, (operation_time, instance)) in
        operation_times_sec.iter().zip(instances).enumerate()
    {
        let mut metadata = HashMap::new();
        metadata.insert("machine_instance".to_string(), i.to_string());
        metadata.insert("num_vms".to_string(), instances.len().to_string());
        metadata.insert("os_type".to_string(), instance.os_type().to_string());
        samples.push(Sample::seconds(
            format!("{operation} Time"),
            *operation_time,
            metadata,
        ));
    }

    let os_types: BTreeSet<&str> = instances.iter().map(|vm| vm.os_type()).collect();
    let mut metadata = HashMap::new();
    metadata.insert("num_vms".to_string(), instances.len().to_string());
    metadata.insert(
        "os_type".to_string(),
        os_types.into_iter().collect::<Vec<_>>().join(","),
    );
    samples.push(Sample::seconds(
        format!("Cluster {operation} Time"),
        cluster_time_sec,
        metadata,
    ));
    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_display_matches_sample_names() {
        assert_eq!(Operation::Reboot.to_string(), "Reboot");
        assert_eq!(Operation::Delete.to_string(), "Delete");
    }
}
