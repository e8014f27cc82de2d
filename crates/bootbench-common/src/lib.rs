// Shared data model for cluster boot measurement: the sample record handed
// to reporting sinks, and the workspace-wide error type.

use std::collections::HashMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unit string carried by every timing sample.
pub const SECONDS: &str = "seconds";

#[derive(Error, Debug)]
pub enum BootBenchError {
    #[error("instance '{instance}' is missing required timestamp '{field}'")]
    MissingTimestamp {
        instance: String,
        field: &'static str,
    },

    #[error("instance '{instance}': timestamp '{field}' is out of order")]
    TimestampOrder {
        instance: String,
        field: &'static str,
    },

    #[error("{operation} failed on instance '{instance}': {message}")]
    Operation {
        operation: String,
        instance: String,
        message: String,
    },

    #[error("operation task failed to join: {0}")]
    TaskJoin(String),
}

// Define the primary Result type for measurement operations
pub type Result<T> = std::result::Result<T, BootBenchError>;

/// One named measurement produced by the engine.
///
/// Samples are constructed once and never mutated; downstream reporting
/// (storage, formatting, transmission) is out of scope here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub metric: String,
    pub value: f64,
    pub unit: String,
    pub metadata: HashMap<String, String>,
}

impl Sample {
    /// Construct a sample measured in seconds.
    pub fn seconds(
        metric: impl Into<String>,
        value: f64,
        metadata: HashMap<String, String>,
    ) -> Self {
        Self {
            metric: metric.into(),
            value,
            unit: SECONDS.to_string(),
            metadata,
        }
    }
}

impl Display for Sample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:.3} {}", self.metric, self.value, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_sample_carries_fixed_unit() {
        let sample = Sample::seconds("Boot Time", 12.5, HashMap::new());
        assert_eq!(sample.unit, SECONDS);
        assert_eq!(sample.metric, "Boot Time");
        assert_eq!(sample.value, 12.5);
    }

    #[test]
    fn sample_round_trips_through_json() {
        let mut metadata = HashMap::new();
        metadata.insert("num_vms".to_string(), "3".to_string());
        let sample = Sample::seconds("Cluster Boot Time", 13.0, metadata);

        let encoded = serde_json::to_string(&sample).unwrap();
        let decoded: Sample = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, sample);
    }

    #[test]
    fn error_display_names_instance_and_field() {
        let err = BootBenchError::MissingTimestamp {
            instance: "vm-0".to_string(),
            field: "bootable_time",
        };
        assert_eq!(
            err.to_string(),
            "instance 'vm-0' is missing required timestamp 'bootable_time'"
        );
    }
}
