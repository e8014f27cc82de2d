use serde::{Deserialize, Serialize};

/// Toggles for the optional measurements.
///
/// Passed explicitly into the aggregator and runner entry points so both
/// stay pure and independently testable; nothing here is read from ambient
/// global state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementFlags {
    /// Measure the time until the remote-command port accepts connections.
    /// When set, `port_listening_time` becomes a required timestamp.
    pub test_port_listening: bool,
    /// Measure the time until the RDP port accepts connections. When set,
    /// `rdp_port_listening_time` becomes a required timestamp.
    pub test_rdp_port_listening: bool,
    /// Reboot the fleet after boot and measure reboot performance.
    pub measure_reboot: bool,
}
