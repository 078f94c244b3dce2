//! Telemetry probe ports: one query per observable device field.
//!
//! Probes may be slow or never answer; the collector bounds every call with
//! a timeout, so implementations do not need their own.

use std::future::Future;

use autopilot_domain::error::ProbeError;
use autopilot_domain::snapshot::NetworkType;

/// Reads the battery charge.
pub trait BatteryProbe {
    /// Current charge as a raw percentage.
    ///
    /// Values above 100 are rejected by the collector as malformed.
    fn battery_percentage(&self) -> impl Future<Output = Result<u8, ProbeError>> + Send;
}

/// Reads the kind of network connection.
pub trait NetworkProbe {
    /// Current connection type. Returning [`NetworkType::Unknown`] is allowed
    /// but callers treat it the same as an error.
    fn network_type(&self) -> impl Future<Output = Result<NetworkType, ProbeError>> + Send;
}

impl<T: BatteryProbe + Send + Sync> BatteryProbe for std::sync::Arc<T> {
    fn battery_percentage(&self) -> impl Future<Output = Result<u8, ProbeError>> + Send {
        (**self).battery_percentage()
    }
}

impl<T: NetworkProbe + Send + Sync> NetworkProbe for std::sync::Arc<T> {
    fn network_type(&self) -> impl Future<Output = Result<NetworkType, ProbeError>> + Send {
        (**self).network_type()
    }
}
