//! Telemetry collector: turns probe answers into a [`SystemSnapshot`].
//!
//! Both probes run concurrently and each is bounded by the same timeout.
//! A probe that fails, times out or is abandoned on shutdown contributes
//! its documented default (`unknown`) and a [`ProbeFailure`]; collection
//! as a whole never fails.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use autopilot_domain::error::ProbeError;
use autopilot_domain::snapshot::{BatteryLevel, NetworkType, SystemSnapshot};

use crate::ports::{BatteryProbe, NetworkProbe};
use crate::shutdown::Shutdown;

/// Which probe a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    Battery,
    Network,
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Battery => "battery",
            Self::Network => "network",
        })
    }
}

/// A probe that did not contribute a real reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeFailure {
    pub probe: ProbeKind,
    pub error: ProbeError,
}

/// Result of one collection: always a snapshot, plus any partial failures.
#[derive(Debug, Clone)]
pub struct Collection {
    pub snapshot: SystemSnapshot,
    pub failures: Vec<ProbeFailure>,
}

impl Collection {
    /// `true` when at least one field fell back to its default.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Gathers telemetry from a battery probe and a network probe.
pub struct TelemetryCollector<B, N> {
    battery: B,
    network: N,
}

impl<B, N> TelemetryCollector<B, N>
where
    B: BatteryProbe,
    N: NetworkProbe,
{
    /// Create a new collector over the given probes.
    pub fn new(battery: B, network: N) -> Self {
        Self { battery, network }
    }

    /// Query both probes and assemble a snapshot.
    ///
    /// Returns within `timeout` (plus scheduling slack) even if a probe never
    /// answers, and immediately once `shutdown` is triggered.
    pub async fn collect(&self, timeout: Duration, shutdown: &Shutdown) -> Collection {
        let (battery, network) = tokio::join!(
            bounded(self.battery.battery_percentage(), timeout, shutdown),
            bounded(self.network.network_type(), timeout, shutdown),
        );

        let mut failures = Vec::new();

        let battery_level = match battery
            .and_then(|pct| BatteryLevel::percent(i64::from(pct)).map_err(malformed))
        {
            Ok(level) => level,
            Err(error) => {
                failures.push(ProbeFailure {
                    probe: ProbeKind::Battery,
                    error,
                });
                BatteryLevel::Unknown
            }
        };

        let network_type = match network {
            Ok(NetworkType::Unknown) => {
                failures.push(ProbeFailure {
                    probe: ProbeKind::Network,
                    error: ProbeError::Unavailable,
                });
                NetworkType::Unknown
            }
            Ok(kind) => kind,
            Err(error) => {
                failures.push(ProbeFailure {
                    probe: ProbeKind::Network,
                    error,
                });
                NetworkType::Unknown
            }
        };

        for failure in &failures {
            if failure.error == ProbeError::Cancelled {
                tracing::debug!(probe = %failure.probe, "probe abandoned on shutdown");
            } else {
                tracing::warn!(
                    probe = %failure.probe,
                    error = %failure.error,
                    "telemetry unavailable, using default"
                );
            }
        }

        let snapshot = SystemSnapshot::builder()
            .battery_level(battery_level)
            .network_type(network_type)
            .build();

        tracing::debug!(
            battery = %snapshot.battery_level,
            network = %snapshot.network_type,
            partial = !failures.is_empty(),
            "telemetry collected"
        );

        Collection { snapshot, failures }
    }
}

fn malformed(err: autopilot_domain::error::ValidationError) -> ProbeError {
    ProbeError::Malformed(err.to_string())
}

/// Await `probe` for at most `timeout`, giving up early on shutdown.
async fn bounded<T>(
    probe: impl Future<Output = Result<T, ProbeError>>,
    timeout: Duration,
    shutdown: &Shutdown,
) -> Result<T, ProbeError> {
    tokio::select! {
        biased;
        () = shutdown.triggered() => Err(ProbeError::Cancelled),
        result = tokio::time::timeout(timeout, probe) => match result {
            Ok(answer) => answer,
            Err(_elapsed) => Err(ProbeError::TimedOut(timeout)),
        },
    }
}
