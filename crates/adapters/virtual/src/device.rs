//! Scripted device: telemetry readings that tests and demos can change at
//! runtime.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use autopilot_app::ports::{BatteryProbe, NetworkProbe};
use autopilot_domain::error::ProbeError;
use autopilot_domain::snapshot::NetworkType;

/// What a probe answers with on its next call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reading<T> {
    /// Answer with this value.
    Value(T),
    /// Answer with this error.
    Fail(ProbeError),
    /// Never answer.
    Hang,
}

#[derive(Debug)]
struct Readings {
    battery: Reading<u8>,
    network: Reading<NetworkType>,
    latency: Duration,
}

/// A simulated device exposing battery and network telemetry.
///
/// Clones share the same readings, so one handle can drive the loop while
/// another changes what it sees.
#[derive(Debug, Clone)]
pub struct VirtualDevice {
    readings: Arc<Mutex<Readings>>,
}

impl Default for VirtualDevice {
    /// A healthy device: 100 % battery on wifi.
    fn default() -> Self {
        Self::new(Some(100), NetworkType::Wifi)
    }
}

impl VirtualDevice {
    /// A device reporting `battery` percent (or failing the battery probe
    /// when `None`) and the given network type.
    #[must_use]
    pub fn new(battery: Option<u8>, network: NetworkType) -> Self {
        let battery = battery.map_or(Reading::Fail(ProbeError::Unavailable), Reading::Value);
        let network = match network {
            NetworkType::Unknown => Reading::Fail(ProbeError::Unavailable),
            known => Reading::Value(known),
        };
        Self {
            readings: Arc::new(Mutex::new(Readings {
                battery,
                network,
                latency: Duration::ZERO,
            })),
        }
    }

    pub fn set_battery(&self, reading: Reading<u8>) {
        self.with(|r| r.battery = reading);
    }

    pub fn set_network(&self, reading: Reading<NetworkType>) {
        self.with(|r| r.network = reading);
    }

    /// Delay every answer by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.with(|r| r.latency = latency);
    }

    fn with<T>(&self, f: impl FnOnce(&mut Readings) -> T) -> T {
        // The readings stay consistent even if a holder panicked.
        let mut guard = self.readings.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    async fn answer<T: Clone>(&self, pick: impl FnOnce(&Readings) -> Reading<T>) -> Result<T, ProbeError> {
        let (reading, latency) = self.with(|r| (pick(r), r.latency));
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        match reading {
            Reading::Value(value) => Ok(value),
            Reading::Fail(error) => Err(error),
            Reading::Hang => std::future::pending().await,
        }
    }
}

impl BatteryProbe for VirtualDevice {
    async fn battery_percentage(&self) -> Result<u8, ProbeError> {
        let answer = self.answer(|r| r.battery.clone()).await;
        tracing::trace!(?answer, "virtual battery probe");
        answer
    }
}

impl NetworkProbe for VirtualDevice {
    async fn network_type(&self) -> Result<NetworkType, ProbeError> {
        let answer = self.answer(|r| r.network.clone()).await;
        tracing::trace!(?answer, "virtual network probe");
        answer
    }
}
