//! Static dispatch over the configured telemetry backend.

use autopilot_adapter_termux::{TermuxBatteryProbe, TermuxNetworkProbe};
use autopilot_adapter_virtual::VirtualDevice;
use autopilot_app::ports::{BatteryProbe, NetworkProbe};
use autopilot_domain::error::ProbeError;
use autopilot_domain::snapshot::NetworkType;

use crate::config::{ProbeBackend, ProbesConfig};

pub enum Battery {
    Termux(TermuxBatteryProbe),
    Virtual(VirtualDevice),
}

pub enum Network {
    Termux(TermuxNetworkProbe),
    Virtual(VirtualDevice),
}

impl BatteryProbe for Battery {
    async fn battery_percentage(&self) -> Result<u8, ProbeError> {
        match self {
            Self::Termux(probe) => probe.battery_percentage().await,
            Self::Virtual(device) => device.battery_percentage().await,
        }
    }
}

impl NetworkProbe for Network {
    async fn network_type(&self) -> Result<NetworkType, ProbeError> {
        match self {
            Self::Termux(probe) => probe.network_type().await,
            Self::Virtual(device) => device.network_type().await,
        }
    }
}

/// Build the battery and network probes selected by `config.kind`.
pub fn build(config: &ProbesConfig) -> (Battery, Network) {
    match config.kind {
        ProbeBackend::Termux => (
            Battery::Termux(TermuxBatteryProbe::new(config.battery_command.clone())),
            Network::Termux(TermuxNetworkProbe::new(config.network_command.clone())),
        ),
        ProbeBackend::Virtual => {
            let device = VirtualDevice::new(config.scripted.battery, config.scripted.network);
            (Battery::Virtual(device.clone()), Network::Virtual(device))
        }
    }
}
