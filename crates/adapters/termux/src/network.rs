//! Network probe backed by `termux-wifi-connectioninfo`.

use serde::Deserialize;

use autopilot_app::ports::NetworkProbe;
use autopilot_domain::error::ProbeError;
use autopilot_domain::snapshot::NetworkType;

use crate::command::CommandLine;
use crate::error::TermuxError;

/// Supplicant state reported while associated with an access point.
const CONNECTED: &str = "COMPLETED";

#[derive(Debug, Deserialize)]
struct WifiConnectionInfo {
    #[serde(default)]
    supplicant_state: Option<String>,
}

/// Distinguishes wifi from mobile data through a termux command.
///
/// Any answer other than an established wifi association is reported as
/// mobile; a command that cannot run or prints nothing is a probe failure.
#[derive(Debug, Clone)]
pub struct TermuxNetworkProbe {
    command: CommandLine,
}

impl Default for TermuxNetworkProbe {
    fn default() -> Self {
        Self::new(CommandLine::new("termux-wifi-connectioninfo"))
    }
}

impl TermuxNetworkProbe {
    #[must_use]
    pub fn new(command: CommandLine) -> Self {
        Self { command }
    }

    async fn read(&self) -> Result<NetworkType, TermuxError> {
        let info: WifiConnectionInfo = self.command.json().await?;
        Ok(match info.supplicant_state.as_deref() {
            Some(CONNECTED) => NetworkType::Wifi,
            _ => NetworkType::Mobile,
        })
    }
}

impl NetworkProbe for TermuxNetworkProbe {
    async fn network_type(&self) -> Result<NetworkType, ProbeError> {
        self.read().await.map_err(ProbeError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(output: &str) -> TermuxNetworkProbe {
        TermuxNetworkProbe::new(
            CommandLine::new("sh")
                .arg("-c")
                .arg(format!("printf '%s' '{output}'")),
        )
    }

    #[tokio::test]
    async fn should_report_wifi_when_associated() {
        let probe = probe(
            r#"{"bssid":"aa:bb:cc:dd:ee:ff","ip":"192.168.1.20","ssid":"home","supplicant_state":"COMPLETED"}"#,
        );
        assert_eq!(probe.network_type().await, Ok(NetworkType::Wifi));
    }

    #[tokio::test]
    async fn should_report_mobile_when_disconnected() {
        let probe = probe(r#"{"ip":"0.0.0.0","supplicant_state":"DISCONNECTED"}"#);
        assert_eq!(probe.network_type().await, Ok(NetworkType::Mobile));
    }

    #[tokio::test]
    async fn should_report_mobile_without_supplicant_state() {
        let probe = probe("{}");
        assert_eq!(probe.network_type().await, Ok(NetworkType::Mobile));
    }

    #[tokio::test]
    async fn should_fail_on_empty_output() {
        let probe = TermuxNetworkProbe::new(CommandLine::new("true"));
        assert_eq!(probe.network_type().await, Err(ProbeError::Unavailable));
    }

    #[tokio::test]
    async fn should_fail_on_garbage_output() {
        let probe = probe("not json");
        assert!(matches!(
            probe.network_type().await,
            Err(ProbeError::Malformed(_))
        ));
    }
}
