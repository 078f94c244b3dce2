//! Battery probe backed by `termux-battery-status`.

use serde::Deserialize;

use autopilot_app::ports::BatteryProbe;
use autopilot_domain::error::ProbeError;

use crate::command::CommandLine;
use crate::error::TermuxError;

/// The part of `termux-battery-status` output the probe relies on.
///
/// ```json
/// { "health": "GOOD", "percentage": 15, "plugged": "UNPLUGGED", "status": "DISCHARGING" }
/// ```
#[derive(Debug, Deserialize)]
struct BatteryStatus {
    percentage: i64,
}

/// Reads the battery charge through a termux command.
#[derive(Debug, Clone)]
pub struct TermuxBatteryProbe {
    command: CommandLine,
}

impl Default for TermuxBatteryProbe {
    fn default() -> Self {
        Self::new(CommandLine::new("termux-battery-status"))
    }
}

impl TermuxBatteryProbe {
    #[must_use]
    pub fn new(command: CommandLine) -> Self {
        Self { command }
    }

    async fn read(&self) -> Result<u8, TermuxError> {
        let status: BatteryStatus = self.command.json().await?;
        u8::try_from(status.percentage)
            .ok()
            .filter(|pct| *pct <= 100)
            .ok_or_else(|| TermuxError::OutOfRange {
                command: self.command.to_string(),
                field: "percentage",
                value: status.percentage,
            })
    }
}

impl BatteryProbe for TermuxBatteryProbe {
    async fn battery_percentage(&self) -> Result<u8, ProbeError> {
        self.read().await.map_err(ProbeError::from)
    }
}
