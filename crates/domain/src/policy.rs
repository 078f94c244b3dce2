//! Baseline policy: the battery and network rules the daemon ships with.
//!
//! These are ordinary [`Rule`] values; nothing in the engine knows about them.

use crate::action::ActionTag;
use crate::error::ValidationError;
use crate::rule::{Rule, RuleSet};
use crate::snapshot::NetworkType;

/// Default battery percentage below which power saving kicks in.
pub const DEFAULT_BATTERY_LOW_THRESHOLD: u8 = 20;

/// `battery`: enable power saving while the known level is below `threshold`.
///
/// An unknown battery level never triggers.
///
/// # Errors
///
/// Only fails if the rule definition itself is invalid.
pub fn battery_rule(threshold: u8) -> Result<Rule, ValidationError> {
    Rule::builder()
        .id("battery")
        .predicate(move |snapshot| Ok(snapshot.battery_level.is_below(threshold)))
        .action(ActionTag::PowerSave)
        .build()
}

/// `network`: permit heavy work on wifi, defer it on anything else.
///
/// # Errors
///
/// Only fails if the rule definition itself is invalid.
pub fn network_rule() -> Result<Rule, ValidationError> {
    Rule::builder()
        .id("network")
        .predicate(|snapshot| Ok(snapshot.network_type == NetworkType::Wifi))
        .action(ActionTag::PermitHeavyTask)
        .otherwise(ActionTag::DeferHeavyTask)
        .build()
}

/// The baseline rule set, in evaluation order: `battery`, then `network`.
///
/// # Errors
///
/// Only fails if a rule definition is invalid.
pub fn baseline(battery_low_threshold: u8) -> Result<RuleSet, ValidationError> {
    RuleSet::new(vec![battery_rule(battery_low_threshold)?, network_rule()?])
}
