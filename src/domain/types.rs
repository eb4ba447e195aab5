use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A controllable energy source the arbitration engine can recommend.
///
/// Ordering between sources is never implicit; the operator's
/// `priority_order` is the only ranking that matters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EnergySource {
    Solar,
    Battery,
    Grid,
}

impl EnergySource {
    /// All sources, in the default priority order.
    pub const ALL: [EnergySource; 3] =
        [EnergySource::Solar, EnergySource::Battery, EnergySource::Grid];
}

/// What is observably supplying the load right now.
///
/// Unlike a recommendation this can be `Mixed`: several flows above the
/// deadband at the same instant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ActiveSource {
    Solar,
    Battery,
    Grid,
    Mixed,
}

impl From<EnergySource> for ActiveSource {
    fn from(source: EnergySource) -> Self {
        match source {
            EnergySource::Solar => ActiveSource::Solar,
            EnergySource::Battery => ActiveSource::Battery,
            EnergySource::Grid => ActiveSource::Grid,
        }
    }
}

/// Operator-selected management mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ManagementMode {
    Manual,
    Automatic,
}

/// Connection status of an inverter in the registry.
///
/// Only `Connected` inverters contribute to fleet aggregation; the others
/// are excluded entirely, not zeroed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum InverterStatus {
    Connected,
    Disconnected,
    Error,
}
