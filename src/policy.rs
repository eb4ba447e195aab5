use chrono::{DateTime, NaiveTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{EnergySource, ManagementMode};

/// Wire format for peak-hour boundaries ("17:00").
pub const TIME_OF_DAY_FORMAT: &str = "%H:%M";

/// Errors rejecting an invalid policy update. The update is refused in
/// full; the previously stored configuration stays untouched.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("{field} must be within 0-100%, got {value}")]
    SocOutOfRange { field: &'static str, value: f64 },

    #[error("battery_min_soc_pct ({min}) must be below battery_max_soc_pct ({max})")]
    SocBoundsInverted { min: f64, max: f64 },

    #[error("{field} must not be negative, got {value}")]
    NegativeThreshold { field: &'static str, value: f64 },

    #[error("priority_order must be a permutation of solar, battery, grid: {0}")]
    InvalidPriorityOrder(String),

    #[error("manual_source is required while mode is manual")]
    ManualSourceRequired,

    #[error("{field} is not a valid HH:MM time of day: {value:?}")]
    InvalidTimeOfDay { field: &'static str, value: String },
}

mod hhmm {
    use super::{NaiveTime, TIME_OF_DAY_FORMAT};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(TIME_OF_DAY_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, TIME_OF_DAY_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Operator-owned energy management policy.
///
/// Created with defaults on first boot, then mutated field-by-field from
/// the management UI. Every stored instance has passed [`Self::validate`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnergyManagementConfig {
    pub mode: ManagementMode,
    /// Required while `mode` is manual.
    pub manual_source: Option<EnergySource>,
    /// Evaluation order for automatic arbitration; always a permutation of
    /// the three sources.
    pub priority_order: Vec<EnergySource>,

    // Automatic mode thresholds
    pub battery_min_soc_pct: f64,
    pub battery_max_soc_pct: f64,
    pub solar_min_power_w: f64,
    pub grid_max_import_w: f64,

    // Advanced rules
    pub enable_grid_charging: bool,
    pub enable_grid_export: bool,
    #[serde(with = "hhmm")]
    pub peak_hours_start: NaiveTime,
    #[serde(with = "hhmm")]
    pub peak_hours_end: NaiveTime,
    pub avoid_grid_during_peak: bool,

    pub updated_at: DateTime<Utc>,
}

impl Default for EnergyManagementConfig {
    fn default() -> Self {
        Self {
            mode: ManagementMode::Automatic,
            manual_source: None,
            priority_order: EnergySource::ALL.to_vec(),
            battery_min_soc_pct: 20.0,
            battery_max_soc_pct: 90.0,
            solar_min_power_w: 500.0,
            grid_max_import_w: 5000.0,
            enable_grid_charging: false,
            enable_grid_export: true,
            peak_hours_start: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            peak_hours_end: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            avoid_grid_during_peak: true,
            updated_at: DateTime::UNIX_EPOCH,
        }
    }
}

impl EnergyManagementConfig {
    /// Whole-object validation. Called on every candidate before it can
    /// replace the stored config, so evaluation never sees an invalid one.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (field, value) in [
            ("battery_min_soc_pct", self.battery_min_soc_pct),
            ("battery_max_soc_pct", self.battery_max_soc_pct),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigurationError::SocOutOfRange { field, value });
            }
        }
        if self.battery_min_soc_pct >= self.battery_max_soc_pct {
            return Err(ConfigurationError::SocBoundsInverted {
                min: self.battery_min_soc_pct,
                max: self.battery_max_soc_pct,
            });
        }
        for (field, value) in [
            ("solar_min_power_w", self.solar_min_power_w),
            ("grid_max_import_w", self.grid_max_import_w),
        ] {
            if value < 0.0 {
                return Err(ConfigurationError::NegativeThreshold { field, value });
            }
        }

        // Three unique entries out of a three-variant enum is a permutation.
        if self.priority_order.len() != EnergySource::ALL.len()
            || !self.priority_order.iter().all_unique()
        {
            return Err(ConfigurationError::InvalidPriorityOrder(format!(
                "{:?}",
                self.priority_order
            )));
        }

        if self.mode == ManagementMode::Manual && self.manual_source.is_none() {
            return Err(ConfigurationError::ManualSourceRequired);
        }

        Ok(())
    }

    /// The guaranteed fallback for automatic arbitration: the last entry of
    /// the priority order. Validation guarantees the order is non-empty.
    pub fn fallback_source(&self) -> EnergySource {
        *self
            .priority_order
            .last()
            .expect("validated priority order is never empty")
    }

    /// Whether `now` falls inside the configured peak window `[start, end)`.
    ///
    /// A window with `end < start` wraps midnight (18:00-06:00 means
    /// "after 18:00 or before 06:00"). Equal bounds are an empty window.
    pub fn is_peak_hours(&self, now: NaiveTime) -> bool {
        let (start, end) = (self.peak_hours_start, self.peak_hours_end);
        match start.cmp(&end) {
            std::cmp::Ordering::Less => now >= start && now < end,
            std::cmp::Ordering::Greater => now >= start || now < end,
            std::cmp::Ordering::Equal => false,
        }
    }

    /// Merge a partial update onto this config and validate the result.
    ///
    /// PATCH semantics: absent fields keep their stored value, so the
    /// merged candidate is always validated as a whole object and the
    /// store can never hold a state that was never validated.
    pub fn merged(&self, update: &PolicyUpdate) -> Result<Self, ConfigurationError> {
        let mut candidate = self.clone();

        if let Some(mode) = update.mode {
            candidate.mode = mode;
        }
        if let Some(source) = update.manual_source {
            candidate.manual_source = Some(source);
        }
        if let Some(order) = &update.priority_order {
            candidate.priority_order = order.clone();
        }
        if let Some(v) = update.battery_min_soc_pct {
            candidate.battery_min_soc_pct = v;
        }
        if let Some(v) = update.battery_max_soc_pct {
            candidate.battery_max_soc_pct = v;
        }
        if let Some(v) = update.solar_min_power_w {
            candidate.solar_min_power_w = v;
        }
        if let Some(v) = update.grid_max_import_w {
            candidate.grid_max_import_w = v;
        }
        if let Some(v) = update.enable_grid_charging {
            candidate.enable_grid_charging = v;
        }
        if let Some(v) = update.enable_grid_export {
            candidate.enable_grid_export = v;
        }
        if let Some(raw) = &update.peak_hours_start {
            candidate.peak_hours_start = parse_time_of_day("peak_hours_start", raw)?;
        }
        if let Some(raw) = &update.peak_hours_end {
            candidate.peak_hours_end = parse_time_of_day("peak_hours_end", raw)?;
        }
        if let Some(v) = update.avoid_grid_during_peak {
            candidate.avoid_grid_during_peak = v;
        }

        candidate.validate()?;
        candidate.updated_at = Utc::now();
        Ok(candidate)
    }
}

fn parse_time_of_day(field: &'static str, raw: &str) -> Result<NaiveTime, ConfigurationError> {
    NaiveTime::parse_from_str(raw, TIME_OF_DAY_FORMAT).map_err(|_| {
        ConfigurationError::InvalidTimeOfDay {
            field,
            value: raw.to_string(),
        }
    })
}

/// Field-level PATCH body from the management UI. Peak-hour fields arrive
/// as raw `"HH:MM"` strings and are parsed during the merge so a bad value
/// surfaces as a [`ConfigurationError`] like every other rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PolicyUpdate {
    pub mode: Option<ManagementMode>,
    pub manual_source: Option<EnergySource>,
    pub priority_order: Option<Vec<EnergySource>>,
    pub battery_min_soc_pct: Option<f64>,
    pub battery_max_soc_pct: Option<f64>,
    pub solar_min_power_w: Option<f64>,
    pub grid_max_import_w: Option<f64>,
    pub enable_grid_charging: Option<bool>,
    pub enable_grid_export: Option<bool>,
    pub peak_hours_start: Option<String>,
    pub peak_hours_end: Option<String>,
    pub avoid_grid_during_peak: Option<bool>,
}
