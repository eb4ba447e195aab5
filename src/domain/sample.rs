use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One inverter's instantaneous readings.
///
/// Sign conventions follow the wire format of the polling subsystem:
/// `battery_power_w` is positive when charging and negative when
/// discharging; `grid_power_w` is positive when importing and negative
/// when exporting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetrySample {
    pub inverter_id: String,
    pub timestamp: DateTime<Utc>,

    // Instantaneous power
    pub ac_power_w: f64,
    pub dc_power_w: f64,

    // Electrical readings
    pub ac_voltage_v: f64,
    pub ac_current_a: f64,
    pub dc_current_a: f64,
    pub frequency_hz: f64,
    pub temperature_c: f64,

    // Battery block, absent on battery-less inverters
    pub battery_soc_pct: Option<f64>,
    pub battery_power_w: Option<f64>,

    // Grid / load block, absent when no meter is attached
    pub grid_power_w: Option<f64>,
    pub load_power_w: Option<f64>,

    // Cumulative energy counters
    pub energy_today_kwh: f64,
    pub energy_total_kwh: f64,

    /// Nameplate battery capacity attached to this inverter. Static
    /// registry data, repeated on every sample so aggregation needs no
    /// registry lookup.
    pub battery_capacity_kwh: f64,
}

impl TelemetrySample {
    /// True when the grid meter reports net export.
    pub fn is_exporting(&self) -> bool {
        self.grid_power_w.is_some_and(|w| w < 0.0)
    }

    /// True when the battery is charging.
    pub fn is_battery_charging(&self) -> bool {
        self.battery_power_w.is_some_and(|w| w > 0.0)
    }

    /// SOC paired with a usable capacity, for weighted averaging.
    pub fn weighted_soc_term(&self) -> Option<(f64, f64)> {
        match (self.battery_soc_pct, self.battery_capacity_kwh) {
            (Some(soc), cap) if cap > 0.0 => Some((soc, cap)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::testutil::sample;

    #[test]
    fn test_direction_helpers() {
        let mut s = sample("inv-1");
        assert!(!s.is_exporting());
        assert!(!s.is_battery_charging());

        s.grid_power_w = Some(-420.0);
        s.battery_power_w = Some(1500.0);
        assert!(s.is_exporting());
        assert!(s.is_battery_charging());
    }

    #[test]
    fn test_weighted_soc_term_requires_capacity() {
        let mut s = sample("inv-1");
        s.battery_soc_pct = Some(55.0);
        assert_eq!(s.weighted_soc_term(), None);

        s.battery_capacity_kwh = 10.0;
        assert_eq!(s.weighted_soc_term(), Some((55.0, 10.0)));
    }
}
