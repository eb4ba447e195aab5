use serde::{Deserialize, Serialize};

use super::sample::TelemetrySample;

/// Fleet-wide snapshot derived from the latest sample of every connected
/// inverter. Never persisted on its own; recomputed each poll cycle.
///
/// Sign conventions match [`TelemetrySample`]: battery positive = charging,
/// grid positive = importing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregatedState {
    pub total_solar_power_w: f64,
    pub total_battery_power_w: f64,
    pub total_grid_power_w: f64,
    pub total_load_power_w: f64,
    /// Capacity-weighted SOC over inverters reporting both SOC and a
    /// non-zero capacity. `None` when nothing qualifies; 0 is a legitimate
    /// reading and never stands in for "unknown".
    pub weighted_battery_soc_pct: Option<f64>,
    pub total_battery_capacity_kwh: f64,
    pub active_inverter_count: usize,
}

impl AggregatedState {
    /// Grid import component (0 when exporting).
    pub fn grid_import_w(&self) -> f64 {
        self.total_grid_power_w.max(0.0)
    }

    /// Grid export component (0 when importing).
    pub fn grid_export_w(&self) -> f64 {
        (-self.total_grid_power_w).max(0.0)
    }

    /// Reported load, or the dashboard estimate when no inverter carries a
    /// load meter. The estimate is the legacy display formula, not a
    /// physical balance.
    pub fn load_or_estimate_w(&self) -> f64 {
        if self.total_load_power_w > 0.0 {
            self.total_load_power_w
        } else {
            self.total_solar_power_w + self.total_battery_power_w.abs() + self.total_grid_power_w
        }
    }
}

impl Default for AggregatedState {
    fn default() -> Self {
        Self {
            total_solar_power_w: 0.0,
            total_battery_power_w: 0.0,
            total_grid_power_w: 0.0,
            total_load_power_w: 0.0,
            weighted_battery_soc_pct: None,
            total_battery_capacity_kwh: 0.0,
            active_inverter_count: 0,
        }
    }
}

/// Combine the latest samples of all connected inverters into fleet totals.
///
/// The caller supplies already-filtered samples (disconnected inverters are
/// excluded upstream, not zeroed here). Summation is order-independent and
/// an empty slice yields the all-zero state with SOC undefined.
pub fn aggregate(samples: &[TelemetrySample]) -> AggregatedState {
    let mut state = AggregatedState {
        active_inverter_count: samples.len(),
        ..AggregatedState::default()
    };

    let mut weighted_soc_sum = 0.0;
    let mut weighted_cap_sum = 0.0;
    let mut plain_socs: Vec<f64> = Vec::new();

    for s in samples {
        state.total_solar_power_w += s.ac_power_w;
        state.total_battery_power_w += s.battery_power_w.unwrap_or(0.0);
        state.total_grid_power_w += s.grid_power_w.unwrap_or(0.0);
        state.total_load_power_w += s.load_power_w.unwrap_or(0.0);
        state.total_battery_capacity_kwh += s.battery_capacity_kwh;

        if let Some((soc, cap)) = s.weighted_soc_term() {
            weighted_soc_sum += soc * cap;
            weighted_cap_sum += cap;
        }
        if let Some(soc) = s.battery_soc_pct {
            plain_socs.push(soc);
        }
    }

    state.weighted_battery_soc_pct = if weighted_cap_sum > 0.0 {
        Some(weighted_soc_sum / weighted_cap_sum)
    } else if !plain_socs.is_empty() {
        // All capacities are zero but SOCs exist: fall back to the
        // unweighted arithmetic mean.
        Some(plain_socs.iter().sum::<f64>() / plain_socs.len() as f64)
    } else {
        None
    };

    state
}
