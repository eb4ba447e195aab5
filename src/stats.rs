use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::domain::metrics::{co2_avoided_kg, self_sufficiency_ratio};
use crate::domain::TelemetrySample;

/// Aggregate statistics over an ordered run of samples taken at a fixed
/// polling interval. Pure reducer; the sample window itself comes from
/// whatever the caller retained (the service keeps a bounded ring, a
/// storage backend could supply days).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeriodStats {
    pub sample_count: usize,
    pub runtime_hours: f64,

    // Integrated energy
    pub solar_energy_kwh: f64,
    pub grid_import_kwh: f64,
    pub grid_export_kwh: f64,
    pub battery_charge_kwh: f64,
    pub battery_discharge_kwh: f64,

    // Power envelope
    pub avg_power_w: f64,
    pub peak_power_w: f64,

    /// Mean DC->AC conversion efficiency in percent, 0 when no DC power
    /// was recorded.
    pub avg_efficiency_pct: f64,

    // Derived presentation figures
    pub self_sufficiency_pct: f64,
    pub co2_avoided_kg: f64,
}

impl PeriodStats {
    /// Reduce a run of samples polled every `interval`.
    ///
    /// Each sample's instantaneous power is integrated over one interval
    /// (rectangle rule, kWh = W * h / 1000). An empty run yields the
    /// all-zero stats, never NaN.
    pub fn from_samples(samples: &[TelemetrySample], interval: Duration) -> Self {
        let dt_hours = interval.num_milliseconds() as f64 / 3_600_000.0;

        let mut stats = Self::zero();
        let mut total_ac_power = 0.0;
        let mut total_dc_power = 0.0;

        for s in samples {
            let ac = s.ac_power_w;
            total_ac_power += ac;
            total_dc_power += s.dc_power_w;
            stats.peak_power_w = stats.peak_power_w.max(ac);
            stats.solar_energy_kwh += ac * dt_hours / 1000.0;

            if let Some(grid) = s.grid_power_w {
                if grid > 0.0 {
                    stats.grid_import_kwh += grid * dt_hours / 1000.0;
                } else {
                    stats.grid_export_kwh += -grid * dt_hours / 1000.0;
                }
            }
            if let Some(battery) = s.battery_power_w {
                if battery > 0.0 {
                    stats.battery_charge_kwh += battery * dt_hours / 1000.0;
                } else {
                    stats.battery_discharge_kwh += -battery * dt_hours / 1000.0;
                }
            }
        }

        stats.sample_count = samples.len();
        stats.runtime_hours = samples.len() as f64 * dt_hours;
        if !samples.is_empty() {
            stats.avg_power_w = total_ac_power / samples.len() as f64;
        }
        if total_dc_power > 0.0 {
            stats.avg_efficiency_pct = total_ac_power / total_dc_power * 100.0;
        }
        stats.self_sufficiency_pct =
            self_sufficiency_ratio(stats.solar_energy_kwh, stats.grid_import_kwh) * 100.0;
        stats.co2_avoided_kg = co2_avoided_kg(stats.solar_energy_kwh);

        stats
    }

    fn zero() -> Self {
        Self {
            sample_count: 0,
            runtime_hours: 0.0,
            solar_energy_kwh: 0.0,
            grid_import_kwh: 0.0,
            grid_export_kwh: 0.0,
            battery_charge_kwh: 0.0,
            battery_discharge_kwh: 0.0,
            avg_power_w: 0.0,
            peak_power_w: 0.0,
            avg_efficiency_pct: 0.0,
            self_sufficiency_pct: 0.0,
            co2_avoided_kg: 0.0,
        }
    }
}
