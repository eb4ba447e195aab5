use anyhow::Result;
use async_trait::async_trait;
use chrono::{Timelike, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::config::FleetConfig;
use crate::domain::{InverterStatus, TelemetrySample};
use crate::manager::TelemetrySource;

/// One inverter of the simulated fleet.
#[derive(Debug, Clone)]
pub struct SimInverter {
    pub id: String,
    pub battery_capacity_kwh: f64,
    pub status: InverterStatus,
}

impl SimInverter {
    pub fn connected(battery_capacity_kwh: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            battery_capacity_kwh,
            status: InverterStatus::Connected,
        }
    }
}

/// Simulated inverter fleet for development and testing.
///
/// Production follows a sine curve over daylight hours with random jitter;
/// grid direction flips to export once solar output is high. Values track
/// the ranges a small residential hybrid inverter reports. Inverters that
/// are not `Connected` yield no sample, the same contract a real poller
/// honors for unreachable hardware.
pub struct SimulatedFleet {
    inverters: Vec<SimInverter>,
}

impl SimulatedFleet {
    pub fn new(inverters: Vec<SimInverter>) -> Self {
        Self { inverters }
    }

    pub fn from_config(cfg: &FleetConfig) -> Self {
        Self::new(
            (0..cfg.inverter_count)
                .map(|_| SimInverter::connected(cfg.battery_capacity_kwh))
                .collect(),
        )
    }

    /// Solar output factor for the given hour: 0 at night, peaking at
    /// midday on a sine curve.
    fn solar_factor(hour: u32) -> f64 {
        if !(6..=20).contains(&hour) {
            return 0.0;
        }
        let normalized = (hour as f64 - 6.0) / 14.0;
        (normalized * std::f64::consts::PI).sin().max(0.0)
    }

    fn simulate_reading(inverter: &SimInverter, hour: u32) -> TelemetrySample {
        let mut rng = rand::thread_rng();
        let factor = Self::solar_factor(hour);

        let ac_power_w = rng.gen_range(1500.0..4500.0) * factor;
        let dc_power_w = ac_power_w * rng.gen_range(1.05..1.15);
        let battery_power_w = rng.gen_range(-2000.0..3000.0);
        // High solar exports the surplus; otherwise the house imports.
        let grid_power_w = if ac_power_w > 3000.0 {
            rng.gen_range(-1500.0..0.0)
        } else {
            rng.gen_range(0.0..2000.0)
        };
        let ac_voltage_v = rng.gen_range(220.0..240.0);
        let dc_voltage_v: f64 = rng.gen_range(350.0..450.0);

        TelemetrySample {
            inverter_id: inverter.id.clone(),
            timestamp: Utc::now(),
            ac_power_w,
            dc_power_w,
            ac_voltage_v,
            ac_current_a: ac_power_w / ac_voltage_v,
            dc_current_a: dc_power_w / dc_voltage_v,
            frequency_hz: rng.gen_range(49.5..50.5),
            temperature_c: rng.gen_range(35.0..55.0),
            battery_soc_pct: Some(rng.gen_range(60.0..95.0)),
            battery_power_w: Some(battery_power_w),
            grid_power_w: Some(grid_power_w),
            load_power_w: None,
            energy_today_kwh: rng.gen_range(15.0..35.0),
            energy_total_kwh: rng.gen_range(5000.0..15000.0),
            battery_capacity_kwh: inverter.battery_capacity_kwh,
        }
    }
}

#[async_trait]
impl TelemetrySource for SimulatedFleet {
    async fn connected_samples(&self) -> Result<Vec<TelemetrySample>> {
        let hour = chrono::Local::now().hour();
        Ok(self
            .inverters
            .iter()
            .filter(|inv| inv.status == InverterStatus::Connected)
            .map(|inv| Self::simulate_reading(inv, hour))
            .collect())
    }
}
