use serde::{Deserialize, Serialize};

use super::aggregate::AggregatedState;
use super::types::ActiveSource;

/// Grid emission factor in kg CO₂ per kWh of displaced grid energy.
/// Fixed documented constant, not operator configuration.
pub const CO2_EMISSION_FACTOR_KG_PER_KWH: f64 = 0.5;

/// Solar production must exceed this before any solar flow is shown.
pub const SOLAR_FLOW_THRESHOLD_W: f64 = 100.0;

/// Deadband applied to battery and grid flows so sensor noise around zero
/// does not flicker the flow diagram.
pub const FLOW_DEADBAND_W: f64 = 50.0;

/// Fraction of consumed energy covered by solar generation, in `[0, 1]`.
///
/// Defined as 0 when nothing was consumed; a fresh installation renders
/// "0%" rather than NaN.
pub fn self_sufficiency_ratio(solar_energy_kwh: f64, grid_import_kwh: f64) -> f64 {
    let denominator = solar_energy_kwh + grid_import_kwh;
    if denominator <= 0.0 {
        return 0.0;
    }
    (solar_energy_kwh / denominator).clamp(0.0, 1.0)
}

/// Grid emissions avoided by the given solar production.
pub fn co2_avoided_kg(solar_energy_kwh: f64) -> f64 {
    solar_energy_kwh * CO2_EMISSION_FACTOR_KG_PER_KWH
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AutonomyStatus {
    Charging,
    Discharging,
    Idle,
    /// Battery capacity is unconfigured or SOC is unreported; consumers
    /// should prompt for configuration instead of rendering a number.
    Unknown,
}

/// Estimated time the battery can sustain the present discharge rate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BatteryAutonomy {
    pub status: AutonomyStatus,
    pub hours: f64,
}

impl BatteryAutonomy {
    fn zero(status: AutonomyStatus) -> Self {
        Self { status, hours: 0.0 }
    }
}

/// Battery autonomy from the fleet snapshot.
///
/// Unconfigured capacity or missing SOC wins over every other
/// classification, so a zero-capacity fleet is always `Unknown`.
pub fn battery_autonomy(state: &AggregatedState) -> BatteryAutonomy {
    let Some(soc) = state.weighted_battery_soc_pct else {
        return BatteryAutonomy::zero(AutonomyStatus::Unknown);
    };
    if state.total_battery_capacity_kwh <= 0.0 {
        return BatteryAutonomy::zero(AutonomyStatus::Unknown);
    }
    if state.total_battery_power_w > 0.0 {
        return BatteryAutonomy::zero(AutonomyStatus::Charging);
    }
    if state.total_battery_power_w == 0.0 {
        return BatteryAutonomy::zero(AutonomyStatus::Idle);
    }

    let available_kwh = state.total_battery_capacity_kwh * soc / 100.0;
    let discharge_kw = state.total_battery_power_w.abs() / 1000.0;
    BatteryAutonomy {
        status: AutonomyStatus::Discharging,
        hours: available_kwh / discharge_kw,
    }
}

/// Which edges of the energy-flow diagram are live right now.
///
/// Thresholds are the fixed deadbands above; these predicates exist for
/// presentation and diagnostics, not control.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlowStates {
    pub solar_to_home: bool,
    pub solar_to_battery: bool,
    pub solar_to_grid: bool,
    pub battery_to_home: bool,
    pub grid_to_home: bool,
    pub grid_to_battery: bool,
}

impl FlowStates {
    pub fn from_state(state: &AggregatedState) -> Self {
        let solar = state.total_solar_power_w;
        let battery = state.total_battery_power_w;
        let grid = state.total_grid_power_w;

        Self {
            solar_to_home: solar > SOLAR_FLOW_THRESHOLD_W,
            solar_to_battery: solar > SOLAR_FLOW_THRESHOLD_W && battery > FLOW_DEADBAND_W,
            solar_to_grid: solar > SOLAR_FLOW_THRESHOLD_W && grid < -FLOW_DEADBAND_W,
            battery_to_home: battery < -FLOW_DEADBAND_W,
            grid_to_home: grid > FLOW_DEADBAND_W,
            grid_to_battery: grid > FLOW_DEADBAND_W && battery > FLOW_DEADBAND_W,
        }
    }
}

/// Classify which source is observably supplying the load.
///
/// This is a read on the telemetry, not a recommendation: several supply
/// flows above the deadband yield `Mixed`. With nothing flowing the
/// classification defaults to solar.
pub fn observed_source(state: &AggregatedState) -> ActiveSource {
    let flows = FlowStates::from_state(state);
    let supplying = [
        (flows.solar_to_home, ActiveSource::Solar),
        (flows.battery_to_home, ActiveSource::Battery),
        (flows.grid_to_home, ActiveSource::Grid),
    ];

    let mut active = supplying.iter().filter(|(on, _)| *on).map(|(_, s)| *s);
    match (active.next(), active.next()) {
        (Some(single), None) => single,
        (Some(_), Some(_)) => ActiveSource::Mixed,
        (None, _) => ActiveSource::Solar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AggregatedState {
        AggregatedState::default()
    }

    #[test]
    fn test_self_sufficiency_zero_denominator_is_zero() {
        assert_eq!(self_sufficiency_ratio(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_self_sufficiency_ratio() {
        assert_eq!(self_sufficiency_ratio(5.0, 5.0), 0.5);
        assert_eq!(self_sufficiency_ratio(10.0, 0.0), 1.0);
        assert_eq!(self_sufficiency_ratio(0.0, 10.0), 0.0);
    }

    #[test]
    fn test_co2_avoided_uses_fixed_factor() {
        assert_eq!(co2_avoided_kg(10.0), 5.0);
        assert_eq!(co2_avoided_kg(0.0), 0.0);
    }

    #[test]
    fn test_autonomy_unknown_without_capacity() {
        // Holds for every battery power value, including charging.
        for power in [-1200.0, 0.0, 900.0] {
            let mut s = state();
            s.weighted_battery_soc_pct = Some(50.0);
            s.total_battery_power_w = power;
            let autonomy = battery_autonomy(&s);
            assert_eq!(autonomy.status, AutonomyStatus::Unknown);
            assert_eq!(autonomy.hours, 0.0);
        }
    }

    #[test]
    fn test_autonomy_unknown_without_soc() {
        let mut s = state();
        s.total_battery_capacity_kwh = 10.0;
        s.total_battery_power_w = -500.0;
        assert_eq!(battery_autonomy(&s).status, AutonomyStatus::Unknown);
    }

    #[test]
    fn test_autonomy_charging_and_idle() {
        let mut s = state();
        s.weighted_battery_soc_pct = Some(80.0);
        s.total_battery_capacity_kwh = 10.0;

        s.total_battery_power_w = 1500.0;
        assert_eq!(battery_autonomy(&s).status, AutonomyStatus::Charging);

        s.total_battery_power_w = 0.0;
        assert_eq!(battery_autonomy(&s).status, AutonomyStatus::Idle);
    }

    #[test]
    fn test_autonomy_discharge_hours() {
        // 10 kWh at 50% = 5 kWh available; 1 kW draw -> 5 hours.
        let mut s = state();
        s.weighted_battery_soc_pct = Some(50.0);
        s.total_battery_capacity_kwh = 10.0;
        s.total_battery_power_w = -1000.0;

        let autonomy = battery_autonomy(&s);
        assert_eq!(autonomy.status, AutonomyStatus::Discharging);
        assert!((autonomy.hours - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_flow_deadbands() {
        let mut s = state();
        s.total_solar_power_w = 99.0;
        s.total_battery_power_w = -49.0;
        s.total_grid_power_w = 49.0;
        let flows = FlowStates::from_state(&s);
        assert!(!flows.solar_to_home);
        assert!(!flows.battery_to_home);
        assert!(!flows.grid_to_home);

        s.total_solar_power_w = 101.0;
        s.total_battery_power_w = -51.0;
        s.total_grid_power_w = 51.0;
        let flows = FlowStates::from_state(&s);
        assert!(flows.solar_to_home);
        assert!(flows.battery_to_home);
        assert!(flows.grid_to_home);
    }

    #[test]
    fn test_flow_combined_edges() {
        let mut s = state();
        s.total_solar_power_w = 3000.0;
        s.total_battery_power_w = 800.0;
        s.total_grid_power_w = -600.0;
        let flows = FlowStates::from_state(&s);
        assert!(flows.solar_to_battery);
        assert!(flows.solar_to_grid);
        assert!(!flows.grid_to_battery);

        s.total_grid_power_w = 400.0;
        let flows = FlowStates::from_state(&s);
        assert!(flows.grid_to_battery);
        assert!(!flows.solar_to_grid);
    }

    #[test]
    fn test_observed_source_single_and_mixed() {
        let mut s = state();
        s.total_solar_power_w = 1500.0;
        assert_eq!(observed_source(&s), ActiveSource::Solar);

        s.total_battery_power_w = -800.0;
        assert_eq!(observed_source(&s), ActiveSource::Mixed);

        s.total_solar_power_w = 0.0;
        assert_eq!(observed_source(&s), ActiveSource::Battery);
    }

    #[test]
    fn test_observed_source_defaults_to_solar_when_quiet() {
        assert_eq!(observed_source(&state()), ActiveSource::Solar);
    }
}
