//! Solar inverter fleet aggregation and energy-source arbitration.
//!
//! The core is a pure pipeline invoked on every poll cycle:
//! [`domain::aggregate`] folds per-inverter telemetry into fleet totals,
//! [`domain::metrics`] derives the presentation figures, and
//! [`engine::evaluate`] arbitrates the recommended energy source against
//! the operator's policy. [`manager::EnergyManager`] owns the single
//! mutable policy instance and drives the pipeline on a timer; the HTTP
//! surface in [`api`] only reads pipeline output and funnels policy
//! updates through the manager's validated write path.

pub mod api;
pub mod config;
pub mod domain;
pub mod engine;
#[cfg(feature = "sim")]
pub mod fleet;
pub mod manager;
pub mod policy;
pub mod stats;
pub mod telemetry;
