use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::domain::{
    aggregate, battery_autonomy, observed_source, ActiveSource, AggregatedState, BatteryAutonomy,
    FlowStates, ManagementMode, TelemetrySample,
};
use crate::engine::{evaluate, SourceDecision};
use crate::policy::{ConfigurationError, EnergyManagementConfig, PolicyUpdate};
use crate::stats::PeriodStats;

/// Bounded decision history retained for operators.
pub const DECISION_HISTORY_CAP: usize = 100;

/// Default number of history entries returned when no limit is given.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Bounded ring of recent samples backing `/statistics/recent`.
const SAMPLE_RING_CAP: usize = 4096;

/// Boundary to the inverter-polling subsystem.
///
/// Implementations return the latest sample of every *connected*
/// inverter; an unreachable inverter is simply absent from the batch, so
/// one slow fetch never blocks aggregation of the rest.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn connected_samples(&self) -> Result<Vec<TelemetrySample>>;
}

/// Telemetry source with no inverters attached. Stands in when the crate
/// is built without the `sim` feature and no poller has been wired up.
pub struct DisconnectedTelemetry;

#[async_trait]
impl TelemetrySource for DisconnectedTelemetry {
    async fn connected_samples(&self) -> Result<Vec<TelemetrySample>> {
        Ok(Vec::new())
    }
}

/// One archived arbitration outcome.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DecisionRecord {
    pub timestamp: DateTime<Utc>,
    pub decision: SourceDecision,
}

/// Everything one poll cycle produces for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub timestamp: DateTime<Utc>,
    pub mode: ManagementMode,
    pub state: AggregatedState,
    pub decision: SourceDecision,
    pub observed_source: ActiveSource,
    pub flows: FlowStates,
    pub autonomy: BatteryAutonomy,
}

/// Owner of the single shared policy config and the evaluation pipeline.
///
/// Updates go through one read-merge-validate-write critical section, so
/// concurrent partial updates can never interleave into a state that was
/// never validated. Evaluation itself is stateless; the manager only
/// archives outcomes.
pub struct EnergyManager {
    telemetry: Arc<dyn TelemetrySource>,
    config: RwLock<EnergyManagementConfig>,
    latest: RwLock<Option<EvaluationReport>>,
    history: RwLock<VecDeque<DecisionRecord>>,
    recent_samples: RwLock<VecDeque<TelemetrySample>>,
    poll_interval: chrono::Duration,
}

impl EnergyManager {
    pub fn new(telemetry: Arc<dyn TelemetrySource>, poll_seconds: u64) -> Self {
        Self {
            telemetry,
            config: RwLock::new(EnergyManagementConfig::default()),
            latest: RwLock::new(None),
            history: RwLock::new(VecDeque::with_capacity(DECISION_HISTORY_CAP)),
            recent_samples: RwLock::new(VecDeque::new()),
            poll_interval: chrono::Duration::seconds(poll_seconds.max(1) as i64),
        }
    }

    /// Snapshot of the current policy.
    pub async fn config(&self) -> EnergyManagementConfig {
        self.config.read().await.clone()
    }

    /// Apply a partial update atomically. A rejected update leaves the
    /// stored config untouched and is reported to the caller in full.
    pub async fn update_config(
        &self,
        update: PolicyUpdate,
    ) -> Result<EnergyManagementConfig, ConfigurationError> {
        let mut guard = self.config.write().await;
        let merged = guard.merged(&update)?;
        *guard = merged.clone();
        info!(
            mode = %merged.mode,
            battery_min_soc_pct = merged.battery_min_soc_pct,
            battery_max_soc_pct = merged.battery_max_soc_pct,
            "energy management config updated"
        );
        Ok(merged)
    }

    /// Run one aggregation + arbitration pass and archive the outcome.
    pub async fn evaluate_cycle(&self) -> Result<EvaluationReport> {
        let samples = self.telemetry.connected_samples().await?;
        let state = aggregate(&samples);
        let config = self.config.read().await.clone();

        let now = Local::now();
        let decision = evaluate(&state, &config, now.time());

        let report = EvaluationReport {
            timestamp: now.with_timezone(&Utc),
            mode: config.mode,
            observed_source: observed_source(&state),
            flows: FlowStates::from_state(&state),
            autonomy: battery_autonomy(&state),
            decision: decision.clone(),
            state,
        };

        self.archive(report.timestamp, decision, samples).await;
        *self.latest.write().await = Some(report.clone());
        Ok(report)
    }

    /// Latest completed cycle, for the presentation layer. `None` until
    /// the first tick has run.
    pub async fn latest_report(&self) -> Option<EvaluationReport> {
        self.latest.read().await.clone()
    }

    async fn archive(
        &self,
        timestamp: DateTime<Utc>,
        decision: SourceDecision,
        samples: Vec<TelemetrySample>,
    ) {
        let mut history = self.history.write().await;
        if history.len() == DECISION_HISTORY_CAP {
            history.pop_front();
        }
        history.push_back(DecisionRecord { timestamp, decision });
        drop(history);

        let mut ring = self.recent_samples.write().await;
        for sample in samples {
            if ring.len() == SAMPLE_RING_CAP {
                ring.pop_front();
            }
            ring.push_back(sample);
        }
    }

    /// Latest archived decision, if a cycle has run.
    pub async fn last_decision(&self) -> Option<DecisionRecord> {
        self.history.read().await.back().cloned()
    }

    /// The most recent `limit` decisions in chronological order.
    pub async fn decision_history(&self, limit: usize) -> Vec<DecisionRecord> {
        let history = self.history.read().await;
        let skip = history.len().saturating_sub(limit);
        history.iter().skip(skip).cloned().collect()
    }

    /// Statistics over the retained sample window.
    pub async fn recent_stats(&self) -> PeriodStats {
        let ring = self.recent_samples.read().await;
        let samples: Vec<TelemetrySample> = ring.iter().cloned().collect();
        PeriodStats::from_samples(&samples, self.poll_interval)
    }

    /// Periodic evaluation loop; tick cadence comes from process config.
    pub async fn run(self: Arc<Self>, tick_seconds: u64) -> Result<()> {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(tick_seconds.max(1)));
        loop {
            interval.tick().await;
            match self.evaluate_cycle().await {
                Ok(report) => info!(
                    recommended = %report.decision.recommended_source,
                    observed = %report.observed_source,
                    solar_w = report.state.total_solar_power_w,
                    grid_w = report.state.total_grid_power_w,
                    violations = report.decision.violations.len(),
                    inverters = report.state.active_inverter_count,
                    "evaluation cycle"
                ),
                // A failed fetch is a telemetry gap, not a reason to stop
                // arbitrating; the next tick retries.
                Err(e) => warn!(error = %e, "evaluation cycle skipped"),
            }
        }
    }
}

/// Shared application state handed to the API layer.
#[derive(Clone)]
pub struct AppState {
    pub cfg: AppConfig,
    pub manager: Arc<EnergyManager>,
}

impl AppState {
    pub fn new(cfg: AppConfig) -> Self {
        #[cfg(feature = "sim")]
        let telemetry: Arc<dyn TelemetrySource> =
            Arc::new(crate::fleet::SimulatedFleet::from_config(&cfg.fleet));
        #[cfg(not(feature = "sim"))]
        let telemetry: Arc<dyn TelemetrySource> = Arc::new(DisconnectedTelemetry);

        let manager = Arc::new(EnergyManager::new(telemetry, cfg.engine.poll_seconds));
        Self { cfg, manager }
    }
}

pub fn spawn_manager_tasks(state: &AppState) {
    let manager = state.manager.clone();
    let tick = state.cfg.engine.poll_seconds;
    tokio::spawn(async move {
        if let Err(e) = manager.run(tick).await {
            warn!(error = %e, "evaluation loop stopped");
        }
    });
}
