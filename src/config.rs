use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Process-level configuration. Operator policy lives elsewhere (it is
/// mutable at runtime); this is the immutable wiring of one deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub fleet: FleetConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            enable_cors: true,
            request_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Evaluation cadence; the reference deployment polls every 5 s.
    pub poll_seconds: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { poll_seconds: 5 }
    }
}

/// Simulated fleet shape, used when built with the `sim` feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    pub inverter_count: usize,
    /// Battery capacity attached to each simulated inverter.
    pub battery_capacity_kwh: f64,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            inverter_count: 2,
            battery_capacity_kwh: 10.0,
        }
    }
}

impl AppConfig {
    /// Defaults, overridden by `config/default.toml`, overridden by
    /// `SEM__`-prefixed environment variables.
    pub fn load() -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("SEM__").split("__"));
        Ok(figment.extract()?)
    }
}
