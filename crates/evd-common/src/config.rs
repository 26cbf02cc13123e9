//! ---
//! evd_section: "01-core-functionality"
//! evd_subsection: "module"
//! evd_type: "source"
//! evd_scope: "code"
//! evd_description: "Shared primitives and utilities for the dispatch runtime."
//! evd_version: "v0.0.0-prealpha"
//! evd_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::LogFormat;

fn default_truck_soc() -> f64 {
    82.0
}

fn default_capacity_kwh() -> f64 {
    282.0
}

fn default_battery_count() -> usize {
    5
}

fn default_exchange_minutes() -> i64 {
    5
}

fn default_charge_rate_kwh_per_min() -> f64 {
    4.7
}

fn default_total_cargo() -> i64 {
    2000
}

fn default_cargo_per_trip() -> i64 {
    50
}

fn default_dock_minutes() -> i64 {
    10
}

fn default_average_speed_kmh() -> f64 {
    40.0
}

fn default_base_kwh_per_km() -> f64 {
    1.4
}

fn default_load_factor_loaded() -> f64 {
    1.3
}

fn default_load_factor_empty() -> f64 {
    0.72
}

fn default_environment_factor() -> f64 {
    1.0
}

fn default_safety_margin_percent() -> f64 {
    10.0
}

fn default_start_hour() -> u32 {
    8
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

/// Primary configuration object for an EVD-Sim run.
///
/// Every default reproduces the reference deployment: a single site pair
/// 21.3 km apart, a five-slot swap station, and 282 kWh packs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub fleet: FleetConfig,
    #[serde(default)]
    pub station: StationConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub energy: EnergyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Local hour of day at which the simulated shift begins.
    #[serde(default = "default_start_hour")]
    pub start_hour: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            fleet: FleetConfig::default(),
            station: StationConfig::default(),
            transport: TransportConfig::default(),
            energy: EnergyConfig::default(),
            logging: LoggingConfig::default(),
            start_hour: default_start_hour(),
        }
    }
}

/// One truck as declared in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruckSpec {
    pub id: String,
    #[serde(default = "default_truck_soc")]
    pub soc: f64,
    #[serde(default = "default_capacity_kwh")]
    pub capacity_kwh: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FleetConfig {
    #[serde(default)]
    pub trucks: Vec<TruckSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConfig {
    #[serde(default = "default_battery_count")]
    pub battery_count: usize,
    #[serde(default = "default_exchange_minutes")]
    pub exchange_minutes: i64,
    #[serde(default = "default_charge_rate_kwh_per_min")]
    pub charge_rate_kwh_per_min: f64,
    #[serde(default = "default_capacity_kwh")]
    pub battery_capacity_kwh: f64,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            battery_count: default_battery_count(),
            exchange_minutes: default_exchange_minutes(),
            charge_rate_kwh_per_min: default_charge_rate_kwh_per_min(),
            battery_capacity_kwh: default_capacity_kwh(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "default_total_cargo")]
    pub total_cargo: i64,
    #[serde(default = "default_cargo_per_trip")]
    pub cargo_per_trip: i64,
    #[serde(default = "default_dock_minutes")]
    pub dock_minutes: i64,
    #[serde(default = "default_average_speed_kmh")]
    pub average_speed_kmh: f64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            total_cargo: default_total_cargo(),
            cargo_per_trip: default_cargo_per_trip(),
            dock_minutes: default_dock_minutes(),
            average_speed_kmh: default_average_speed_kmh(),
        }
    }
}

/// Parameters of the parametric energy model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyConfig {
    #[serde(default = "default_base_kwh_per_km")]
    pub base_kwh_per_km: f64,
    #[serde(default = "default_load_factor_loaded")]
    pub load_factor_loaded: f64,
    #[serde(default = "default_load_factor_empty")]
    pub load_factor_empty: f64,
    #[serde(default = "default_environment_factor")]
    pub speed_factor: f64,
    #[serde(default = "default_environment_factor")]
    pub terrain_factor: f64,
    #[serde(default = "default_environment_factor")]
    pub weather_factor: f64,
    #[serde(default = "default_safety_margin_percent")]
    pub safety_margin_percent: f64,
    #[serde(default = "default_capacity_kwh")]
    pub default_capacity_kwh: f64,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            base_kwh_per_km: default_base_kwh_per_km(),
            load_factor_loaded: default_load_factor_loaded(),
            load_factor_empty: default_load_factor_empty(),
            speed_factor: default_environment_factor(),
            terrain_factor: default_environment_factor(),
            weather_factor: default_environment_factor(),
            safety_margin_percent: default_safety_margin_percent(),
            default_capacity_kwh: default_capacity_kwh(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: LogFormat::default(),
            file_prefix: None,
        }
    }
}

/// Metadata describing where a [`SimConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedSimConfig {
    pub config: SimConfig,
    pub source: PathBuf,
}

impl SimConfig {
    pub const ENV_CONFIG_PATH: &'static str = "EVD_SIM_CONFIG";

    /// Load configuration from disk, respecting the `EVD_SIM_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedSimConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            let path = PathBuf::from(env_path);
            let config = Self::from_file(&path)
                .with_context(|| format!("loading config from {}", path.display()))?;
            return Ok(LoadedSimConfig {
                config,
                source: path,
            });
        }

        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                debug!(path = %path.display(), "loading simulation config");
                let config = Self::from_file(path)
                    .with_context(|| format!("loading config from {}", path.display()))?;
                return Ok(LoadedSimConfig {
                    config,
                    source: path.to_path_buf(),
                });
            }
        }

        Err(anyhow!(
            "no configuration file found; set {} or provide a candidate path",
            Self::ENV_CONFIG_PATH
        ))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: SimConfig = toml::from_str(&raw)?;
        Ok(config)
    }
}
