//! Configuration for Pisofrete.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::types::shipment::CargoType;
use crate::{FreteError, FreteResult};

/// Main configuration for Pisofrete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Mapping service settings.
    #[serde(default)]
    pub maps: MapsConfig,

    /// Geocode/route cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Batch reconciliation settings.
    #[serde(default)]
    pub batch: BatchConfig,

    /// Shipment origin settings.
    #[serde(default)]
    pub origin: OriginConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Mapping service (OpenRouteService) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapsConfig {
    /// Base URL of the service.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key. Without it every lookup falls back to estimates.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-call timeout (in seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum simultaneous outbound calls.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Minimum spacing between geocode calls (ms).
    #[serde(default = "default_geocode_interval")]
    pub geocode_interval_ms: u64,

    /// Minimum spacing between routing calls (ms).
    #[serde(default = "default_route_interval")]
    pub route_interval_ms: u64,
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout(),
            max_concurrency: default_max_concurrency(),
            geocode_interval_ms: default_geocode_interval(),
            route_interval_ms: default_route_interval(),
        }
    }
}

impl MapsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn geocode_interval(&self) -> Duration {
        Duration::from_millis(self.geocode_interval_ms)
    }

    pub fn route_interval(&self) -> Duration {
        Duration::from_millis(self.route_interval_ms)
    }
}

fn default_base_url() -> String {
    "https://api.openrouteservice.org".to_string()
}

fn default_timeout() -> u64 {
    12
}

fn default_max_concurrency() -> usize {
    4
}

fn default_geocode_interval() -> u64 {
    250
}

fn default_route_interval() -> u64 {
    750
}

/// Cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum geocode entries.
    #[serde(default = "default_cache_capacity")]
    pub geocode_capacity: usize,

    /// Geocode entry time to live in seconds.
    #[serde(default = "default_geocode_ttl")]
    pub geocode_ttl_secs: u64,

    /// Maximum route entries.
    #[serde(default = "default_cache_capacity")]
    pub route_capacity: usize,

    /// Route entry time to live in seconds.
    #[serde(default = "default_route_ttl")]
    pub route_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            geocode_capacity: default_cache_capacity(),
            geocode_ttl_secs: default_geocode_ttl(),
            route_capacity: default_cache_capacity(),
            route_ttl_secs: default_route_ttl(),
        }
    }
}

fn default_cache_capacity() -> usize {
    2000
}

fn default_geocode_ttl() -> u64 {
    7 * 24 * 60 * 60 // 7 dias
}

fn default_route_ttl() -> u64 {
    24 * 60 * 60 // 24 horas
}

/// Batch reconciliation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum rows processed simultaneously.
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// Emit a progress event every N rows.
    #[serde(default = "default_progress_every")]
    pub progress_every_n_rows: usize,

    /// Hard cap on data rows per batch.
    #[serde(default = "default_row_cap")]
    pub row_cap: usize,

    /// Charge the empty return leg (same distance) in the floor.
    #[serde(default)]
    pub include_empty_return: bool,

    /// Cargo type used when the sheet has no cargo column.
    #[serde(default)]
    pub default_cargo_type: CargoType,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: default_concurrency_limit(),
            progress_every_n_rows: default_progress_every(),
            row_cap: default_row_cap(),
            include_empty_return: false,
            default_cargo_type: CargoType::default(),
        }
    }
}

fn default_concurrency_limit() -> usize {
    6
}

fn default_progress_every() -> usize {
    1
}

fn default_row_cap() -> usize {
    10
}

/// Shipment origin settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginConfig {
    /// Origin city when the branch is not mapped.
    #[serde(default = "default_origin_city")]
    pub default_city: String,

    /// Origin state (UF) when the branch is not mapped.
    #[serde(default = "default_origin_state")]
    pub default_state: String,

    /// Extra branch mappings, `"FILIAL" = "CIDADE/UF"`.
    #[serde(default)]
    pub branches: BTreeMap<String, String>,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            default_city: default_origin_city(),
            default_state: default_origin_state(),
            branches: BTreeMap::new(),
        }
    }
}

fn default_origin_city() -> String {
    "São Paulo".to_string()
}

fn default_origin_state() -> String {
    "SP".to_string()
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> FreteResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> FreteResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Creates default configuration.
    pub fn default_config() -> Self {
        Self {
            general: GeneralConfig::default(),
            maps: MapsConfig::default(),
            cache: CacheConfig::default(),
            batch: BatchConfig::default(),
            origin: OriginConfig::default(),
        }
    }

    /// Tries to load configuration from current directory or uses default.
    pub fn load_or_default() -> Self {
        Self::load("pisofrete.toml").unwrap_or_else(|_| Self::default_config())
    }

    /// Applies overrides from the process environment.
    pub fn apply_env(&mut self) -> FreteResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies environment-style overrides from an arbitrary lookup.
    ///
    /// Unset keys keep the current value; unparseable values are an error.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> FreteResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("ORS_API_KEY").or_else(|| lookup("PISOFRETE_API_KEY")) {
            let key = key.trim().to_string();
            self.maps.api_key = if key.is_empty() { None } else { Some(key) };
        }
        if let Some(url) = lookup("PISOFRETE_MAPS_BASE_URL") {
            self.maps.base_url = url;
        }

        override_parsed(&lookup, "PISOFRETE_TIMEOUT_SECS", &mut self.maps.timeout_secs)?;
        override_parsed(&lookup, "PISOFRETE_MAX_CONCURRENCY", &mut self.maps.max_concurrency)?;
        override_parsed(
            &lookup,
            "PISOFRETE_GEOCODE_INTERVAL_MS",
            &mut self.maps.geocode_interval_ms,
        )?;
        override_parsed(
            &lookup,
            "PISOFRETE_ROUTE_INTERVAL_MS",
            &mut self.maps.route_interval_ms,
        )?;
        override_parsed(
            &lookup,
            "PISOFRETE_GEOCODE_CACHE_CAPACITY",
            &mut self.cache.geocode_capacity,
        )?;
        override_parsed(
            &lookup,
            "PISOFRETE_ROUTE_CACHE_CAPACITY",
            &mut self.cache.route_capacity,
        )?;
        override_parsed(&lookup, "PISOFRETE_GEOCODE_TTL_SECS", &mut self.cache.geocode_ttl_secs)?;
        override_parsed(&lookup, "PISOFRETE_ROUTE_TTL_SECS", &mut self.cache.route_ttl_secs)?;
        override_parsed(
            &lookup,
            "PISOFRETE_CONCURRENCY_LIMIT",
            &mut self.batch.concurrency_limit,
        )?;
        override_parsed(
            &lookup,
            "PISOFRETE_PROGRESS_EVERY",
            &mut self.batch.progress_every_n_rows,
        )?;
        override_parsed(&lookup, "PISOFRETE_ROW_CAP", &mut self.batch.row_cap)?;

        self.validate()
    }

    /// Rejects values that would stall the pipeline.
    pub fn validate(&self) -> FreteResult<()> {
        if self.maps.max_concurrency == 0 {
            return Err(FreteError::config("maps.max_concurrency deve ser >= 1"));
        }
        if self.batch.concurrency_limit == 0 {
            return Err(FreteError::config("batch.concurrency_limit deve ser >= 1"));
        }
        if self.batch.progress_every_n_rows == 0 {
            return Err(FreteError::config("batch.progress_every_n_rows deve ser >= 1"));
        }
        if self.batch.row_cap == 0 {
            return Err(FreteError::config("batch.row_cap deve ser >= 1"));
        }
        if self.maps.timeout_secs == 0 {
            return Err(FreteError::config("maps.timeout_secs deve ser >= 1"));
        }
        Ok(())
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T) -> FreteResult<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|_| FreteError::config(format!("valor inválido para {}: '{}'", key, raw)))?;
    }
    Ok(())
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
