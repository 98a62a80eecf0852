//! Server configuration from environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use detour_core::{RouteSearchConfig, DEFAULT_AVERAGE_SPEED_KMH, DEFAULT_HAZARD_RADIUS_M};
use detour_osm::DEFAULT_OVERPASS_URL;

/// Log output: human-readable lines or one JSON object per event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub log_format: LogFormat,
    pub db_path: String,
    pub db_max_connections: u32,
    pub overpass_url: String,
    pub overpass_timeout_s: u64,
    /// Minimum stored nodes in the padded area before a route is served
    /// without ingesting first.
    pub density_floor: i64,
    pub bbox_padding_km: f64,
    pub hazard_radius_m: f64,
    pub average_speed_kmh: f64,
    pub search_workers: usize,
    pub ingest_retries: u32,
    pub ingest_retry_backoff_ms: u64,
    pub ingest_cooldown_s: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            log_format: LogFormat::Text,
            db_path: "data/detour.db".to_string(),
            db_max_connections: 5,
            overpass_url: DEFAULT_OVERPASS_URL.to_string(),
            overpass_timeout_s: 25,
            density_floor: 50,
            bbox_padding_km: 1.0,
            hazard_radius_m: DEFAULT_HAZARD_RADIUS_M,
            average_speed_kmh: DEFAULT_AVERAGE_SPEED_KMH,
            search_workers: 4,
            ingest_retries: 0,
            ingest_retry_backoff_ms: 500,
            ingest_cooldown_s: 300,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_env("DETOUR_PORT", defaults.server_port),
            log_format: parse_env("DETOUR_LOG_FORMAT", defaults.log_format),
            db_path: env::var("DETOUR_DB_PATH").unwrap_or(defaults.db_path),
            db_max_connections: parse_env("DETOUR_DB_MAX_CONNECTIONS", defaults.db_max_connections)
                .max(1),
            overpass_url: env::var("OVERPASS_URL").unwrap_or(defaults.overpass_url),
            overpass_timeout_s: parse_env("OVERPASS_TIMEOUT_S", defaults.overpass_timeout_s).max(1),
            density_floor: parse_env("DETOUR_DENSITY_FLOOR", defaults.density_floor).max(0),
            bbox_padding_km: parse_env("DETOUR_BBOX_PADDING_KM", defaults.bbox_padding_km).max(0.0),
            hazard_radius_m: parse_env("DETOUR_HAZARD_RADIUS_M", defaults.hazard_radius_m).max(0.0),
            average_speed_kmh: positive_or(
                parse_env("DETOUR_AVERAGE_SPEED_KMH", defaults.average_speed_kmh),
                defaults.average_speed_kmh,
            ),
            search_workers: parse_env("DETOUR_SEARCH_WORKERS", defaults.search_workers).max(1),
            ingest_retries: parse_env("DETOUR_INGEST_RETRIES", defaults.ingest_retries),
            ingest_retry_backoff_ms: parse_env(
                "DETOUR_INGEST_RETRY_BACKOFF_MS",
                defaults.ingest_retry_backoff_ms,
            ),
            ingest_cooldown_s: parse_env("DETOUR_INGEST_COOLDOWN_S", defaults.ingest_cooldown_s),
        }
    }

    pub fn search_config(&self) -> RouteSearchConfig {
        RouteSearchConfig {
            average_speed_kmh: self.average_speed_kmh,
        }
    }

    pub fn overpass_timeout(&self) -> Duration {
        Duration::from_secs(self.overpass_timeout_s)
    }

    pub fn ingest_cooldown(&self) -> Duration {
        Duration::from_secs(self.ingest_cooldown_s)
    }
}

fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn positive_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.density_floor, 50);
        assert_eq!(config.overpass_timeout(), Duration::from_secs(25));
        assert_eq!(config.hazard_radius_m, 50.0);
        assert_eq!(config.search_config().average_speed_kmh, 30.0);
        assert_eq!(config.ingest_retries, 0);
    }

    #[test]
    fn unparsable_values_fall_back() {
        assert_eq!(parse_env("DETOUR_TEST_UNSET_VARIABLE", 7u32), 7);
        assert_eq!(positive_or(-3.0, 30.0), 30.0);
        assert_eq!(positive_or(f64::NAN, 30.0), 30.0);
        assert_eq!(positive_or(45.0, 30.0), 45.0);
    }

    #[test]
    fn log_format_parses_known_names() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!(" pretty ".parse::<LogFormat>(), Ok(LogFormat::Text));
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(Config::default().log_format, LogFormat::Text);
    }
}
