//! Typed configuration schema, as delivered to the core per specification
//! §6. Loading the schema from disk (TOML/YAML/etc.) is out of scope — only
//! the resulting typed struct and its startup validation live here.

use std::collections::HashSet;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::model::Severity;

#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectBackoff {
    pub init_ms: u64,
    pub cap_ms: u64,
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self {
            init_ms: 500,
            cap_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TcpClientConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_timeout_s")]
    pub timeout_s: u64,
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
    #[serde(default)]
    pub reconnect_backoff: ReconnectBackoff,
}

fn default_timeout_s() -> u64 {
    10
}
fn default_max_line_bytes() -> usize {
    1024 * 1024
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    pub tcp_client: TcpClientConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScalarSensorConfig {
    pub name: String,
    #[serde(default)]
    pub units: String,
    pub low_limit: f64,
    pub high_limit: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpectralSensorConfig {
    pub name: String,
    pub length: usize,
    #[serde(default)]
    pub reference_peak_index: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SensorsConfig {
    #[serde(default)]
    pub scalar_configs: Vec<ScalarSensorConfig>,
    #[serde(default)]
    pub spectral_configs: Vec<SpectralSensorConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TempDiffConfig {
    pub enabled: bool,
    pub pair: (String, String),
    pub delta: f64,
    #[serde(default)]
    pub severity: Severity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FtirPeakShiftConfig {
    pub enabled: bool,
    pub channel: String,
    pub tolerance_bins: usize,
    #[serde(default)]
    pub severity: Severity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlarmsConfig {
    #[serde(default)]
    pub value_eps: f64,
    #[serde(default = "default_true")]
    pub enable_scalar_limits: bool,
    #[serde(default)]
    pub temp_diff: Option<TempDiffConfig>,
    #[serde(default)]
    pub ftir_peak_shift: Option<FtirPeakShiftConfig>,
    #[serde(default)]
    pub stale_timeout_s: Option<u64>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    #[serde(default)]
    pub bearer_token: Option<String>,
    #[serde(default = "default_true")]
    pub verify_tls: bool,
    #[serde(default = "default_connect_timeout_s")]
    pub connect_timeout_s: u64,
    #[serde(default = "default_total_timeout_s")]
    pub total_timeout_s: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
}

fn default_connect_timeout_s() -> u64 {
    5
}
fn default_total_timeout_s() -> u64 {
    10
}
fn default_retries() -> u32 {
    3
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    pub webhook: WebhookConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueuesConfig {
    #[serde(default = "default_readings_capacity")]
    pub readings_capacity: usize,
    #[serde(default = "default_notifications_capacity")]
    pub notifications_capacity: usize,
}

fn default_readings_capacity() -> usize {
    1024
}
fn default_notifications_capacity() -> usize {
    512
}

impl Default for QueuesConfig {
    fn default() -> Self {
        Self {
            readings_capacity: default_readings_capacity(),
            notifications_capacity: default_notifications_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub transport: TransportConfig,
    pub sensors: SensorsConfig,
    pub alarms: AlarmsConfig,
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub queues: QueuesConfig,
}

impl Config {
    /// Startup-only validation. Never called after the pipeline is running —
    /// a bad reading or a bad webhook response is handled by the steady-state
    /// error policy, never by re-validating configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for s in &self.sensors.scalar_configs {
            if s.name.trim().is_empty() {
                return Err(ConfigError::EmptySensorName(s.name.clone()));
            }
            if !seen.insert(s.name.clone()) {
                return Err(ConfigError::DuplicateSensorName(s.name.clone()));
            }
            if !(s.low_limit < s.high_limit) {
                return Err(ConfigError::InvalidLimits {
                    sensor: s.name.clone(),
                    low: s.low_limit,
                    high: s.high_limit,
                });
            }
        }
        for s in &self.sensors.spectral_configs {
            if s.name.trim().is_empty() {
                return Err(ConfigError::EmptySensorName(s.name.clone()));
            }
            if !seen.insert(s.name.clone()) {
                return Err(ConfigError::DuplicateSensorName(s.name.clone()));
            }
        }

        if let Some(td) = &self.alarms.temp_diff {
            if td.enabled {
                let scalar_names: HashSet<&str> = self
                    .sensors
                    .scalar_configs
                    .iter()
                    .map(|s| s.name.as_str())
                    .collect();
                if !scalar_names.contains(td.pair.0.as_str()) {
                    return Err(ConfigError::UnknownTempDiffSensor(td.pair.0.clone()));
                }
                if !scalar_names.contains(td.pair.1.as_str()) {
                    return Err(ConfigError::UnknownTempDiffSensor(td.pair.1.clone()));
                }
            }
        }

        if let Some(ftir) = &self.alarms.ftir_peak_shift {
            if ftir.enabled {
                let spectral_names: HashSet<&str> = self
                    .sensors
                    .spectral_configs
                    .iter()
                    .map(|s| s.name.as_str())
                    .collect();
                if !spectral_names.contains(ftir.channel.as_str()) {
                    return Err(ConfigError::UnknownSpectralChannel(ftir.channel.clone()));
                }
            }
        }

        if self.transport.tcp_client.timeout_s == 0 {
            return Err(ConfigError::NonPositive {
                field: "transport.tcp_client.timeout_s",
                value: 0.0,
            });
        }
        if self.notifications.webhook.connect_timeout_s == 0 {
            return Err(ConfigError::NonPositive {
                field: "notifications.webhook.connect_timeout_s",
                value: 0.0,
            });
        }
        if self.notifications.webhook.total_timeout_s == 0 {
            return Err(ConfigError::NonPositive {
                field: "notifications.webhook.total_timeout_s",
                value: 0.0,
            });
        }
        if self.queues.readings_capacity == 0 || self.queues.notifications_capacity == 0 {
            return Err(ConfigError::NonPositive {
                field: "queues.*_capacity",
                value: 0.0,
            });
        }

        Ok(())
    }
}
