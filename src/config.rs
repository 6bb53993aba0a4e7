//! Configuration management for the solar hot water controller
//!
//! Loads the YAML configuration, validates it and exposes the JSON schema
//! the host uses to present the settings form.

use crate::error::{Result, SolarHotWaterError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod defaults;

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "SOLARHOTWATER_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// Heater controller settings; absent means the controller stays inactive
    pub controller: Option<ControllerConfig>,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// D-Bus connection settings
    pub dbus: DbusConfig,
}

/// Topics and thresholds driving the heater relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ControllerConfig {
    /// Optional manual enable switch topic (non-zero enables heating)
    pub enable_path: Option<String>,

    /// Battery state of charge topic, reported as a fraction in [0, 1]
    pub battery_soc_path: String,

    /// Solar generation power topic in watts
    pub solar_power_path: String,

    /// Relay output topic receiving 0/1
    pub output_path: String,

    /// SOC percentage at or above which heating is permitted
    pub battery_soc_start_threshold: Option<f64>,

    /// SOC percentage at or below which heating is withheld
    pub battery_soc_stop_threshold: Option<f64>,

    /// Solar power in watts that must be exceeded to switch the heater on
    pub solar_power_threshold: Option<f64>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional console-specific level
    pub console_level: Option<String>,

    /// Optional file-specific level
    pub file_level: Option<String>,

    /// Log file path or directory
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// Which message bus to connect to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BusKind {
    /// System bus, falling back to the session bus
    #[default]
    Auto,
    System,
    Session,
}

/// D-Bus connection settings
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DbusConfig {
    /// Bus selection
    pub bus: BusKind,

    /// Timeout for proxy creation and remote calls in milliseconds
    pub call_timeout_ms: u64,
}

fn require_path(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SolarHotWaterError::config(format!(
            "missing required field '{}'",
            field
        )));
    }
    Ok(())
}

fn require_threshold(field: &str, value: Option<f64>) -> Result<f64> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        Some(_) => Err(SolarHotWaterError::config(format!(
            "field '{}' must be a finite number",
            field
        ))),
        None => Err(SolarHotWaterError::config(format!(
            "missing required field '{}'",
            field
        ))),
    }
}

impl ControllerConfig {
    /// The configured enable topic, treating an empty string as unset
    pub fn enable_topic(&self) -> Option<&str> {
        self.enable_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    /// Check required fields and the hysteresis band
    pub fn validate(&self) -> Result<()> {
        require_path("battery_soc_path", &self.battery_soc_path)?;
        require_path("solar_power_path", &self.solar_power_path)?;
        require_path("output_path", &self.output_path)?;
        let start = require_threshold(
            "battery_soc_start_threshold",
            self.battery_soc_start_threshold,
        )?;
        let stop = require_threshold(
            "battery_soc_stop_threshold",
            self.battery_soc_stop_threshold,
        )?;
        require_threshold("solar_power_threshold", self.solar_power_threshold)?;
        if stop >= start {
            return Err(SolarHotWaterError::config(format!(
                "battery_soc_stop_threshold ({}) must be below battery_soc_start_threshold ({})",
                stop, start
            )));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the environment override or default locations
    pub fn load() -> Result<Self> {
        match Self::locate() {
            Some(path) => Self::from_file(path),
            None => Ok(Config::default()),
        }
    }

    /// Like [`Config::load`], but an unreadable or malformed file yields the
    /// defaults (no controller section) together with the load error
    pub fn load_or_default() -> (Self, Option<SolarHotWaterError>) {
        match Self::locate() {
            Some(path) => Self::from_file_or_default(path),
            None => (Config::default(), None),
        }
    }

    /// Read `path`, falling back to the defaults on failure
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> (Self, Option<SolarHotWaterError>) {
        match Self::from_file(path) {
            Ok(config) => (config, None),
            Err(e) => (Config::default(), Some(e)),
        }
    }

    fn locate() -> Option<PathBuf> {
        if let Some(explicit) = std::env::var_os(CONFIG_ENV_VAR) {
            return Some(PathBuf::from(explicit));
        }

        let default_paths = [
            "solarhotwater.yaml",
            "/data/solarhotwater.yaml",
            "/etc/solarhotwater/config.yaml",
        ];

        default_paths
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// JSON schema of the configuration file
    pub fn json_schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(Config)).unwrap_or(serde_json::Value::Null)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        crate::logging::parse_log_level(&self.logging.level).map_err(|_| {
            SolarHotWaterError::validation(
                "logging.level".to_string(),
                format!("Unknown level '{}'", self.logging.level),
            )
        })?;

        if self.dbus.call_timeout_ms == 0 {
            return Err(SolarHotWaterError::validation(
                "dbus.call_timeout_ms",
                "Must be greater than 0",
            ));
        }

        if let Some(controller) = &self.controller {
            controller.validate()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> ControllerConfig {
        ControllerConfig {
            enable_path: Some("com.victronenergy.settings/Settings/Heater/Enable".to_string()),
            battery_soc_path: "com.victronenergy.battery/Soc".to_string(),
            solar_power_path: "com.victronenergy.system/Dc/Pv/Power".to_string(),
            output_path: "com.victronenergy.system/Relay/1/State".to_string(),
            battery_soc_start_threshold: Some(70.0),
            battery_soc_stop_threshold: Some(40.0),
            solar_power_threshold: Some(200.0),
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.controller.is_none());
        assert_eq!(config.dbus.bus, BusKind::Auto);
        assert_eq!(config.dbus.call_timeout_ms, 600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_controller_validation() {
        assert!(controller().validate().is_ok());

        let mut c = controller();
        c.battery_soc_path.clear();
        assert!(c.validate().is_err());

        let mut c = controller();
        c.solar_power_threshold = None;
        assert!(c.validate().is_err());

        let mut c = controller();
        c.battery_soc_stop_threshold = Some(70.0);
        let err = c.validate().unwrap_err();
        assert!(format!("{}", err).contains("must be below"));
    }

    #[test]
    fn test_enable_topic_treats_blank_as_unset() {
        let mut c = controller();
        assert!(c.enable_topic().is_some());
        c.enable_path = Some("  ".to_string());
        assert!(c.enable_topic().is_none());
        c.enable_path = None;
        assert!(c.enable_topic().is_none());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config {
            controller: Some(controller()),
            ..Default::default()
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        let deserialized: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(deserialized.controller, Some(controller()));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "controller:\n  battery_soc_path: svc/Soc\n  battery_soc_start_threshold: 80\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let c = config.controller.unwrap();
        assert_eq!(c.battery_soc_path, "svc/Soc");
        assert_eq!(c.battery_soc_start_threshold, Some(80.0));
        assert!(c.solar_power_threshold.is_none());
        assert_eq!(config.logging.level, "INFO");
    }

    #[test]
    fn test_from_file_or_default_keeps_error() {
        let (config, err) = Config::from_file_or_default("/nonexistent/solarhotwater.yaml");
        assert!(config.controller.is_none());
        assert!(matches!(err, Some(SolarHotWaterError::Io { .. })));
    }

    #[test]
    fn test_json_schema_lists_sections() {
        let schema = Config::json_schema();
        let text = schema.to_string();
        assert!(text.contains("controller"));
        assert!(text.contains("battery_soc_start_threshold"));
    }
}
