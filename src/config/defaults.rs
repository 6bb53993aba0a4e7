use super::*;

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            enable_path: None,
            battery_soc_path: String::new(),
            solar_power_path: String::new(),
            output_path: String::new(),
            battery_soc_start_threshold: None,
            battery_soc_stop_threshold: None,
            solar_power_threshold: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/solarhotwater.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for DbusConfig {
    fn default() -> Self {
        Self {
            bus: BusKind::default(),
            call_timeout_ms: 600,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            controller: None,
            logging: LoggingConfig::default(),
            dbus: DbusConfig::default(),
        }
    }
}
