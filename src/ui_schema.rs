//! UI-oriented configuration schema
//!
//! Describes the settings form the host renders for this plugin. The field
//! names match the YAML configuration keys.

use serde_json::{Value, json};

use crate::{PLUGIN_DESCRIPTION, PLUGIN_ID, PLUGIN_NAME};

/// Build the settings form schema
pub fn build_ui_schema() -> Value {
    json!({
        "id": PLUGIN_ID,
        "name": PLUGIN_NAME,
        "description": PLUGIN_DESCRIPTION,
        "sections": {
            "controller": {"title": "Heater control", "type": "object", "fields": {
                "enable_path": {"type": "string", "optional": true, "title": "Enable switch topic",
                    "help": "Bus item that enables heating when non-zero; leave empty to always enable"},
                "battery_soc_path": {"type": "string", "title": "Battery SOC topic",
                    "help": "State of charge as a fraction between 0 and 1"},
                "solar_power_path": {"type": "string", "title": "Solar power topic (W)"},
                "output_path": {"type": "string", "title": "Heater relay topic"},
                "battery_soc_start_threshold": {"type": "number", "min": 0.0, "max": 100.0, "step": 1.0,
                    "title": "Start heating at SOC (%)"},
                "battery_soc_stop_threshold": {"type": "number", "min": 0.0, "max": 100.0, "step": 1.0,
                    "title": "Stop heating at SOC (%)"},
                "solar_power_threshold": {"type": "number", "min": 0.0, "step": 10.0,
                    "title": "Minimum solar power (W)"}
            }},
            "logging": {"title": "Logging", "type": "object", "fields": {
                "level": {"type": "enum", "values": ["TRACE","DEBUG","INFO","WARN","ERROR"], "title": "Level"},
                "file": {"type": "string", "title": "File path"},
                "backup_count": {"type": "integer", "min": 1, "title": "Backups"},
                "console_output": {"type": "boolean", "title": "Console output"},
                "json_format": {"type": "boolean", "title": "JSON format"}
            }},
            "dbus": {"title": "D-Bus", "type": "object", "fields": {
                "bus": {"type": "enum", "values": ["auto","system","session"], "title": "Bus"},
                "call_timeout_ms": {"type": "integer", "min": 50, "max": 10000, "title": "Call timeout (ms)"}
            }}
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controller_fields_match_config_keys() {
        let schema = build_ui_schema();
        let fields = schema["sections"]["controller"]["fields"].as_object().unwrap();
        let yaml = serde_yaml::to_value(crate::config::ControllerConfig::default()).unwrap();
        let keys = yaml.as_mapping().unwrap();
        assert_eq!(fields.len(), keys.len());
        for key in keys.keys() {
            let key = key.as_str().unwrap();
            assert!(fields.contains_key(key), "missing field: {}", key);
        }
    }
}
