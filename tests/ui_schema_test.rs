#[test]
fn ui_schema_has_expected_sections_and_fields() {
    let schema = solarhotwater::ui_schema::build_ui_schema();
    assert_eq!(schema["id"], "solarhotwater");

    let sections = schema.get("sections").and_then(|v| v.as_object()).unwrap();
    for key in ["controller", "logging", "dbus"] {
        assert!(sections.get(key).is_some(), "missing section: {}", key);
    }

    let controller = sections.get("controller").unwrap().get("fields").unwrap();
    for field in [
        "enable_path",
        "battery_soc_path",
        "solar_power_path",
        "output_path",
        "battery_soc_start_threshold",
        "battery_soc_stop_threshold",
        "solar_power_threshold",
    ] {
        assert!(controller.get(field).is_some(), "missing field: {}", field);
    }
}
