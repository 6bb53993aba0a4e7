use zbus::zvariant::{OwnedValue, Value};

use crate::sensor::SensorValue;

pub(crate) fn serde_to_owned_value(v: &serde_json::Value) -> OwnedValue {
    match v {
        serde_json::Value::Null => OwnedValue::from(0i64),
        serde_json::Value::Bool(b) => OwnedValue::from(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                // Venus relay and switch items expect 32-bit integers
                match i32::try_from(i) {
                    Ok(small) => OwnedValue::from(small),
                    Err(_) => OwnedValue::from(i),
                }
            } else if let Some(u) = n.as_u64() {
                OwnedValue::from(u)
            } else {
                OwnedValue::from(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => OwnedValue::try_from(Value::from(s.as_str()))
            .unwrap_or_else(|_| OwnedValue::from(0i64)),
        _ => OwnedValue::from(0i64),
    }
}

pub(crate) fn owned_value_to_serde(v: &OwnedValue) -> serde_json::Value {
    if let Ok(b) = <bool as TryFrom<&OwnedValue>>::try_from(v) {
        return serde_json::json!(b);
    }
    if let Ok(i) = <i32 as TryFrom<&OwnedValue>>::try_from(v) {
        return serde_json::json!(i);
    }
    if let Ok(i) = <i64 as TryFrom<&OwnedValue>>::try_from(v) {
        return serde_json::json!(i);
    }
    if let Ok(u) = <u64 as TryFrom<&OwnedValue>>::try_from(v) {
        return serde_json::json!(u);
    }
    if let Ok(f) = <f64 as TryFrom<&OwnedValue>>::try_from(v) {
        return serde_json::json!(f);
    }
    if let Ok(s) = <&str as TryFrom<&OwnedValue>>::try_from(v) {
        return serde_json::json!(s.to_string());
    }
    // Venus reports an invalid item as an empty array
    serde_json::Value::Null
}

pub(crate) fn owned_value_to_sensor(v: &OwnedValue) -> SensorValue {
    SensorValue::from_json(&owned_value_to_serde(v))
}
