//! Error types for the solar hot water controller
//!
//! Startup problems are reported through the status sink rather than
//! propagated to the host process; these types carry them until then.

use thiserror::Error;

/// Result type alias for controller operations
pub type Result<T> = std::result::Result<T, SolarHotWaterError>;

/// Main error type for the controller
#[derive(Debug, Error)]
pub enum SolarHotWaterError {
    /// Configuration absent or missing required fields
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A sensor topic could not be resolved to a live stream
    #[error("cannot connect to {stream} on '{path}'")]
    StreamUnavailable { stream: String, path: String },

    /// D-Bus communication errors
    #[error("D-Bus error: {message}")]
    DBus { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Timeout errors
    #[error("Timeout error: {message}")]
    Timeout { message: String },
}

impl SolarHotWaterError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        SolarHotWaterError::Config {
            message: message.into(),
        }
    }

    /// Create a new stream-unavailable error naming the input and its topic path
    pub fn stream_unavailable<S: Into<String>>(stream: S, path: S) -> Self {
        SolarHotWaterError::StreamUnavailable {
            stream: stream.into(),
            path: path.into(),
        }
    }

    /// Create a new D-Bus error
    pub fn dbus<S: Into<String>>(message: S) -> Self {
        SolarHotWaterError::DBus {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        SolarHotWaterError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        SolarHotWaterError::Io {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        SolarHotWaterError::Timeout {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for SolarHotWaterError {
    fn from(err: std::io::Error) -> Self {
        SolarHotWaterError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for SolarHotWaterError {
    fn from(err: serde_yaml::Error) -> Self {
        SolarHotWaterError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for SolarHotWaterError {
    fn from(err: serde_json::Error) -> Self {
        SolarHotWaterError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<zbus::Error> for SolarHotWaterError {
    fn from(err: zbus::Error) -> Self {
        SolarHotWaterError::dbus(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = SolarHotWaterError::config("test config error");
        assert!(matches!(err, SolarHotWaterError::Config { .. }));

        let err = SolarHotWaterError::stream_unavailable(
            "solar power stream",
            "com.victronenergy.system/Dc/Pv/Power",
        );
        assert!(matches!(err, SolarHotWaterError::StreamUnavailable { .. }));

        let err = SolarHotWaterError::validation("field", "test validation error");
        assert!(matches!(err, SolarHotWaterError::Validation { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = SolarHotWaterError::config("test error");
        assert_eq!(format!("{}", err), "Configuration error: test error");

        let err = SolarHotWaterError::validation("test_field", "invalid value");
        assert_eq!(
            format!("{}", err),
            "Validation error: test_field - invalid value"
        );

        let err = SolarHotWaterError::stream_unavailable("battery SOC stream", "svc/Soc");
        assert_eq!(
            format!("{}", err),
            "cannot connect to battery SOC stream on 'svc/Soc'"
        );
    }
}
