use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SolarHotWaterError};

/// A bus item address: `<service>/<object path>`,
/// e.g. `com.victronenergy.system/Dc/Battery/Soc`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic {
    service: String,
    path: String,
}

impl Topic {
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = |why: &str| {
            SolarHotWaterError::validation("topic".to_string(), format!("'{}' {}", s, why))
        };

        let idx = s.find('/').ok_or_else(|| invalid("has no object path"))?;
        let (service, path) = s.split_at(idx);
        if service.is_empty() || !service.contains('.') {
            return Err(invalid("has no service name"));
        }
        if path.len() <= 1 || path.ends_with('/') || path.contains("//") {
            return Err(invalid("has an invalid object path"));
        }
        Ok(Self {
            service: service.to_string(),
            path: path.to_string(),
        })
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl FromStr for Topic {
    type Err = SolarHotWaterError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.service, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_service_and_path() {
        let t: Topic = "com.victronenergy.system/Dc/Battery/Soc".parse().unwrap();
        assert_eq!(t.service(), "com.victronenergy.system");
        assert_eq!(t.path(), "/Dc/Battery/Soc");
        assert_eq!(t.to_string(), "com.victronenergy.system/Dc/Battery/Soc");
    }

    #[test]
    fn rejects_malformed_topics() {
        for bad in [
            "",
            "com.victronenergy.system",
            "/Dc/Battery/Soc",
            "system/Dc/Soc",
            "com.victronenergy.system/",
            "com.victronenergy.system/Dc//Soc",
            "com.victronenergy.system/Dc/Soc/",
        ] {
            assert!(Topic::parse(bad).is_err(), "accepted '{}'", bad);
        }
    }
}
