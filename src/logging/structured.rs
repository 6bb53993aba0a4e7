use std::collections::BTreeMap;
use tracing::{debug, error, info, trace, warn};

use crate::PLUGIN_ID;

/// Context information for log messages
#[derive(Debug, Clone)]
pub struct LogContext {
    /// Component name (e.g., "controller", "dbus", "combiner")
    pub component: String,
    /// Topic path the messages relate to, if any
    pub topic: Option<String>,
    /// Additional context fields, emitted in key order
    pub extra_fields: BTreeMap<String, String>,
}

impl LogContext {
    pub fn new(component: &str) -> Self {
        Self {
            component: component.to_string(),
            topic: None,
            extra_fields: BTreeMap::new(),
        }
    }

    pub fn with_topic(mut self, topic: &str) -> Self {
        self.topic = Some(topic.to_string());
        self
    }

    pub fn with_field(mut self, key: &str, value: String) -> Self {
        self.extra_fields.insert(key.to_string(), value);
        self
    }
}

/// Structured logger with context
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    pub(crate) context: LogContext,
}

impl StructuredLogger {
    pub fn new(context: LogContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &LogContext {
        &self.context
    }

    pub fn info(&self, message: &str) {
        let fields = self.format_fields();
        info!(%fields, "{}", message);
    }
    pub fn warn(&self, message: &str) {
        let fields = self.format_fields();
        warn!(%fields, "{}", message);
    }
    pub fn error(&self, message: &str) {
        let fields = self.format_fields();
        error!(%fields, "{}", message);
    }
    pub fn debug(&self, message: &str) {
        let fields = self.format_fields();
        debug!(%fields, "{}", message);
    }
    pub fn trace(&self, message: &str) {
        let fields = self.format_fields();
        trace!(%fields, "{}", message);
    }

    pub(crate) fn format_fields(&self) -> String {
        let mut fields = vec![
            format!("plugin={}", PLUGIN_ID),
            format!("component={}", self.context.component),
        ];
        if let Some(ref topic) = self.context.topic {
            fields.push(format!("topic={}", topic));
        }
        for (key, value) in &self.context.extra_fields {
            fields.push(format!("{}={}", key, value));
        }
        fields.join(",")
    }
}

/// Create a logger for a specific component
pub fn get_logger(component: &str) -> StructuredLogger {
    StructuredLogger::new(LogContext::new(component))
}

/// Create a logger with full context
pub fn get_logger_with_context(context: LogContext) -> StructuredLogger {
    StructuredLogger::new(context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_context() {
        let context = LogContext::new("dbus")
            .with_topic("com.victronenergy.system/Dc/Pv/Power")
            .with_field("bus", "system".to_string());

        assert_eq!(context.component, "dbus");
        assert_eq!(
            context.topic.as_deref(),
            Some("com.victronenergy.system/Dc/Pv/Power")
        );
        assert_eq!(context.extra_fields.get("bus"), Some(&"system".to_string()));
    }

    #[test]
    fn test_format_fields_order() {
        let logger = get_logger_with_context(
            LogContext::new("controller")
                .with_field("b", "2".to_string())
                .with_field("a", "1".to_string()),
        );
        assert_eq!(
            logger.format_fields(),
            "plugin=solarhotwater,component=controller,a=1,b=2"
        );
    }
}
