//! Output ports of the controller
//!
//! Both sinks are fire-and-forget: the controller never awaits or retries a
//! write.

use std::sync::Mutex;
use tokio::sync::mpsc;

use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};

/// Receives the relay command
pub trait CommandSink: Send + Sync {
    fn set_command(&self, output_path: &str, heater_on: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Error,
}

/// Receives human-readable status transitions and startup errors
pub trait StatusSink: Send + Sync {
    fn log_status(&self, level: StatusLevel, message: &str);
}

/// A relay write queued for the actuation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayCommand {
    pub output_path: String,
    /// 1 energizes the relay, 0 releases it
    pub value: i32,
}

/// Forwards relay commands onto a channel drained by the bus writer
#[derive(Debug, Clone)]
pub struct ChannelCommandSink {
    tx: mpsc::UnboundedSender<RelayCommand>,
}

impl ChannelCommandSink {
    pub fn new(tx: mpsc::UnboundedSender<RelayCommand>) -> Self {
        Self { tx }
    }
}

impl CommandSink for ChannelCommandSink {
    fn set_command(&self, output_path: &str, heater_on: bool) {
        // A closed channel means the writer is gone; nothing left to actuate
        let _ = self.tx.send(RelayCommand {
            output_path: output_path.to_string(),
            value: i32::from(heater_on),
        });
    }
}

/// Writes status through tracing and remembers the latest plugin status
#[derive(Debug)]
pub struct TracingStatusSink {
    logger: StructuredLogger,
    latest: Mutex<Option<(StatusLevel, String)>>,
}

impl TracingStatusSink {
    pub fn new() -> Self {
        Self {
            logger: get_logger_with_context(LogContext::new("status")),
            latest: Mutex::new(None),
        }
    }

    /// Last reported status, as the host would display it
    pub fn latest(&self) -> Option<(StatusLevel, String)> {
        self.latest.lock().ok().and_then(|l| l.clone())
    }
}

impl Default for TracingStatusSink {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusSink for TracingStatusSink {
    fn log_status(&self, level: StatusLevel, message: &str) {
        match level {
            StatusLevel::Info => self.logger.info(message),
            StatusLevel::Error => self.logger.error(message),
        }
        if let Ok(mut latest) = self.latest.lock() {
            *latest = Some((level, message.to_string()));
        }
    }
}
