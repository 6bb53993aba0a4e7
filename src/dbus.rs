//! D-Bus integration for Venus OS
//!
//! Sensor topics are Venus bus items (`com.victronenergy.BusItem`). A topic
//! resolves to a stream that starts with the item's current value and then
//! follows its `PropertiesChanged` signal. The relay command is written back
//! with `SetValue`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use zbus::Connection;
use zbus::zvariant::OwnedValue;

use crate::config::{BusKind, DbusConfig};
use crate::controller::RelayCommand;
use crate::error::{Result, SolarHotWaterError};
use crate::logging::{LogContext, StructuredLogger, get_logger, get_logger_with_context};
use crate::sensor::{SensorStream, StreamSource};

pub mod topic;
pub(crate) mod values;

pub use topic::Topic;

/// Interface implemented by every Venus bus item
pub const BUS_ITEM_INTERFACE: &str = "com.victronenergy.BusItem";

/// Connection to the Venus OS message bus
#[derive(Clone)]
pub struct VenusBus {
    connection: Connection,
    call_timeout: Duration,
    logger: StructuredLogger,
}

impl VenusBus {
    /// Connect to the configured bus
    pub async fn connect(config: &DbusConfig) -> Result<Self> {
        let logger = get_logger("dbus");
        let connection = match config.bus {
            BusKind::System => Connection::system().await?,
            BusKind::Session => Connection::session().await?,
            BusKind::Auto => match Connection::system().await {
                Ok(c) => {
                    logger.info("Connected to D-Bus: system bus");
                    c
                }
                Err(e_sys) => match Connection::session().await {
                    Ok(c) => {
                        logger.warn(&format!(
                            "System bus unavailable ({}); using session bus",
                            e_sys
                        ));
                        c
                    }
                    Err(e_sess) => {
                        return Err(SolarHotWaterError::dbus(format!(
                            "DBus connect failed: system={} session={}",
                            e_sys, e_sess
                        )));
                    }
                },
            },
        };
        Ok(Self::from_connection(
            connection,
            Duration::from_millis(config.call_timeout_ms),
        ))
    }

    pub fn from_connection(connection: Connection, call_timeout: Duration) -> Self {
        Self {
            connection,
            call_timeout,
            logger: get_logger("dbus"),
        }
    }

    async fn proxy(&self, topic: &Topic) -> Result<zbus::Proxy<'static>> {
        tokio::time::timeout(
            self.call_timeout,
            zbus::Proxy::new(
                &self.connection,
                topic.service().to_string(),
                topic.path().to_string(),
                BUS_ITEM_INTERFACE,
            ),
        )
        .await
        .map_err(|_| SolarHotWaterError::timeout(format!("Proxy creation for {} timed out", topic)))?
        .map_err(|e| SolarHotWaterError::dbus(format!("Proxy creation for {} failed: {}", topic, e)))
    }

    async fn get_value(&self, proxy: &zbus::Proxy<'static>, topic: &Topic) -> Result<OwnedValue> {
        tokio::time::timeout(self.call_timeout, proxy.call("GetValue", &()))
            .await
            .map_err(|_| SolarHotWaterError::timeout(format!("GetValue on {} timed out", topic)))?
            .map_err(|e| SolarHotWaterError::dbus(format!("GetValue on {} failed: {}", topic, e)))
    }

    /// Write a bus item; a non-zero reply from the item is an error
    pub async fn set_value(&self, topic: &Topic, value: &serde_json::Value) -> Result<()> {
        let proxy = self.proxy(topic).await?;
        let body = (values::serde_to_owned_value(value),);
        let rc: i32 = tokio::time::timeout(self.call_timeout, proxy.call("SetValue", &body))
            .await
            .map_err(|_| SolarHotWaterError::timeout(format!("SetValue on {} timed out", topic)))?
            .map_err(|e| SolarHotWaterError::dbus(format!("SetValue on {} failed: {}", topic, e)))?;
        if rc != 0 {
            return Err(SolarHotWaterError::dbus(format!(
                "SetValue on {} rejected with code {}",
                topic, rc
            )));
        }
        Ok(())
    }

    /// Follow a bus item: its current value, then every change
    pub async fn subscribe(&self, topic: &Topic) -> Result<SensorStream> {
        let proxy = self.proxy(topic).await?;
        // Match rule first so no change between the read and the subscription is lost
        let signals = proxy.receive_signal("PropertiesChanged").await?;
        let initial = values::owned_value_to_sensor(&self.get_value(&proxy, topic).await?);

        let changes = signals.filter_map(|msg| {
            let body = msg.body();
            let props: HashMap<String, OwnedValue> = body.deserialize().ok()?;
            props.get("Value").map(values::owned_value_to_sensor)
        });
        Ok(Box::pin(tokio_stream::once(initial).chain(changes)))
    }
}

#[async_trait]
impl StreamSource for VenusBus {
    async fn get_stream(&self, topic: &str) -> Option<SensorStream> {
        let parsed = match Topic::parse(topic) {
            Ok(t) => t,
            Err(e) => {
                self.logger.warn(&format!("{}", e));
                return None;
            }
        };
        match self.subscribe(&parsed).await {
            Ok(stream) => {
                self.logger.debug(&format!("Subscribed to {}", parsed));
                Some(stream)
            }
            Err(e) => {
                self.logger.warn(&format!("Cannot subscribe to {}: {}", parsed, e));
                None
            }
        }
    }
}

/// Destination of relay writes
#[async_trait]
pub trait ValueWriter: Send + Sync {
    async fn write_value(&self, topic: &Topic, value: serde_json::Value) -> Result<()>;
}

#[async_trait]
impl ValueWriter for VenusBus {
    async fn write_value(&self, topic: &Topic, value: serde_json::Value) -> Result<()> {
        self.set_value(topic, &value).await
    }
}

/// Drain relay commands into `writer` until every sender is dropped.
///
/// Failures are logged and the next command is processed; nothing is retried.
pub fn spawn_command_writer<W: ValueWriter + 'static>(
    writer: Arc<W>,
    mut rx: mpsc::UnboundedReceiver<RelayCommand>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let logger = get_logger_with_context(LogContext::new("relay"));
        while let Some(cmd) = rx.recv().await {
            let topic = match Topic::parse(&cmd.output_path) {
                Ok(t) => t,
                Err(e) => {
                    logger.error(&format!("Relay output path invalid: {}", e));
                    continue;
                }
            };
            if let Err(e) = writer
                .write_value(&topic, serde_json::json!(cmd.value))
                .await
            {
                logger.warn(&format!("Relay write to {} failed: {}", topic, e));
            }
        }
        logger.debug("Relay command channel closed");
    })
}
