//! Sensor values and topic streams
//!
//! A topic resolves to a push stream of [`SensorValue`]s through a
//! [`StreamSource`]. Values are plain numbers; anything non-numeric becomes
//! NaN, which fails every comparison the controller makes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::{Stream, StreamExt};

/// A scalar reading from a sensor topic
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorValue(f64);

impl SensorValue {
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    /// Placeholder for a value that is not a number
    pub const fn missing() -> Self {
        Self(f64::NAN)
    }

    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// Integer part of the value, truncated toward zero
    pub fn truncated(self) -> f64 {
        self.0.trunc()
    }

    /// Whether the value reads as an "on" flag: a non-zero integer part
    pub fn is_truthy(self) -> bool {
        let t = self.truncated();
        !t.is_nan() && t != 0.0
    }

    /// Equality for duplicate suppression; two NaNs count as the same
    pub fn same_as(self, other: SensorValue) -> bool {
        self.0 == other.0 || (self.0.is_nan() && other.0.is_nan())
    }

    /// Coerce a JSON value as delivered by the bus
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Bool(b) => Self::from(*b),
            serde_json::Value::Number(n) => n.as_f64().map(Self).unwrap_or_else(Self::missing),
            serde_json::Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(Self)
                .unwrap_or_else(|_| Self::missing()),
            _ => Self::missing(),
        }
    }
}

impl From<f64> for SensorValue {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl From<i64> for SensorValue {
    fn from(value: i64) -> Self {
        Self(value as f64)
    }
}

impl From<bool> for SensorValue {
    fn from(value: bool) -> Self {
        Self(if value { 1.0 } else { 0.0 })
    }
}

/// Push stream of values for one topic
pub type SensorStream = Pin<Box<dyn Stream<Item = SensorValue> + Send>>;

/// Drop values equal to the immediately preceding one
pub fn skip_duplicates(stream: SensorStream) -> SensorStream {
    let mut last: Option<SensorValue> = None;
    Box::pin(stream.filter(move |value| {
        if matches!(last, Some(prev) if prev.same_as(*value)) {
            return false;
        }
        last = Some(*value);
        true
    }))
}

/// Resolves topic paths into live value streams
#[async_trait]
pub trait StreamSource: Send + Sync {
    /// The stream for `topic`, or `None` when the topic is unavailable.
    /// Dropping the stream releases the subscription.
    async fn get_stream(&self, topic: &str) -> Option<SensorStream>;
}

/// In-memory stream source fed through channels.
///
/// Each registered topic can be resolved once; the returned sender reports
/// `is_closed()` after the consumer drops its stream.
#[derive(Debug, Default)]
pub struct ChannelStreamSource {
    pending: Mutex<HashMap<String, mpsc::UnboundedReceiver<SensorValue>>>,
}

impl ChannelStreamSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `topic` resolvable and return the sender feeding it
    pub fn register(&self, topic: &str) -> mpsc::UnboundedSender<SensorValue> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut pending) = self.pending.lock() {
            pending.insert(topic.to_string(), rx);
        }
        tx
    }

    /// Whether `topic` is registered and not yet resolved
    pub fn is_pending(&self, topic: &str) -> bool {
        self.pending
            .lock()
            .map(|p| p.contains_key(topic))
            .unwrap_or(false)
    }
}

#[async_trait]
impl StreamSource for ChannelStreamSource {
    async fn get_stream(&self, topic: &str) -> Option<SensorStream> {
        let rx = self.pending.lock().ok()?.remove(topic)?;
        Some(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn enable_flag_truthiness() {
        assert!(SensorValue::new(1.0).is_truthy());
        assert!(SensorValue::new(-2.0).is_truthy());
        assert!(!SensorValue::new(0.0).is_truthy());
        // Integer part of 0.9 is zero
        assert!(!SensorValue::new(0.9).is_truthy());
        assert!(!SensorValue::missing().is_truthy());
    }

    #[test]
    fn json_coercion() {
        assert_eq!(SensorValue::from_json(&json!(true)).as_f64(), 1.0);
        assert_eq!(SensorValue::from_json(&json!(0.75)).as_f64(), 0.75);
        assert_eq!(SensorValue::from_json(&json!(" 250 ")).as_f64(), 250.0);
        assert!(SensorValue::from_json(&json!("n/a")).as_f64().is_nan());
        assert!(SensorValue::from_json(&json!(null)).as_f64().is_nan());
        assert!(SensorValue::from_json(&json!([])).as_f64().is_nan());
    }

    #[tokio::test]
    async fn skip_duplicates_drops_repeats_only() {
        let input: SensorStream = Box::pin(tokio_stream::iter(
            [1.0, 1.0, 2.0, 2.0, 1.0, f64::NAN, f64::NAN]
                .into_iter()
                .map(SensorValue::new),
        ));
        let out: Vec<SensorValue> = skip_duplicates(input).collect().await;
        assert_eq!(out.len(), 4);
        assert_eq!(out[0].as_f64(), 1.0);
        assert_eq!(out[1].as_f64(), 2.0);
        assert_eq!(out[2].as_f64(), 1.0);
        assert!(out[3].as_f64().is_nan());
    }

    #[tokio::test]
    async fn channel_source_resolves_once() {
        let source = ChannelStreamSource::new();
        let tx = source.register("svc/Soc");
        assert!(source.is_pending("svc/Soc"));

        let mut stream = source.get_stream("svc/Soc").await.unwrap();
        assert!(source.get_stream("svc/Soc").await.is_none());
        assert!(source.get_stream("svc/Unknown").await.is_none());

        tx.send(SensorValue::new(0.5)).unwrap();
        assert_eq!(stream.next().await, Some(SensorValue::new(0.5)));

        drop(stream);
        assert!(tx.is_closed());
    }
}
