//! Stream combiner
//!
//! Joins the enable, battery SOC and solar power streams into a single stream
//! of [`CombinedEvent`]s. An event is emitted whenever any input changes,
//! carrying the latest value of every input, once each required input has
//! reported at least one value.

use std::pin::Pin;
use tokio_stream::{Stream, StreamExt, StreamMap};

use crate::sensor::{SensorStream, SensorValue, skip_duplicates};

/// The controller inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Input {
    Enable,
    BatterySoc,
    SolarPower,
}

impl Input {
    /// Name of the input as used in connection errors
    pub fn stream_name(self) -> &'static str {
        match self {
            Input::Enable => "plugin control stream",
            Input::BatterySoc => "battery SOC stream",
            Input::SolarPower => "solar power stream",
        }
    }
}

/// Latest value of every input at the time one of them changed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombinedEvent {
    /// Enable flag; `None` when no enable topic is configured
    pub enabled: Option<SensorValue>,
    /// Battery state of charge as a fraction
    pub soc: SensorValue,
    /// Solar power in watts
    pub power: SensorValue,
}

/// Most recently observed value per input
#[derive(Debug, Clone, Default)]
pub struct LatestValues {
    expects_enable: bool,
    enabled: Option<SensorValue>,
    soc: Option<SensorValue>,
    power: Option<SensorValue>,
}

impl LatestValues {
    pub fn new(expects_enable: bool) -> Self {
        Self {
            expects_enable,
            ..Default::default()
        }
    }

    /// Record a value and return the combined event if all required inputs
    /// have been seen
    pub fn update(&mut self, input: Input, value: SensorValue) -> Option<CombinedEvent> {
        match input {
            Input::Enable if self.expects_enable => self.enabled = Some(value),
            Input::Enable => return None,
            Input::BatterySoc => self.soc = Some(value),
            Input::SolarPower => self.power = Some(value),
        }
        self.current()
    }

    /// The combined event for the values seen so far
    pub fn current(&self) -> Option<CombinedEvent> {
        if self.expects_enable && self.enabled.is_none() {
            return None;
        }
        Some(CombinedEvent {
            enabled: self.enabled,
            soc: self.soc?,
            power: self.power?,
        })
    }
}

/// One stream per input; `enable` is absent without an enable topic
pub struct CombinerInputs {
    pub enable: Option<SensorStream>,
    pub battery_soc: SensorStream,
    pub solar_power: SensorStream,
}

pub type CombinedStream = Pin<Box<dyn Stream<Item = CombinedEvent> + Send>>;

/// Combine the inputs, suppressing repeated values on each of them.
///
/// The combined stream ends when every input has ended.
pub fn combine_latest(inputs: CombinerInputs) -> CombinedStream {
    let mut streams: StreamMap<Input, SensorStream> = StreamMap::new();
    let expects_enable = inputs.enable.is_some();
    if let Some(enable) = inputs.enable {
        streams.insert(Input::Enable, skip_duplicates(enable));
    }
    streams.insert(Input::BatterySoc, skip_duplicates(inputs.battery_soc));
    streams.insert(Input::SolarPower, skip_duplicates(inputs.solar_power));

    let mut latest = LatestValues::new(expects_enable);
    Box::pin(streams.filter_map(move |(input, value)| latest.update(input, value)))
}
