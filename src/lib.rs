//! # Solar hot water controller for Victron Venus OS
//!
//! Decides from streaming battery state of charge and solar generation power
//! (plus an optional manual enable switch) whether a water-heater relay should
//! be energized. The battery is protected by a hysteresis band on SOC, and
//! surplus solar power is diverted into heating water without rapidly cycling
//! the relay.
//!
//! ## Architecture
//!
//! - `sensor`: sensor values, topic streams and the stream source seam
//! - `combiner`: joins the input streams into combined events
//! - `controller`: hysteresis decision, output debouncing and lifecycle
//! - `dbus`: Venus OS D-Bus adapter resolving topics and writing the relay
//! - `config`: YAML configuration and validation
//! - `logging`: structured logging and tracing
//! - `ui_schema`: settings form schema for the host

pub mod combiner;
pub mod config;
pub mod controller;
pub mod dbus;
pub mod error;
pub mod logging;
pub mod sensor;
pub mod ui_schema;

/// Plugin identifier used in status messages and log fields
pub const PLUGIN_ID: &str = "solarhotwater";
/// Human-readable plugin name
pub const PLUGIN_NAME: &str = "Controller for solar hot water generation";
/// Plugin description shown by the host
pub const PLUGIN_DESCRIPTION: &str = "Controller for solar hot water generation";

pub use config::Config;
pub use controller::{ControllerHandle, HeaterController};
pub use error::{Result, SolarHotWaterError};
