//! Heater controller lifecycle
//!
//! On start the relay is written off before anything else, provided the
//! configuration names the output path; without a `controller` section (or
//! with an empty `output_path`) there is nothing to write to. The configured
//! topics are then resolved; if any of them is unavailable, or the
//! configuration is unusable, the error goes to the status sink and the
//! controller stays inactive with the relay off. Otherwise a single task
//! owns the decision state and processes combined events in arrival order
//! until stopped. Stopping (or dropping the handle) drops every input
//! stream, releasing the subscriptions.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;

use crate::combiner::{CombinedEvent, CombinedStream, CombinerInputs, Input, combine_latest};
use crate::config::ControllerConfig;
use crate::error::{Result, SolarHotWaterError};
use crate::logging::{StructuredLogger, get_logger};
use crate::sensor::{SensorStream, StreamSource};

pub mod debounce;
pub mod hysteresis;
pub mod sinks;

pub use debounce::{Emission, HeaterStatus, OutputDebouncer};
pub use hysteresis::{ControllerState, Evaluation, Permit, Readings, Thresholds, evaluate};
pub use sinks::{
    ChannelCommandSink, CommandSink, RelayCommand, StatusLevel, StatusSink, TracingStatusSink,
};

/// Observable controller state for status displays
#[derive(Debug, Clone, Default, Serialize)]
pub struct ControllerSnapshot {
    /// Enable flag of the last evaluation, `None` before the first one
    pub enabled: Option<bool>,
    pub permit: Permit,
    pub heater_on: bool,
    pub status: Option<HeaterStatus>,
    /// Number of combined events processed
    pub evaluations: u64,
    /// RFC 3339 time of the last status change
    pub last_change: Option<String>,
}

/// Lifecycle state reported by a [`ControllerHandle`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Running,
    /// Startup was refused; the relay was left off
    Inactive(String),
    Stopped,
}

/// Decision state plus its output ports, owned by the control task
pub struct ControlLoop {
    thresholds: Thresholds,
    output_path: String,
    state: ControllerState,
    debouncer: OutputDebouncer,
    commands: Arc<dyn CommandSink>,
    status: Arc<dyn StatusSink>,
    snapshot_tx: watch::Sender<ControllerSnapshot>,
    logger: StructuredLogger,
}

impl ControlLoop {
    pub fn new(
        config: &ControllerConfig,
        commands: Arc<dyn CommandSink>,
        status: Arc<dyn StatusSink>,
    ) -> Result<Self> {
        let thresholds = Thresholds::from_config(config)?;
        let (snapshot_tx, _) = watch::channel(ControllerSnapshot::default());
        Ok(Self {
            thresholds,
            output_path: config.output_path.clone(),
            state: ControllerState::default(),
            debouncer: OutputDebouncer::new(),
            commands,
            status,
            snapshot_tx,
            logger: get_logger("controller"),
        })
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn subscribe_snapshot(&self) -> watch::Receiver<ControllerSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Run one combined event through decision, debounce and the sinks
    pub fn process(&mut self, event: &CombinedEvent) -> Evaluation {
        let readings = Readings::from_event(event);
        let eval = evaluate(&mut self.state, &self.thresholds, &readings);
        let emission = self.debouncer.debounce(eval);

        self.commands.set_command(&self.output_path, emission.command);
        if let Some(status) = emission.status {
            self.status.log_status(StatusLevel::Info, status.message());
        }
        self.logger.debug(&format!(
            "enabled={} soc={}% power={}W -> permit={:?} heater_on={}",
            readings.enabled, readings.soc_percent, readings.power_watts, eval.permit, eval.heater_on
        ));

        self.snapshot_tx.send_modify(|snap| {
            snap.enabled = Some(eval.enabled);
            snap.permit = eval.permit;
            snap.heater_on = eval.heater_on;
            snap.evaluations = snap.evaluations.saturating_add(1);
            if let Some(status) = emission.status {
                snap.status = Some(status);
                snap.last_change = Some(chrono::Utc::now().to_rfc3339());
            }
        });
        eval
    }

    /// Process events until shutdown is signalled or every input ends
    pub async fn run(mut self, mut events: CombinedStream, mut shutdown_rx: watch::Receiver<bool>) {
        self.logger.info("Heater controller running");
        loop {
            tokio::select! {
                biased;
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                next = events.next() => {
                    match next {
                        Some(event) => {
                            self.process(&event);
                        }
                        None => {
                            self.logger.warn("All input streams ended");
                            break;
                        }
                    }
                }
            }
        }
        self.logger.info("Heater controller stopped");
    }
}

/// Controller ready to be started against a stream source
pub struct HeaterController {
    config: Option<ControllerConfig>,
    commands: Arc<dyn CommandSink>,
    status: Arc<dyn StatusSink>,
    logger: StructuredLogger,
}

impl HeaterController {
    pub fn new(
        config: Option<ControllerConfig>,
        commands: Arc<dyn CommandSink>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            config,
            commands,
            status,
            logger: get_logger("controller"),
        }
    }

    /// Write the fail-safe off command, resolve the inputs and spawn the
    /// control task. Startup errors are reported, never returned.
    pub async fn start<S: StreamSource + ?Sized>(self, source: &S) -> ControllerHandle {
        let HeaterController {
            config,
            commands,
            status,
            logger,
        } = self;

        let Some(config) = config else {
            logger.warn("No controller configuration; relay output unknown, skipping off write");
            return refuse(status.as_ref(), "bad or missing configuration".to_string());
        };

        if config.output_path.trim().is_empty() {
            logger.warn("No output path configured; skipping off write");
        } else {
            commands.set_command(&config.output_path, false);
        }

        let control = match ControlLoop::new(&config, commands, status.clone()) {
            Ok(c) => c,
            Err(e) => {
                return refuse(
                    status.as_ref(),
                    format!("bad or missing configuration ({})", e),
                );
            }
        };

        let inputs = match resolve_inputs(&config, source).await {
            Ok(inputs) => inputs,
            Err(e) => return refuse(status.as_ref(), e.to_string()),
        };

        let snapshot_rx = control.subscribe_snapshot();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(control.run(combine_latest(inputs), shutdown_rx));

        ControllerHandle {
            run_state: RunState::Running,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
            snapshot_rx,
        }
    }
}

fn refuse(status: &dyn StatusSink, message: String) -> ControllerHandle {
    status.log_status(StatusLevel::Error, &message);
    let (_, snapshot_rx) = watch::channel(ControllerSnapshot::default());
    ControllerHandle {
        run_state: RunState::Inactive(message),
        shutdown_tx: None,
        task: None,
        snapshot_rx,
    }
}

async fn resolve<S: StreamSource + ?Sized>(
    source: &S,
    input: Input,
    path: &str,
) -> Result<SensorStream> {
    source
        .get_stream(path)
        .await
        .ok_or_else(|| SolarHotWaterError::stream_unavailable(input.stream_name(), path))
}

/// Resolve every configured topic; an early failure drops the streams
/// already obtained so no subscription outlives a refused start
async fn resolve_inputs<S: StreamSource + ?Sized>(
    config: &ControllerConfig,
    source: &S,
) -> Result<CombinerInputs> {
    let enable = match config.enable_topic() {
        Some(path) => Some(resolve(source, Input::Enable, path).await?),
        None => None,
    };
    let battery_soc = resolve(source, Input::BatterySoc, &config.battery_soc_path).await?;
    let solar_power = resolve(source, Input::SolarPower, &config.solar_power_path).await?;
    Ok(CombinerInputs {
        enable,
        battery_soc,
        solar_power,
    })
}

/// Handle to a started controller
pub struct ControllerHandle {
    run_state: RunState,
    shutdown_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
    snapshot_rx: watch::Receiver<ControllerSnapshot>,
}

impl ControllerHandle {
    pub fn run_state(&self) -> &RunState {
        &self.run_state
    }

    pub fn is_active(&self) -> bool {
        self.run_state == RunState::Running
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ControllerSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Signal shutdown and wait for the control task to release its streams
    pub async fn stop(mut self) -> RunState {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            get_logger("controller").error(&format!("Control task ended abnormally: {}", e));
        }
        if self.run_state == RunState::Running {
            self.run_state = RunState::Stopped;
        }
        self.run_state.clone()
    }
}

impl Drop for ControllerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
