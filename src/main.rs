use anyhow::Result;
use solarhotwater::controller::{ChannelCommandSink, HeaterController, TracingStatusSink};
use solarhotwater::dbus::{VenusBus, spawn_command_writer};
use solarhotwater::ui_schema::build_ui_schema;
use solarhotwater::{Config, PLUGIN_NAME};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--schema") {
        println!("{}", serde_json::to_string_pretty(&Config::json_schema())?);
        return Ok(());
    }
    if args.iter().any(|a| a == "--ui-schema") {
        println!("{}", serde_json::to_string_pretty(&build_ui_schema())?);
        return Ok(());
    }

    // A broken file leaves the controller unconfigured; it reports that itself
    let (config, load_error) = Config::load_or_default();
    solarhotwater::logging::init_logging(&config.logging)?;
    info!("{} {} starting up", PLUGIN_NAME, env!("APP_VERSION"));
    if let Some(e) = &load_error {
        error!("Failed to load configuration: {}", e);
    }

    if let Err(e) = config.validate() {
        // The controller reports its own section; anything else is only a warning
        warn!("Configuration validation: {}", e);
    }

    let bus = Arc::new(
        VenusBus::connect(&config.dbus)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to D-Bus: {}", e))?,
    );

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let writer = spawn_command_writer(bus.clone(), cmd_rx);

    let controller = HeaterController::new(
        config.controller.clone(),
        Arc::new(ChannelCommandSink::new(cmd_tx)),
        Arc::new(TracingStatusSink::new()),
    );
    let handle = controller.start(bus.as_ref()).await;
    if !handle.is_active() {
        warn!("Controller inactive; relay left off");
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    let final_state = handle.stop().await;
    info!("Controller {:?}", final_state);

    // The writer ends once the controller has dropped its command sink
    match tokio::time::timeout(Duration::from_secs(2), writer).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Relay writer failed: {}", e),
        Err(_) => warn!("Relay writer did not finish in time"),
    }
    Ok(())
}
