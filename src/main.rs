use flower_power_bridge::domain::bridge::Bridge;
use flower_power_bridge::domain::models::BridgeEvent;
use flower_power_bridge::domain::settings::SettingsService;
use flower_power_bridge::infrastructure::{self, bluetooth::BluetoothService};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let settings_service = SettingsService::new()?;
    let settings = settings_service.get();

    let _logging_guard = infrastructure::logging::init_logger(&settings.log_settings)
        .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
        .ok();

    info!("Starting Flower Power bridge");
    info!("Settings file: {}", settings_service.path().display());

    let config = settings.bridge_config()?;
    let (radio, radio_events) = BluetoothService::new(settings.service_discovery_delay()).await?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<BridgeEvent>();
    let (ready_tx, ready_rx) = oneshot::channel();
    let bridge = Bridge::new(radio, event_tx, config);

    let publisher = async move {
        while let Some(event) = event_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => error!("Failed to encode event: {}", e),
            }
        }
    };

    let driver = async move {
        tokio::select! {
            result = bridge.run(ready_rx, radio_events) => result,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                Ok(())
            }
        }
    };

    // Everything is wired up, let the bridge start scanning
    let _ = ready_tx.send(());

    let (result, ()) = tokio::join!(driver, publisher);
    result?;
    Ok(())
}
