use std::{env, fs, io, sync::Arc};

use async_trait::async_trait;
use controller::{JobController, Publisher};
use log::{info, warn};
use telemetry::{Event, TrainingSpec};
use tokio::signal;

/// Prints every event as one JSON line on stdout.
struct JsonLinePublisher;

#[async_trait]
impl Publisher for JsonLinePublisher {
    async fn publish(&self, event: Event) {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!("failed to serialize {} event: {e}", event.name()),
        }
    }
}

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let path = env::args()
        .nth(1)
        .ok_or_else(|| io::Error::other("usage: node <training-spec.json>"))?;
    let raw = fs::read_to_string(&path)?;
    let spec: TrainingSpec = serde_json::from_str(&raw).map_err(io::Error::other)?;

    let controller = Arc::new(JobController::new(JsonLinePublisher));
    let handle = controller.start(spec).await.map_err(io::Error::from)?;
    info!("job started from {path}");

    let watcher = Arc::clone(&controller);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() && watcher.cancel() {
            info!("interrupt received, stopping the job");
        }
    });

    handle.join().await;
    Ok(())
}
