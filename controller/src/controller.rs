use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use engine::{ActFn, Dataset, Mse, Network, Outcome, Sgd, Trainer};
use log::{info, warn};
use parking_lot::Mutex;
use rand::{SeedableRng, rngs::StdRng};
use telemetry::{Event, GradientSnapshot, TrainingSpec};
use tokio::{
    sync::mpsc,
    task::{self, JoinHandle},
};

use crate::{ControllerErr, Publisher, Result};

/// Architecture installed by `reset` and at construction time.
pub const DEFAULT_INPUT_SIZE: usize = 5;
pub const DEFAULT_HIDDEN_SIZES: [usize; 2] = [3, 2];
pub const DEFAULT_OUTPUT_SIZE: usize = 1;

/// Bounded hand-off between the engine and the publisher; a stalled
/// publisher eventually backpressures the training loop instead of buffering
/// snapshots without limit.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Owns the single current network and runs at most one training job at a
/// time. All operations take `&self`, so the controller stays responsive to
/// `start`/`cancel`/`reset` while a job computes on the blocking pool.
pub struct JobController<P: Publisher> {
    publisher: Arc<P>,
    network: Arc<Mutex<Network>>,
    running: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
}

/// Handle to a spawned job; `join` waits until the job has finished and the
/// last event has been handed to the publisher.
pub struct JobHandle {
    job: JoinHandle<()>,
    forwarder: JoinHandle<()>,
}

impl JobHandle {
    pub async fn join(self) {
        let _ = self.job.await;
        let _ = self.forwarder.await;
    }
}

impl<P: Publisher> JobController<P> {
    /// Creates a controller with a freshly initialized default network.
    ///
    /// # Arguments
    /// * `publisher` - The live-update channel telemetry is delivered to.
    pub fn new(publisher: P) -> Self {
        let mut rng = StdRng::from_os_rng();
        let network = Network::new(
            DEFAULT_INPUT_SIZE,
            &DEFAULT_HIDDEN_SIZES,
            DEFAULT_OUTPUT_SIZE,
            ActFn::Gelu,
            &mut rng,
        );

        Self {
            publisher: Arc::new(publisher),
            network: Arc::new(Mutex::new(network)),
            running: Arc::new(AtomicBool::new(false)),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Validates the spec, builds a fresh dataset and network, and launches
    /// the training engine on the blocking pool. Returns as soon as the job
    /// is spawned; progress arrives through the publisher.
    ///
    /// # Arguments
    /// * `spec` - The training job configuration.
    ///
    /// # Errors
    /// `InvalidSpec` before any event is emitted, or `JobAlreadyRunning` if a
    /// job currently holds the network.
    pub async fn start(&self, spec: TrainingSpec) -> Result<JobHandle> {
        validate(&spec)?;

        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ControllerErr::JobAlreadyRunning)?;

        let mut rng = match spec.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let dataset = match Dataset::synthetic(
            spec.num_data_points,
            spec.input_size,
            spec.output_size,
            spec.noise_level,
            &mut rng,
        ) {
            Ok(dataset) => dataset,
            Err(e) => {
                self.running.store(false, Ordering::Release);
                return Err(e.into());
            }
        };

        {
            // The running flag guarantees no job holds the lock here.
            let mut network = self.network.lock();
            network.reset(
                spec.input_size,
                &spec.hidden_sizes,
                spec.output_size,
                spec.activation.into(),
                &mut rng,
            );
        }
        self.cancel.store(false, Ordering::Release);

        info!(
            epochs = spec.epochs,
            learning_rate = spec.learning_rate,
            num_data_points = spec.num_data_points,
            batch_size = spec.batch_size;
            "starting training job"
        );

        let (tx, mut rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAPACITY);
        let publisher = Arc::clone(&self.publisher);
        let forwarder = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                publisher.publish(event).await;
            }
        });

        let _ = tx
            .send(Event::TrainingStarted {
                message: "Training started. Watch the event stream for updates.".into(),
            })
            .await;

        let network = Arc::clone(&self.network);
        let running = Arc::clone(&self.running);
        let cancel = Arc::clone(&self.cancel);
        let epoch_tx = tx.clone();

        let job = tokio::spawn(async move {
            let worker_cancel = Arc::clone(&cancel);
            let outcome = task::spawn_blocking(move || {
                let mut guard = network.lock();
                let mut trainer = Trainer::new(
                    &mut guard,
                    dataset,
                    Sgd::new(spec.learning_rate),
                    Mse,
                    spec.epochs,
                    spec.batch_size,
                    spec.batch_delay_ms.map(Duration::from_millis),
                );

                trainer.run(&worker_cancel, |snapshot| {
                    let gradient = GradientSnapshot {
                        epoch: snapshot.epoch,
                        loss: snapshot.loss,
                        backward_data: snapshot.backward_data.clone(),
                    };
                    let _ = epoch_tx.blocking_send(Event::TrainingUpdate(snapshot));
                    let _ = epoch_tx.blocking_send(Event::GradientUpdate(gradient));
                })
            })
            .await;

            // Release the network slot before announcing the outcome, so a
            // caller reacting to the terminal event can start a fresh job
            // right away.
            running.store(false, Ordering::Release);

            let terminal = match outcome {
                Ok(Ok(Outcome::Completed)) => {
                    info!("training job completed");
                    Event::TrainingCompleted {
                        message: "Training completed".into(),
                    }
                }
                Ok(Ok(Outcome::Cancelled)) => {
                    info!("training job stopped");
                    Event::TrainingStopped {
                        message: "Training stopped".into(),
                    }
                }
                Ok(Err(e)) => {
                    warn!("training job failed: {e}");
                    Event::TrainingError {
                        message: e.to_string(),
                    }
                }
                Err(e) => {
                    warn!("training task aborted: {e}");
                    Event::TrainingError {
                        message: e.to_string(),
                    }
                }
            };

            let _ = tx.send(terminal).await;
        });

        Ok(JobHandle { job, forwarder })
    }

    /// Requests cooperative termination of the running job. The engine checks
    /// the flag between batches and between epochs, so any in-flight
    /// parameter update completes before the job stops.
    ///
    /// # Returns
    /// Whether a running job was signalled; `false` is a no-op.
    pub fn cancel(&self) -> bool {
        if !self.running.load(Ordering::Acquire) {
            return false;
        }

        self.cancel.store(true, Ordering::Release);
        info!("cancellation requested");
        true
    }

    /// Reinstalls the default architecture and acknowledges it through the
    /// publisher. Rejected while a job is running; cancel first, then reset.
    ///
    /// # Returns
    /// The new architecture as `[input, hidden.., output]` widths.
    pub async fn reset(&self) -> Result<Vec<usize>> {
        if self.running.load(Ordering::Acquire) {
            return Err(ControllerErr::ResetWhileRunning);
        }

        let layer_sizes = {
            let mut network = self.network.lock();
            let mut rng = StdRng::from_os_rng();
            network.reset(
                DEFAULT_INPUT_SIZE,
                &DEFAULT_HIDDEN_SIZES,
                DEFAULT_OUTPUT_SIZE,
                ActFn::Gelu,
                &mut rng,
            );
            network.layer_sizes()
        };

        info!("network reset to default architecture");
        self.publisher
            .publish(Event::ResetResponse {
                message: "Neural network has been reset to initial state.".into(),
                layer_sizes: layer_sizes.clone(),
            })
            .await;

        Ok(layer_sizes)
    }
}

fn validate(spec: &TrainingSpec) -> Result<()> {
    fn invalid<T>(field: &'static str, got: f64) -> Result<T> {
        Err(ControllerErr::InvalidSpec { field, got })
    }

    if spec.input_size == 0 {
        return invalid("input_size", 0.0);
    }
    if spec.output_size == 0 {
        return invalid("output_size", 0.0);
    }
    if spec.hidden_sizes.iter().any(|&h| h == 0) {
        return invalid("hidden_sizes", 0.0);
    }
    if spec.epochs == 0 {
        return invalid("epochs", 0.0);
    }
    if spec.num_data_points == 0 {
        return invalid("num_data_points", 0.0);
    }
    if spec.batch_size == 0 {
        return invalid("batch_size", 0.0);
    }
    if !spec.learning_rate.is_finite() || spec.learning_rate <= 0.0 {
        return invalid("learning_rate", spec.learning_rate as f64);
    }
    if !spec.noise_level.is_finite() || spec.noise_level < 0.0 {
        return invalid("noise_level", spec.noise_level as f64);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use telemetry::ActivationSpec;

    use super::*;

    fn spec() -> TrainingSpec {
        TrainingSpec {
            input_size: 2,
            hidden_sizes: vec![3],
            output_size: 1,
            epochs: 5,
            learning_rate: 0.01,
            num_data_points: 10,
            noise_level: 0.1,
            batch_size: 2,
            activation: ActivationSpec::Gelu,
            batch_delay_ms: None,
            seed: None,
        }
    }

    #[test]
    fn validate_accepts_a_sane_spec() {
        assert!(validate(&spec()).is_ok());
    }

    #[test]
    fn validate_rejects_zero_and_non_finite_fields() {
        let mut s = spec();
        s.epochs = 0;
        assert!(matches!(
            validate(&s),
            Err(ControllerErr::InvalidSpec { field: "epochs", .. })
        ));

        let mut s = spec();
        s.hidden_sizes = vec![3, 0];
        assert!(matches!(
            validate(&s),
            Err(ControllerErr::InvalidSpec {
                field: "hidden_sizes",
                ..
            })
        ));

        let mut s = spec();
        s.learning_rate = f32::NAN;
        assert!(matches!(
            validate(&s),
            Err(ControllerErr::InvalidSpec {
                field: "learning_rate",
                ..
            })
        ));

        let mut s = spec();
        s.noise_level = -0.5;
        assert!(matches!(
            validate(&s),
            Err(ControllerErr::InvalidSpec {
                field: "noise_level",
                ..
            })
        ));
    }
}
