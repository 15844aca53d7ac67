use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::{Duration, Instant},
};

use ndarray::ArrayView2;
use telemetry::{
    BackwardData, ForwardData, LayerActivation, LayerGradientMagnitudes, TrainingSnapshot,
    WeightsBiasesData,
};

use crate::{
    Dataset, EngineErr, LossFn, Network, Optimizer, Result,
    network::{ForwardCache, GradientSet},
};

/// How a training run ended, cancellation not being an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Cancelled,
}

/// Everything captured from the last batch of an epoch, used to assemble the
/// per-epoch snapshot.
struct BatchTrace {
    cache: ForwardCache,
    output: ndarray::Array2<f32>,
    grads: GradientSet,
    forward_time: Duration,
    backward_time: Duration,
}

/// The instrumented training engine. Drives epoch/batch iteration over a
/// borrowed network and hands one `TrainingSnapshot` per completed epoch to
/// the consumer, synchronously and in epoch order.
pub struct Trainer<'n, O: Optimizer, L: LossFn> {
    network: &'n mut Network,
    dataset: Dataset,
    optimizer: O,
    loss_fn: L,
    epochs: usize,
    batch_size: usize,
    batch_delay: Option<Duration>,
}

impl<'n, O: Optimizer, L: LossFn> Trainer<'n, O, L> {
    /// Returns a new `Trainer`.
    ///
    /// # Arguments
    /// * `network` - The network to train; borrowed for the job's duration.
    /// * `dataset` - The dataset to iterate; guaranteed non-empty.
    /// * `optimizer` - The parameter-update rule.
    /// * `loss_fn` - The loss function.
    /// * `epochs` - How many passes over the dataset to run.
    /// * `batch_size` - Rows per batch, at least 1.
    /// * `batch_delay` - Optional simulated per-batch processing latency.
    pub fn new(
        network: &'n mut Network,
        dataset: Dataset,
        optimizer: O,
        loss_fn: L,
        epochs: usize,
        batch_size: usize,
        batch_delay: Option<Duration>,
    ) -> Self {
        Self {
            network,
            dataset,
            optimizer,
            loss_fn,
            epochs,
            batch_size,
            batch_delay,
        }
    }

    /// Runs the full training loop.
    ///
    /// Cancellation is cooperative: the flag is checked once per batch and
    /// once per epoch, so latency is bounded by one batch's compute plus one
    /// configured delay interval. A partially trained network is left in a
    /// consistent state; no update is ever torn.
    ///
    /// # Arguments
    /// * `cancel` - The cooperative cancellation flag.
    /// * `on_epoch` - Consumer invoked synchronously with each epoch's
    ///   snapshot before the next epoch begins.
    ///
    /// # Returns
    /// Whether the run completed or was cancelled; any shape error aborts the
    /// job immediately.
    pub fn run<F>(&mut self, cancel: &AtomicBool, mut on_epoch: F) -> Result<Outcome>
    where
        F: FnMut(TrainingSnapshot),
    {
        for epoch in 0..self.epochs {
            let mut total_loss = 0.0f64;
            let mut num_batches = 0usize;
            let mut last: Option<BatchTrace> = None;

            for (x, y) in self.dataset.batches(self.batch_size) {
                if let Some(delay) = self.batch_delay {
                    thread::sleep(delay);
                }
                if cancel.load(Ordering::Acquire) {
                    return Ok(Outcome::Cancelled);
                }

                let forward_start = Instant::now();
                let (output, cache) = self.network.forward(x)?;
                let forward_time = forward_start.elapsed();

                let loss = self.loss_fn.loss(output.view(), y)?;
                let output_grad = self.loss_fn.loss_prime(output.view(), y)?;

                let backward_start = Instant::now();
                let grads = self.network.backward(&cache, output_grad.view())?;
                let backward_time = backward_start.elapsed();

                self.optimizer.step(self.network, &grads)?;

                total_loss += loss as f64;
                num_batches += 1;
                last = Some(BatchTrace {
                    cache,
                    output,
                    grads,
                    forward_time,
                    backward_time,
                });
            }

            // The dataset is non-empty by construction, so every epoch sees
            // at least one batch.
            let Some(trace) = last else {
                return Err(EngineErr::EmptyDataset);
            };

            let avg_loss = (total_loss / num_batches as f64) as f32;
            on_epoch(self.snapshot(epoch, avg_loss, &trace));

            if cancel.load(Ordering::Acquire) {
                return Ok(Outcome::Cancelled);
            }
        }

        Ok(Outcome::Completed)
    }

    /// Assembles the epoch snapshot from the last batch's trace and the
    /// network's current, post-update parameters.
    fn snapshot(&self, epoch: usize, loss: f32, trace: &BatchTrace) -> TrainingSnapshot {
        let forward_data = ForwardData {
            input: rows(trace.cache.input.view()),
            hidden_activation: trace
                .cache
                .hidden
                .iter()
                .map(|layer| LayerActivation {
                    pre_activation: rows(layer.pre.view()),
                    post_activation: rows(layer.post.view()),
                })
                .collect(),
            output: rows(trace.output.view()),
            forward_time_seconds: trace.forward_time.as_secs_f64(),
        };

        let backward_data = BackwardData {
            per_layer_gradient_magnitudes: trace
                .grads
                .weights
                .iter()
                .zip(&trace.grads.biases)
                .map(|(w, b)| LayerGradientMagnitudes {
                    weights: w
                        .outer_iter()
                        .map(|row| row.iter().map(|g| g.abs()).collect())
                        .collect(),
                    biases: b.iter().map(|g| g.abs()).collect(),
                })
                .collect(),
            backward_time_seconds: trace.backward_time.as_secs_f64(),
        };

        let weights_biases_data = WeightsBiasesData {
            per_layer_weights: self
                .network
                .layers()
                .iter()
                .map(|l| rows(l.weights.view()))
                .collect(),
            per_layer_biases: self
                .network
                .layers()
                .iter()
                .map(|l| l.bias.to_vec())
                .collect(),
        };

        TrainingSnapshot {
            epoch,
            loss,
            forward_data,
            backward_data,
            weights_biases_data,
        }
    }
}

fn rows(a: ArrayView2<f32>) -> Vec<Vec<f32>> {
    a.outer_iter().map(|row| row.to_vec()).collect()
}
