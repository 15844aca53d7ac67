use serde::{Deserialize, Serialize};

/// The pre- and post-activation values of one hidden layer, one row per
/// example in the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerActivation {
    pub pre_activation: Vec<Vec<f32>>,
    pub post_activation: Vec<Vec<f32>>,
}

/// Forward-pass capture for the last batch of an epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardData {
    pub input: Vec<Vec<f32>>,
    pub hidden_activation: Vec<LayerActivation>,
    pub output: Vec<Vec<f32>>,
    pub forward_time_seconds: f64,
}

/// Absolute gradient values for one layer's parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerGradientMagnitudes {
    pub weights: Vec<Vec<f32>>,
    pub biases: Vec<f32>,
}

/// Backward-pass capture for the last batch of an epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackwardData {
    pub per_layer_gradient_magnitudes: Vec<LayerGradientMagnitudes>,
    pub backward_time_seconds: f64,
}

/// Every layer's current weights and biases, ordered input to output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightsBiasesData {
    pub per_layer_weights: Vec<Vec<Vec<f32>>>,
    pub per_layer_biases: Vec<Vec<f32>>,
}

/// The full per-epoch telemetry record. Immutable once constructed; safe to
/// hand across task boundaries without further synchronization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSnapshot {
    pub epoch: usize,
    pub loss: f32,
    pub forward_data: ForwardData,
    pub backward_data: BackwardData,
    pub weights_biases_data: WeightsBiasesData,
}

/// Reduced per-epoch record for consumers that only track gradient magnitude.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientSnapshot {
    pub epoch: usize,
    pub loss: f32,
    pub backward_data: BackwardData,
}

/// An outbound event, named after the live-update channel it maps onto.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Event {
    TrainingStarted { message: String },
    TrainingUpdate(TrainingSnapshot),
    GradientUpdate(GradientSnapshot),
    TrainingCompleted { message: String },
    TrainingStopped { message: String },
    TrainingError { message: String },
    ResetResponse { message: String, layer_sizes: Vec<usize> },
}

impl Event {
    /// Returns the wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            Event::TrainingStarted { .. } => "training_started",
            Event::TrainingUpdate(_) => "training_update",
            Event::GradientUpdate(_) => "gradient_update",
            Event::TrainingCompleted { .. } => "training_completed",
            Event::TrainingStopped { .. } => "training_stopped",
            Event::TrainingError { .. } => "training_error",
            Event::ResetResponse { .. } => "reset_response",
        }
    }
}
