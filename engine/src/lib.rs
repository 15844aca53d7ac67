pub mod activations;
pub mod dataset;
pub mod error;
pub mod loss;
pub mod network;
pub mod optimizer;
mod test;
pub mod trainer;

pub use activations::ActFn;
pub use dataset::Dataset;
pub use error::{EngineErr, Result};
pub use loss::{LossFn, Mse};
pub use network::{DenseLayer, ForwardCache, GradientSet, Network};
pub use optimizer::{Optimizer, Sgd};
pub use trainer::{Outcome, Trainer};
