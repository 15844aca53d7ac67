use crate::{GradientSet, Network, Result};

/// An optimization algorithm that turns a gradient set into a parameter
/// update. Extension point; only plain SGD is implemented.
pub trait Optimizer {
    fn step(&mut self, network: &mut Network, grads: &GradientSet) -> Result<()>;
}

/// Stochastic gradient descent. Stateless beyond its learning rate: no
/// momentum, no weight decay.
#[derive(Debug, Clone, Copy)]
pub struct Sgd {
    learning_rate: f32,
}

impl Sgd {
    /// Returns a new `Sgd`.
    ///
    /// # Arguments
    /// * `learning_rate` - The *length* of the steps taken on each update.
    pub fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }
}

impl Optimizer for Sgd {
    /// Takes one step in the opposite direction of the gradient. Delegates to
    /// `Network::apply_gradients`, the network's single mutation path.
    fn step(&mut self, network: &mut Network, grads: &GradientSet) -> Result<()> {
        network.apply_gradients(grads, self.learning_rate)
    }
}
