use ndarray::{Array2, ArrayView2};

use crate::{EngineErr, Result};

/// A loss function over batched predictions and targets.
pub trait LossFn {
    /// Computes the scalar loss.
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Result<f32>;

    /// Computes the gradient of the loss with respect to the predictions,
    /// scaled consistently with `loss` so backprop receives a correctly
    /// weighted upstream gradient.
    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Result<Array2<f32>>;
}

/// Mean squared error loss function.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mse;

impl Mse {
    /// Returns a new `Mse`.
    pub fn new() -> Self {
        Self
    }

    fn check_shapes(y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Result<()> {
        if y_pred.dim() != y.dim() {
            return Err(EngineErr::ShapeMismatch {
                what: "loss targets",
                got: y.len(),
                expected: y_pred.len(),
            });
        }

        Ok(())
    }
}

impl LossFn for Mse {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Result<f32> {
        Self::check_shapes(y_pred, y)?;

        Ok((&y_pred - &y)
            .mapv(|x| x.powi(2))
            .mean()
            .unwrap_or_default())
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Result<Array2<f32>> {
        Self::check_shapes(y_pred, y)?;

        Ok((&y_pred - &y) * (2.0 / y_pred.len() as f32))
    }
}
