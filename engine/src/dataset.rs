use ndarray::{Array2, ArrayView2, Axis, s};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::{EngineErr, Result};

/// A synthetic regression dataset: inputs drawn uniformly from [0, 1), each
/// target column equal to the sum of the input features plus Gaussian noise
/// scaled by the noise level. Immutable once generated.
#[derive(Debug, Clone)]
pub struct Dataset {
    x: Array2<f32>,
    y: Array2<f32>,
}

impl Dataset {
    /// Generates a dataset.
    ///
    /// # Arguments
    /// * `num_points` - Number of (input, target) pairs; must be at least 1.
    /// * `input_size` - Width of the input vectors.
    /// * `output_size` - Width of the target vectors.
    /// * `noise_level` - Standard deviation scale of the target noise.
    /// * `rng` - A random number generator.
    pub fn synthetic(
        num_points: usize,
        input_size: usize,
        output_size: usize,
        noise_level: f32,
        rng: &mut impl Rng,
    ) -> Result<Self> {
        if num_points == 0 {
            return Err(EngineErr::EmptyDataset);
        }

        let x = Array2::from_shape_fn((num_points, input_size), |_| rng.random::<f32>());
        let sums = x.sum_axis(Axis(1));

        let mut y = Array2::zeros((num_points, output_size));
        for (i, mut row) in y.outer_iter_mut().enumerate() {
            for v in row.iter_mut() {
                let noise: f32 = rng.sample(StandardNormal);
                *v = sums[i] + noise_level * noise;
            }
        }

        Ok(Self { x, y })
    }

    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn input_size(&self) -> usize {
        self.x.ncols()
    }

    pub fn output_size(&self) -> usize {
        self.y.ncols()
    }

    /// Yields contiguous `(input, target)` batch views in a fixed order; the
    /// last batch may be shorter than `batch_size`.
    ///
    /// # Arguments
    /// * `batch_size` - Rows per batch, at least 1.
    pub fn batches(
        &self,
        batch_size: usize,
    ) -> impl Iterator<Item = (ArrayView2<'_, f32>, ArrayView2<'_, f32>)> {
        let size = batch_size.max(1);
        let len = self.len();

        (0..len).step_by(size).map(move |start| {
            let end = (start + size).min(len);
            (
                self.x.slice(s![start..end, ..]),
                self.y.slice(s![start..end, ..]),
            )
        })
    }
}
