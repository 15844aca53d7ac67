use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::Rng;

use crate::{ActFn, EngineErr, Result};

/// A dense layer: weight matrix of shape `out x in`, bias vector of length
/// `out`, and the activation applied to its pre-activation output.
#[derive(Debug, Clone)]
pub struct DenseLayer {
    pub weights: Array2<f32>,
    pub bias: Array1<f32>,
    pub act_fn: ActFn,
}

impl DenseLayer {
    fn new(input: usize, output: usize, act_fn: ActFn, rng: &mut impl Rng) -> Self {
        // LeCun-style uniform init, scaled by the fan-in.
        let limit = (1.0 / input.max(1) as f32).sqrt();

        Self {
            weights: Array2::from_shape_fn((output, input), |_| rng.random_range(-limit..limit)),
            bias: Array1::zeros(output),
            act_fn,
        }
    }

    fn input_width(&self) -> usize {
        self.weights.ncols()
    }

    fn output_width(&self) -> usize {
        self.weights.nrows()
    }
}

/// Intermediate values cached by one forward pass: the batch input plus the
/// pre/post activation of every hidden layer. Consumed by the matching
/// `backward` call and discarded afterwards; never shared across batches.
#[derive(Debug, Clone)]
pub struct ForwardCache {
    pub input: Array2<f32>,
    pub hidden: Vec<LayerCache>,
}

/// Pre- and post-activation values of one hidden layer.
#[derive(Debug, Clone)]
pub struct LayerCache {
    pub pre: Array2<f32>,
    pub post: Array2<f32>,
}

/// One gradient buffer per weight matrix and bias vector, in layer order.
/// Allocated zeroed per batch, populated by `backward`, consumed by the
/// optimizer.
#[derive(Debug, Clone)]
pub struct GradientSet {
    pub weights: Vec<Array2<f32>>,
    pub biases: Vec<Array1<f32>>,
}

/// A feed-forward network. Owns its parameters exclusively: the only mutation
/// paths are construction, `reset` and `apply_gradients`.
#[derive(Debug, Clone)]
pub struct Network {
    layers: Vec<DenseLayer>,
}

impl Network {
    /// Creates a network with freshly initialized parameters.
    ///
    /// # Arguments
    /// * `input_size` - Width of the input vectors.
    /// * `hidden_sizes` - Hidden layer widths; may be empty, which degenerates
    ///   to a single linear layer.
    /// * `output_size` - Width of the output layer, which is always linear.
    /// * `hidden_act` - Activation applied to every hidden layer.
    /// * `rng` - A random number generator.
    pub fn new(
        input_size: usize,
        hidden_sizes: &[usize],
        output_size: usize,
        hidden_act: ActFn,
        rng: &mut impl Rng,
    ) -> Self {
        let mut layers = Vec::with_capacity(hidden_sizes.len() + 1);
        let mut width = input_size;

        for &hidden in hidden_sizes {
            layers.push(DenseLayer::new(width, hidden, hidden_act, rng));
            width = hidden;
        }

        layers.push(DenseLayer::new(width, output_size, ActFn::Identity, rng));

        Self { layers }
    }

    /// Reinitializes all parameters. Any cache produced before the call is
    /// stale and will be rejected by `backward`.
    pub fn reset(
        &mut self,
        input_size: usize,
        hidden_sizes: &[usize],
        output_size: usize,
        hidden_act: ActFn,
        rng: &mut impl Rng,
    ) {
        *self = Self::new(input_size, hidden_sizes, output_size, hidden_act, rng);
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    #[cfg(test)]
    pub(crate) fn layers_mut(&mut self) -> &mut [DenseLayer] {
        &mut self.layers
    }

    pub fn input_size(&self) -> usize {
        self.layers[0].input_width()
    }

    pub fn output_size(&self) -> usize {
        self.layers[self.layers.len() - 1].output_width()
    }

    /// Returns the layer widths as `[input, hidden.., output]`.
    pub fn layer_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![self.input_size()];
        sizes.extend(self.layers.iter().map(DenseLayer::output_width));
        sizes
    }

    /// Makes a forward pass over a batch.
    ///
    /// # Arguments
    /// * `x` - One input vector per row; width must equal `input_size`.
    ///
    /// # Returns
    /// The network output and the cache the next `backward` call consumes.
    pub fn forward(&self, x: ArrayView2<f32>) -> Result<(Array2<f32>, ForwardCache)> {
        if x.ncols() != self.input_size() {
            return Err(EngineErr::ShapeMismatch {
                what: "input width",
                got: x.ncols(),
                expected: self.input_size(),
            });
        }

        let (hidden_layers, output_layer) = self.layers.split_at(self.layers.len() - 1);

        let mut cache = ForwardCache {
            input: x.to_owned(),
            hidden: Vec::with_capacity(hidden_layers.len()),
        };

        let mut a = x.to_owned();
        for layer in hidden_layers {
            let pre = a.dot(&layer.weights.t()) + &layer.bias;
            let post = pre.mapv(|z| layer.act_fn.f(z));
            cache.hidden.push(LayerCache {
                pre,
                post: post.clone(),
            });
            a = post;
        }

        let last = &output_layer[0];
        let output = a.dot(&last.weights.t()) + &last.bias;

        Ok((output, cache))
    }

    /// Computes parameter gradients from a forward cache and the gradient of
    /// the loss with respect to the network output.
    ///
    /// # Arguments
    /// * `cache` - The cache returned by the matching `forward` call.
    /// * `output_grad` - Upstream gradient, same shape as the forward output.
    ///
    /// # Returns
    /// One gradient per weight matrix and bias vector, matching parameter
    /// shapes exactly.
    pub fn backward(
        &self,
        cache: &ForwardCache,
        output_grad: ArrayView2<f32>,
    ) -> Result<GradientSet> {
        self.check_cache(cache)?;

        if output_grad.ncols() != self.output_size() {
            return Err(EngineErr::ShapeMismatch {
                what: "output gradient width",
                got: output_grad.ncols(),
                expected: self.output_size(),
            });
        }
        if output_grad.nrows() != cache.input.nrows() {
            return Err(EngineErr::ShapeMismatch {
                what: "output gradient rows",
                got: output_grad.nrows(),
                expected: cache.input.nrows(),
            });
        }

        let nlayers = self.layers.len();
        let mut grads = GradientSet {
            weights: self
                .layers
                .iter()
                .map(|l| Array2::zeros(l.weights.dim()))
                .collect(),
            biases: self
                .layers
                .iter()
                .map(|l| Array1::zeros(l.bias.dim()))
                .collect(),
        };

        // The output layer is linear, so the first delta is the upstream
        // gradient itself.
        let mut delta = output_grad.to_owned();

        for i in (0..nlayers).rev() {
            let a_prev = if i == 0 {
                cache.input.view()
            } else {
                cache.hidden[i - 1].post.view()
            };

            grads.weights[i] = delta.t().dot(&a_prev);
            grads.biases[i] = delta.sum_axis(Axis(0));

            if i > 0 {
                let mut d = delta.dot(&self.layers[i].weights);
                let prev = &self.layers[i - 1];
                d.zip_mut_with(&cache.hidden[i - 1].pre, |d, &z| *d *= prev.act_fn.df(z));
                delta = d;
            }
        }

        Ok(grads)
    }

    /// Applies a gradient-descent step in place: `param -= lr * grad`.
    ///
    /// # Arguments
    /// * `grads` - Gradients matching this network's parameter shapes.
    /// * `learning_rate` - The step length.
    pub fn apply_gradients(&mut self, grads: &GradientSet, learning_rate: f32) -> Result<()> {
        if grads.weights.len() != self.layers.len() || grads.biases.len() != self.layers.len() {
            return Err(EngineErr::ShapeMismatch {
                what: "gradient set length",
                got: grads.weights.len(),
                expected: self.layers.len(),
            });
        }

        for (i, layer) in self.layers.iter_mut().enumerate() {
            if grads.weights[i].dim() != layer.weights.dim() {
                return Err(EngineErr::ShapeMismatch {
                    what: "weight gradient shape",
                    got: grads.weights[i].len(),
                    expected: layer.weights.len(),
                });
            }
            if grads.biases[i].len() != layer.bias.len() {
                return Err(EngineErr::ShapeMismatch {
                    what: "bias gradient length",
                    got: grads.biases[i].len(),
                    expected: layer.bias.len(),
                });
            }

            layer.weights.scaled_add(-learning_rate, &grads.weights[i]);
            layer.bias.scaled_add(-learning_rate, &grads.biases[i]);
        }

        Ok(())
    }

    /// Rejects caches whose structure no longer matches the parameters, e.g.
    /// a cache taken before a `reset` to a different architecture.
    fn check_cache(&self, cache: &ForwardCache) -> Result<()> {
        if cache.input.ncols() != self.input_size() {
            return Err(EngineErr::StaleCache {
                layer: 0,
                got: cache.input.ncols(),
                expected: self.input_size(),
            });
        }

        let hidden_count = self.layers.len() - 1;
        if cache.hidden.len() != hidden_count {
            return Err(EngineErr::StaleCache {
                layer: cache.hidden.len().min(hidden_count),
                got: cache.hidden.len(),
                expected: hidden_count,
            });
        }

        for (i, entry) in cache.hidden.iter().enumerate() {
            let expected = self.layers[i].output_width();
            if entry.pre.ncols() != expected || entry.post.ncols() != expected {
                return Err(EngineErr::StaleCache {
                    layer: i,
                    got: entry.pre.ncols(),
                    expected,
                });
            }
        }

        Ok(())
    }
}
