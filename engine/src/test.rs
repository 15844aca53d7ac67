#![cfg(test)]

use std::sync::atomic::{AtomicBool, Ordering};

use ndarray::{Array2, ArrayView2, array};
use rand::{SeedableRng, rngs::StdRng};

use crate::{ActFn, Dataset, EngineErr, LossFn, Mse, Network, Outcome, Sgd, Trainer};

fn mse_of(network: &Network, x: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
    let (output, _) = network.forward(x).unwrap();
    Mse.loss(output.view(), y).unwrap()
}

#[test]
fn forward_output_width_matches_output_size() {
    let mut rng = StdRng::seed_from_u64(3);
    let network = Network::new(4, &[6, 3], 2, ActFn::Relu, &mut rng);

    let x = Array2::from_elem((5, 4), 0.25f32);
    let (output, cache) = network.forward(x.view()).unwrap();

    assert_eq!(output.dim(), (5, 2));
    assert_eq!(cache.hidden.len(), 2);
    assert_eq!(network.layer_sizes(), vec![4, 6, 3, 2]);
}

#[test]
fn forward_is_deterministic_for_unmutated_parameters() {
    let mut rng = StdRng::seed_from_u64(11);
    let network = Network::new(3, &[5], 1, ActFn::Gelu, &mut rng);

    let x = Array2::from_elem((2, 3), 0.7f32);
    let (a, _) = network.forward(x.view()).unwrap();
    let (b, _) = network.forward(x.view()).unwrap();

    assert_eq!(a, b);
}

#[test]
fn forward_rejects_wrong_input_width() {
    let mut rng = StdRng::seed_from_u64(0);
    let network = Network::new(2, &[3], 1, ActFn::Relu, &mut rng);

    let x = Array2::zeros((1, 3));
    assert!(matches!(
        network.forward(x.view()),
        Err(EngineErr::ShapeMismatch { .. })
    ));
}

#[test]
fn apply_gradients_rejects_wrong_bias_length() {
    let mut rng = StdRng::seed_from_u64(13);
    let mut network = Network::new(2, &[3], 1, ActFn::Relu, &mut rng);

    let x = Array2::from_elem((2, 2), 0.5f32);
    let (output, cache) = network.forward(x.view()).unwrap();
    let grad = Array2::from_elem(output.dim(), 1.0f32);
    let mut grads = network.backward(&cache, grad.view()).unwrap();

    grads.biases[0] = ndarray::Array1::zeros(4);
    assert!(matches!(
        network.apply_gradients(&grads, 0.01),
        Err(EngineErr::ShapeMismatch {
            what: "bias gradient length",
            ..
        })
    ));
}

#[test]
fn backward_rejects_cache_from_before_a_reset() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut network = Network::new(3, &[4], 2, ActFn::Relu, &mut rng);

    let x = Array2::from_elem((2, 3), 0.5f32);
    let (output, cache) = network.forward(x.view()).unwrap();

    network.reset(3, &[5], 2, ActFn::Relu, &mut rng);

    let grad = Array2::from_elem(output.dim(), 1.0f32);
    assert!(matches!(
        network.backward(&cache, grad.view()),
        Err(EngineErr::StaleCache { .. })
    ));
}

#[test]
fn empty_hidden_sizes_degenerates_to_one_linear_layer() {
    let mut rng = StdRng::seed_from_u64(9);
    let network = Network::new(3, &[], 1, ActFn::Gelu, &mut rng);

    assert_eq!(network.layers().len(), 1);
    assert_eq!(network.layer_sizes(), vec![3, 1]);

    let x = array![[1.0f32, 2.0, 3.0]];
    let (output, cache) = network.forward(x.view()).unwrap();
    assert_eq!(output.dim(), (1, 1));
    assert!(cache.hidden.is_empty());
}

fn check_gradients(hidden_act: ActFn) {
    let mut rng = StdRng::seed_from_u64(21);
    let mut network = Network::new(2, &[3], 1, hidden_act, &mut rng);

    let x = array![[0.3f32, -0.8], [0.9, 0.4], [-0.2, 0.6]];
    let y = array![[0.5f32], [1.3], [0.4]];

    let (output, cache) = network.forward(x.view()).unwrap();
    let output_grad = Mse.loss_prime(output.view(), y.view()).unwrap();
    let grads = network.backward(&cache, output_grad.view()).unwrap();

    let eps = 1e-3f32;
    for layer in 0..network.layers().len() {
        let dim = network.layers()[layer].weights.dim();
        for i in 0..dim.0 {
            for j in 0..dim.1 {
                network.layers_mut()[layer].weights[[i, j]] += eps;
                let loss_plus = mse_of(&network, x.view(), y.view());
                network.layers_mut()[layer].weights[[i, j]] -= 2.0 * eps;
                let loss_minus = mse_of(&network, x.view(), y.view());
                network.layers_mut()[layer].weights[[i, j]] += eps;

                let numeric = (loss_plus - loss_minus) / (2.0 * eps);
                let analytic = grads.weights[layer][[i, j]];
                assert!(
                    (numeric - analytic).abs() < 1e-2 * (1.0 + analytic.abs()),
                    "layer {layer} w[{i},{j}]: numeric {numeric} vs analytic {analytic}"
                );
            }
        }

        for i in 0..network.layers()[layer].bias.len() {
            network.layers_mut()[layer].bias[i] += eps;
            let loss_plus = mse_of(&network, x.view(), y.view());
            network.layers_mut()[layer].bias[i] -= 2.0 * eps;
            let loss_minus = mse_of(&network, x.view(), y.view());
            network.layers_mut()[layer].bias[i] += eps;

            let numeric = (loss_plus - loss_minus) / (2.0 * eps);
            let analytic = grads.biases[layer][i];
            assert!(
                (numeric - analytic).abs() < 1e-2 * (1.0 + analytic.abs()),
                "layer {layer} b[{i}]: numeric {numeric} vs analytic {analytic}"
            );
        }
    }
}

#[test]
fn backward_matches_finite_differences_with_relu() {
    check_gradients(ActFn::Relu);
}

#[test]
fn backward_matches_finite_differences_with_gelu() {
    check_gradients(ActFn::Gelu);
}

#[test]
fn zero_learning_rate_reports_identical_loss_every_epoch() {
    let mut rng = StdRng::seed_from_u64(42);
    let dataset = Dataset::synthetic(2, 3, 1, 0.0, &mut rng).unwrap();
    let mut network = Network::new(3, &[4], 1, ActFn::Gelu, &mut rng);

    let mut losses = Vec::new();
    let cancel = AtomicBool::new(false);
    let mut trainer = Trainer::new(&mut network, dataset, Sgd::new(0.0), Mse, 6, 1, None);
    let outcome = trainer
        .run(&cancel, |snapshot| losses.push(snapshot.loss))
        .unwrap();

    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(losses.len(), 6);
    assert!(losses.iter().all(|&l| l == losses[0]));
}

#[test]
fn single_linear_layer_loss_decreases_on_sum_regression() {
    let mut rng = StdRng::seed_from_u64(123);
    let dataset = Dataset::synthetic(200, 5, 1, 0.0, &mut rng).unwrap();
    let mut network = Network::new(5, &[], 1, ActFn::Gelu, &mut rng);

    let mut losses = Vec::new();
    let cancel = AtomicBool::new(false);
    let mut trainer = Trainer::new(&mut network, dataset, Sgd::new(0.01), Mse, 50, 10, None);
    trainer
        .run(&cancel, |snapshot| losses.push(snapshot.loss))
        .unwrap();

    assert_eq!(losses.len(), 50);
    assert!(
        losses[49] < losses[0],
        "loss did not decrease: first {} last {}",
        losses[0],
        losses[49]
    );
}

#[test]
fn snapshot_epochs_increase_by_one_from_zero() {
    let mut rng = StdRng::seed_from_u64(8);
    let dataset = Dataset::synthetic(6, 2, 1, 0.1, &mut rng).unwrap();
    let mut network = Network::new(2, &[3], 1, ActFn::Relu, &mut rng);

    let mut epochs = Vec::new();
    let cancel = AtomicBool::new(false);
    let mut trainer = Trainer::new(&mut network, dataset, Sgd::new(0.05), Mse, 4, 2, None);
    trainer
        .run(&cancel, |snapshot| epochs.push(snapshot.epoch))
        .unwrap();

    assert_eq!(epochs, vec![0, 1, 2, 3]);
}

#[test]
fn snapshot_captures_last_batch_and_current_parameters() {
    let mut rng = StdRng::seed_from_u64(30);
    let dataset = Dataset::synthetic(5, 3, 1, 0.0, &mut rng).unwrap();
    let mut network = Network::new(3, &[4, 2], 1, ActFn::Gelu, &mut rng);

    let mut snapshots = Vec::new();
    let cancel = AtomicBool::new(false);
    let mut trainer = Trainer::new(&mut network, dataset, Sgd::new(0.01), Mse, 1, 2, None);
    trainer
        .run(&cancel, |snapshot| snapshots.push(snapshot))
        .unwrap();

    let snapshot = &snapshots[0];
    // 5 points in batches of 2: the last batch holds a single row.
    assert_eq!(snapshot.forward_data.input.len(), 1);
    assert_eq!(snapshot.forward_data.hidden_activation.len(), 2);
    assert_eq!(snapshot.forward_data.output.len(), 1);
    assert_eq!(snapshot.backward_data.per_layer_gradient_magnitudes.len(), 3);
    assert!(
        snapshot.backward_data.per_layer_gradient_magnitudes[0]
            .weights
            .iter()
            .flatten()
            .all(|&g| g >= 0.0)
    );

    let reported = &snapshot.weights_biases_data.per_layer_weights;
    assert_eq!(reported.len(), 3);
    for (layer, reported_w) in network.layers().iter().zip(reported) {
        assert_eq!(reported_w.len(), layer.weights.nrows());
        assert_eq!(reported_w[0].len(), layer.weights.ncols());
        // Post-update parameters, not the ones the epoch started with.
        assert_eq!(reported_w[0][0], layer.weights[[0, 0]]);
    }
}

#[test]
fn cancel_flag_stops_the_run_between_epochs() {
    let mut rng = StdRng::seed_from_u64(77);
    let dataset = Dataset::synthetic(4, 2, 1, 0.0, &mut rng).unwrap();
    let mut network = Network::new(2, &[3], 1, ActFn::Relu, &mut rng);

    let cancel = AtomicBool::new(false);
    let mut seen = 0usize;
    let mut trainer = Trainer::new(&mut network, dataset, Sgd::new(0.01), Mse, 100, 2, None);
    let outcome = trainer
        .run(&cancel, |snapshot| {
            seen += 1;
            if snapshot.epoch == 1 {
                cancel.store(true, Ordering::Release);
            }
        })
        .unwrap();

    assert_eq!(outcome, Outcome::Cancelled);
    assert_eq!(seen, 2);
}
