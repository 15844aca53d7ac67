use std::f32::consts::{FRAC_1_SQRT_2, FRAC_2_SQRT_PI};

use telemetry::ActivationSpec;

// sqrt(2 / pi), used by the tanh approximation of GELU.
const SQRT_2_OVER_PI: f32 = FRAC_2_SQRT_PI * FRAC_1_SQRT_2;
const GELU_COEFF: f32 = 0.044715;

/// An elementwise activation function. `Identity` is what the output layer
/// always uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActFn {
    Identity,
    Relu,
    Gelu,
}

impl ActFn {
    pub fn f(&self, x: f32) -> f32 {
        match self {
            ActFn::Identity => x,
            ActFn::Relu => x.max(0.0),
            ActFn::Gelu => {
                let u = SQRT_2_OVER_PI * (x + GELU_COEFF * x.powi(3));
                0.5 * x * (1.0 + u.tanh())
            }
        }
    }

    pub fn df(&self, x: f32) -> f32 {
        match self {
            ActFn::Identity => 1.0,
            ActFn::Relu => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            ActFn::Gelu => {
                let u = SQRT_2_OVER_PI * (x + GELU_COEFF * x.powi(3));
                let t = u.tanh();
                let du = SQRT_2_OVER_PI * (1.0 + 3.0 * GELU_COEFF * x * x);
                0.5 * (1.0 + t) + 0.5 * x * (1.0 - t * t) * du
            }
        }
    }
}

impl From<ActivationSpec> for ActFn {
    fn from(spec: ActivationSpec) -> Self {
        match spec {
            ActivationSpec::Identity => ActFn::Identity,
            ActivationSpec::Relu => ActFn::Relu,
            ActivationSpec::Gelu => ActFn::Gelu,
        }
    }
}
