use serde::{Deserialize, Serialize};

/// The specification for the hidden-layer activation function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationSpec {
    Identity,
    Relu,
    #[default]
    Gelu,
}

/// The specification for a training job.
///
/// The output layer is always linear; `activation` applies to hidden layers
/// only. Targets are the sum of the input features plus Gaussian noise scaled
/// by `noise_level`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSpec {
    pub input_size: usize,
    pub hidden_sizes: Vec<usize>,
    pub output_size: usize,
    pub epochs: usize,
    pub learning_rate: f32,
    pub num_data_points: usize,
    pub noise_level: f32,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub activation: ActivationSpec,
    /// Simulated per-batch processing latency, in milliseconds.
    #[serde(default)]
    pub batch_delay_ms: Option<u64>,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_batch_size() -> usize {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_defaults_fill_in_optional_fields() {
        let raw = r#"{
            "input_size": 5,
            "hidden_sizes": [3, 2],
            "output_size": 1,
            "epochs": 10,
            "learning_rate": 0.01,
            "num_data_points": 100,
            "noise_level": 0.1
        }"#;

        let spec: TrainingSpec = serde_json::from_str(raw).unwrap();
        assert_eq!(spec.batch_size, 1);
        assert_eq!(spec.activation, ActivationSpec::Gelu);
        assert_eq!(spec.batch_delay_ms, None);
        assert_eq!(spec.seed, None);
    }

    #[test]
    fn activation_spec_uses_snake_case_names() {
        let act: ActivationSpec = serde_json::from_str(r#""relu""#).unwrap();
        assert_eq!(act, ActivationSpec::Relu);
    }
}
