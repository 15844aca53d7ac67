pub mod event;
pub mod spec;

pub use event::{
    BackwardData, Event, ForwardData, GradientSnapshot, LayerActivation,
    LayerGradientMagnitudes, TrainingSnapshot, WeightsBiasesData,
};
pub use spec::{ActivationSpec, TrainingSpec};
