use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire engine crate.
pub type Result<T> = std::result::Result<T, EngineErr>;

/// The training engine's error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineErr {
    ShapeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    StaleCache {
        layer: usize,
        got: usize,
        expected: usize,
    },
    EmptyDataset,
}

impl Display for EngineErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineErr::ShapeMismatch {
                what,
                got,
                expected,
            } => {
                write!(
                    f,
                    "shape mismatch on {what}: got {got}, expected {expected}"
                )
            }
            EngineErr::StaleCache {
                layer,
                got,
                expected,
            } => write!(
                f,
                "forward cache is stale at layer {layer}: cached width {got}, parameters expect {expected}"
            ),
            EngineErr::EmptyDataset => {
                write!(f, "dataset must contain at least one data point")
            }
        }
    }
}

impl Error for EngineErr {}
