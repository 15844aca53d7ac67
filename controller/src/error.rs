use std::{error::Error, fmt, io};

use engine::EngineErr;

/// The job-control layer's result type.
pub type Result<T> = std::result::Result<T, ControllerErr>;

/// Job-control failures: configuration problems caught before a job starts
/// and concurrency-policy rejections. Runtime engine errors surface as
/// `training_error` events, not through this type.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerErr {
    JobAlreadyRunning,
    ResetWhileRunning,
    InvalidSpec { field: &'static str, got: f64 },
    Engine(EngineErr),
}

impl fmt::Display for ControllerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerErr::JobAlreadyRunning => {
                write!(f, "a training job is already running")
            }
            ControllerErr::ResetWhileRunning => {
                write!(f, "cannot reset the network while a job is running")
            }
            ControllerErr::InvalidSpec { field, got } => {
                write!(f, "invalid training spec: {field} = {got}")
            }
            ControllerErr::Engine(e) => write!(f, "engine error: {e}"),
        }
    }
}

impl Error for ControllerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ControllerErr::Engine(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EngineErr> for ControllerErr {
    fn from(value: EngineErr) -> Self {
        Self::Engine(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<ControllerErr> for io::Error {
    fn from(value: ControllerErr) -> Self {
        io::Error::new(io::ErrorKind::InvalidInput, value)
    }
}
