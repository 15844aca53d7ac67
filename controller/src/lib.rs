pub mod controller;
pub mod error;
pub mod publisher;

pub use controller::{JobController, JobHandle};
pub use error::{ControllerErr, Result};
pub use publisher::Publisher;
