mod detector;
mod error;

pub use detector::{Detection, Detector};
pub use error::{DetectError, DetectResult};
