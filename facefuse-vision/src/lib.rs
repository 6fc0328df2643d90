pub mod extractor;
pub mod face;
pub mod quality;

// Re-export commonly used types
pub use extractor::{Extractor, FrameError};
pub use face::{Detection, FaceModel, FaceObservation, RawFace};
