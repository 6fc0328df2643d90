pub mod config;
pub mod enroll;
pub mod error;
pub mod fusion;
pub mod index;
pub mod matcher;
pub mod scorer;
pub mod service;
pub mod storage;

pub use error::FuseError;
pub use fusion::FusedIdentityVector;
pub use index::{Backend, GalleryEntry, IndexHandle, SearchHit, VectorIndex};
pub use matcher::{Match, Matcher};
pub use scorer::ScoreWeights;

// Re-export vision types for convenience
pub use facefuse_vision::{face, quality, Detection, Extractor, FaceModel, FaceObservation, FrameError};
