use thiserror::Error;

/// Caller-visible enrollment failures.
///
/// Per-frame problems (bad bytes, no face) never show up here; they are
/// logged and counted while the batch continues.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FuseError {
    #[error("no usable face in any of {frames} frame(s)")]
    NoUsableFrames { frames: usize },
    #[error("enrollment needs at least {required} images, got {given}")]
    TooFewImages { required: usize, given: usize },
    #[error("descriptor length {found} differs from {expected} (frame {source_index})")]
    DimensionMismatch {
        expected: usize,
        found: usize,
        source_index: usize,
    },
    #[error("{scores} score(s) given for {observations} observation(s)")]
    ScoreCountMismatch { observations: usize, scores: usize },
    #[error("weight `{name}` must be a finite non-negative number, got {value}")]
    InvalidWeights { name: &'static str, value: f32 },
}
