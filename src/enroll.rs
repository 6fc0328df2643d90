use log::{info, warn};

use crate::error::FuseError;
use crate::fusion::{self, FusedIdentityVector};
use crate::scorer::{self, ScoreWeights};
use crate::{Extractor, FaceModel, FaceObservation, FrameError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnrollOptions {
    /// Frames kept for fusion
    pub select_top: usize,
    pub min_images: usize,
    pub weights: ScoreWeights,
}

impl Default for EnrollOptions {
    fn default() -> Self {
        Self {
            select_top: 10,
            min_images: 3,
            weights: ScoreWeights::default(),
        }
    }
}

/// What happened to each input frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrollReport {
    pub frames: usize,
    pub observed: usize,
    pub decode_errors: usize,
    pub model_errors: usize,
    pub no_face: usize,
}

/// Run the extractor over every frame, skipping the ones that fail.
pub fn extract_all<M, B>(images: &[B], extractor: &mut Extractor<M>) -> (Vec<FaceObservation>, EnrollReport)
where
    M: FaceModel,
    B: AsRef<[u8]>,
{
    let mut report = EnrollReport {
        frames: images.len(),
        ..Default::default()
    };
    let mut observations = Vec::with_capacity(images.len());

    for (idx, bytes) in images.iter().enumerate() {
        match extractor.extract(idx, bytes.as_ref()) {
            Ok(Some(obs)) => {
                report.observed += 1;
                observations.push(obs);
            }
            Ok(None) => {
                report.no_face += 1;
                warn!("Frame {}: no face found", idx);
            }
            Err(e @ FrameError::Decode { .. }) => {
                report.decode_errors += 1;
                warn!("Skipping frame: {}", e);
            }
            Err(e @ FrameError::Model { .. }) => {
                report.model_errors += 1;
                warn!("Skipping frame: {}", e);
            }
        }
    }

    (observations, report)
}

/// Full enrollment: extract, score, select and fuse.
pub fn score_and_fuse<M, B>(
    images: &[B],
    extractor: &mut Extractor<M>,
    options: &EnrollOptions,
) -> Result<FusedIdentityVector, FuseError>
where
    M: FaceModel,
    B: AsRef<[u8]>,
{
    if images.len() < options.min_images {
        return Err(FuseError::TooFewImages {
            required: options.min_images,
            given: images.len(),
        });
    }
    options.weights.validate()?;

    let (observations, report) = extract_all(images, extractor);
    info!(
        "{} of {} frame(s) usable ({} undecodable, {} model failures, {} without a face)",
        report.observed, report.frames, report.decode_errors, report.model_errors, report.no_face
    );
    if observations.is_empty() {
        return Err(FuseError::NoUsableFrames {
            frames: report.frames,
        });
    }

    fuse_observations(&observations, options)
}

/// Score and fuse observations produced elsewhere.
pub fn fuse_observations(
    observations: &[FaceObservation],
    options: &EnrollOptions,
) -> Result<FusedIdentityVector, FuseError> {
    options.weights.validate()?;
    let scores = scorer::score(observations, &options.weights);
    fusion::select_and_fuse(observations, &scores, options.select_top.max(1))
}
