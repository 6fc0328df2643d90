use image::DynamicImage;
use thiserror::Error;

use crate::face::{FaceModel, FaceObservation, RawFace};
use crate::quality;

/// Per-frame failure. Never fatal to an enrollment batch on its own.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame {index}: malformed image: {source}")]
    Decode {
        index: usize,
        #[source]
        source: image::ImageError,
    },
    #[error("frame {index}: face model failed: {source}")]
    Model {
        index: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Descriptor extractor: decode → detect + embed → quality signals
pub struct Extractor<M> {
    pub model: M,
}

impl<M: FaceModel> Extractor<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    /// Turn one encoded frame into an observation.
    ///
    /// `Ok(None)` means the frame decoded but no usable face was found.
    pub fn extract(&mut self, index: usize, bytes: &[u8]) -> Result<Option<FaceObservation>, FrameError> {
        let img = image::load_from_memory(bytes).map_err(|source| FrameError::Decode { index, source })?;
        self.observe(index, &img)
    }

    /// Same as [`Extractor::extract`] for an already decoded frame
    pub fn observe(&mut self, index: usize, img: &DynamicImage) -> Result<Option<FaceObservation>, FrameError> {
        let faces = self
            .model
            .detect(img)
            .map_err(|e| FrameError::Model {
                index,
                source: e.into(),
            })?;

        // First detected face only
        let Some(RawFace { detection, vector }) = faces.into_iter().next() else {
            return Ok(None);
        };

        if vector.is_empty() || !vector.iter().all(|v| v.is_finite()) {
            log::debug!("frame {}: descriptor is empty or non-finite", index);
            return Ok(None);
        }

        let observation = FaceObservation {
            detection_confidence: detection.score.max(0.0),
            bounding_box_area: detection.area(),
            sharpness: quality::sharpness(img),
            frontalness: quality::frontalness(&detection, img.width()),
            source_index: index,
            vector,
        };
        log::debug!(
            "frame {}: score={:.3} area={:.0} sharpness={:.2} frontalness={:.3}",
            index,
            observation.detection_confidence,
            observation.bounding_box_area,
            observation.sharpness,
            observation.frontalness
        );
        Ok(Some(observation))
    }
}
