use anyhow::Result;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// One face as reported by a detector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: [f32; 4], // x, y, w, h
    pub score: f32,
    /// Either the 5-point layout (eyes, nose, mouth corners) or the 68-point layout
    #[serde(default)]
    pub landmarks: Vec<[f32; 2]>,
}

impl Detection {
    pub fn area(&self) -> f32 {
        (self.bbox[2].max(0.0) * self.bbox[3].max(0.0)).max(0.0)
    }

    pub fn center_x(&self) -> f32 {
        self.bbox[0] + self.bbox[2] / 2.0
    }
}

/// Detector output paired with the descriptor computed for that face
#[derive(Debug, Clone)]
pub struct RawFace {
    pub detection: Detection,
    pub vector: Vec<f32>,
}

/// Opaque detection + embedding capability.
///
/// Implementations return faces in the order the model reports them; only the
/// first one is used for enrollment.
pub trait FaceModel {
    fn detect(&mut self, img: &DynamicImage) -> Result<Vec<RawFace>>;
}

impl<M: FaceModel + ?Sized> FaceModel for Box<M> {
    fn detect(&mut self, img: &DynamicImage) -> Result<Vec<RawFace>> {
        (**self).detect(img)
    }
}

/// One detected face in one enrollment frame, with the signals used to rank it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceObservation {
    pub vector: Vec<f32>,
    pub detection_confidence: f32,
    pub bounding_box_area: f32,
    pub sharpness: f32,
    /// 1.0 = fully frontal
    pub frontalness: f32,
    /// Position in the input frame sequence
    pub source_index: usize,
}
