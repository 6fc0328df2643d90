use serde::{Deserialize, Serialize};

use crate::error::FuseError;
use crate::FaceObservation;

/// Relative importance of each quality signal.
///
/// Weights need not sum to 1; scores are only comparable within one call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub frontalness: f32,
    pub sharpness: f32,
    pub area: f32,
    /// Detector confidence
    pub quality: f32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            frontalness: 0.4,
            sharpness: 0.3,
            area: 0.2,
            quality: 0.1,
        }
    }
}

impl ScoreWeights {
    pub fn validate(&self) -> Result<(), FuseError> {
        for (name, value) in [
            ("frontalness", self.frontalness),
            ("sharpness", self.sharpness),
            ("area", self.area),
            ("quality", self.quality),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(FuseError::InvalidWeights { name, value });
            }
        }
        Ok(())
    }

    pub fn sum(&self) -> f32 {
        self.frontalness + self.sharpness + self.area + self.quality
    }
}

/// Composite quality score per observation, in input order.
pub fn score(observations: &[FaceObservation], weights: &ScoreWeights) -> Vec<f32> {
    let sharp = signal(observations, |o| o.sharpness);
    let frontal = signal(observations, |o| o.frontalness);
    let area = signal(observations, |o| o.bounding_box_area);
    let quality = signal(observations, |o| o.detection_confidence);

    (0..observations.len())
        .map(|i| {
            weights.frontalness * frontal[i]
                + weights.sharpness * sharp[i]
                + weights.area * area[i]
                + weights.quality * quality[i]
        })
        .collect()
}

fn signal(observations: &[FaceObservation], f: impl Fn(&FaceObservation) -> f32) -> Vec<f32> {
    min_max(&observations.iter().map(f).collect::<Vec<_>>())
}

/// Min-max normalize into `[0, 1]`; a constant signal maps to 1.0 everywhere.
///
/// Non-finite values count as the batch minimum.
fn min_max(values: &[f32]) -> Vec<f32> {
    let (min, max) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;
    if range > 0.0 && range.is_finite() {
        values
            .iter()
            .map(|&v| if v.is_finite() { (v - min) / range } else { 0.0 })
            .collect()
    } else {
        vec![1.0; values.len()]
    }
}
