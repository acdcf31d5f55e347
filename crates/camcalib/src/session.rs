use crate::pattern::PatternSpec;
use camcalib_image::ImageSize;
use std::path::{Path, PathBuf};

/// The outcome of the detection on one input image.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageObservation {
    /// The input image.
    pub source: PathBuf,
    /// The size of the input image.
    pub image_size: ImageSize,
    /// Whether the complete pattern was found.
    pub found: bool,
    /// The refined corners when found, the partial candidates otherwise.
    pub corners: Vec<[f32; 2]>,
    /// The corner visualization written for this image, if any.
    pub debug_path: Option<PathBuf>,
}

/// State accumulated over a calibration run.
///
/// Every found pattern contributes one view, made of the board object points and the
/// refined image corners, in input order.
#[derive(Clone, Debug)]
pub struct CalibrationSession {
    pattern: PatternSpec,
    object_points: Vec<Vec<[f64; 3]>>,
    image_points: Vec<Vec<[f64; 2]>>,
    observations: Vec<ImageObservation>,
    image_size: Option<ImageSize>,
}

impl CalibrationSession {
    /// Create an empty session for the given target.
    pub fn new(pattern: PatternSpec) -> Self {
        Self {
            pattern,
            object_points: Vec::new(),
            image_points: Vec::new(),
            observations: Vec::new(),
            image_size: None,
        }
    }

    /// Record the outcome of the detection on one image.
    ///
    /// The session keeps the size of the last image. Images of different sizes are
    /// accepted with a warning.
    pub fn record(&mut self, observation: ImageObservation) {
        if let Some(size) = self.image_size {
            if size != observation.image_size {
                log::warn!(
                    "{} is {}, previous images are {}",
                    observation.source.display(),
                    observation.image_size,
                    size
                );
            }
        }
        self.image_size = Some(observation.image_size);

        if observation.found {
            self.object_points.push(self.pattern.object_points());
            self.image_points.push(
                observation
                    .corners
                    .iter()
                    .map(|c| [c[0] as f64, c[1] as f64])
                    .collect(),
            );
        }
        self.observations.push(observation);
    }

    /// The calibration target.
    pub fn pattern(&self) -> &PatternSpec {
        &self.pattern
    }

    /// The object points of each view.
    pub fn object_points(&self) -> &[Vec<[f64; 3]>] {
        &self.object_points
    }

    /// The image points of each view.
    pub fn image_points(&self) -> &[Vec<[f64; 2]>] {
        &self.image_points
    }

    /// Every processed image, in input order.
    pub fn observations(&self) -> &[ImageObservation] {
        &self.observations
    }

    /// The size of the last processed image.
    pub fn image_size(&self) -> Option<ImageSize> {
        self.image_size
    }

    /// Number of views, i.e. images where the pattern was found.
    pub fn num_views(&self) -> usize {
        self.image_points.len()
    }

    /// The visualizations of the images where the pattern was found.
    pub fn undistort_queue(&self) -> impl Iterator<Item = &Path> {
        self.observations
            .iter()
            .filter(|obs| obs.found)
            .filter_map(|obs| obs.debug_path.as_deref())
    }
}
