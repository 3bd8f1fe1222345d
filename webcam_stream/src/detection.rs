use image::RgbImage;
use opencv::{core::Mat, imgproc, prelude::*};
use thiserror::Error;
use tracing::instrument;
use yolo_inference::{ColorLabel, Detection, ModelError, ModelService};

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("OpenCV error: {0}")]
    OpenCvError(#[from] opencv::Error),
    #[error("Frame of {width}x{height} could not be converted to RGB")]
    FrameConversion { width: i32, height: i32 },
    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

pub trait Detector: Send + Sync + 'static {
    fn detect(&self, frame: &Mat) -> Result<Vec<Detection>, DetectorError>;

    /// Class id to display name and color.
    fn class_labels(&self) -> &[ColorLabel];
}

pub struct YoloDetector<M: ModelService> {
    model: M,
    class_labels: Vec<ColorLabel>,
}

impl<M: ModelService> YoloDetector<M> {
    pub fn new(model: M, class_labels: Vec<ColorLabel>) -> Self {
        Self {
            model,
            class_labels,
        }
    }
}

impl<M: ModelService> Detector for YoloDetector<M> {
    #[instrument(skip_all)]
    fn detect(&self, frame: &Mat) -> Result<Vec<Detection>, DetectorError> {
        let image = mat_to_rgb_image(frame)?;
        Ok(self.model.predict(&image)?)
    }

    fn class_labels(&self) -> &[ColorLabel] {
        &self.class_labels
    }
}

pub(crate) fn mat_to_rgb_image(frame: &Mat) -> Result<RgbImage, DetectorError> {
    let mut rgb = Mat::default();
    imgproc::cvt_color_def(frame, &mut rgb, imgproc::COLOR_BGR2RGB)?;

    let (width, height) = (rgb.cols(), rgb.rows());
    let data = rgb.data_bytes()?.to_vec();

    RgbImage::from_raw(width as u32, height as u32, data)
        .ok_or(DetectorError::FrameConversion { width, height })
}
