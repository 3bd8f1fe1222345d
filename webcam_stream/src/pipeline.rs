use crate::{
    camera::{CameraError, FrameSource},
    cv_utils::{CvImage, CvUtilsError},
    detection::{Detector, DetectorError},
    overlay::Overlay,
};
use opencv::core::Mat;
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use yolo_inference::{ColorLabel, Detection};

pub type SharedFrameSource = Arc<Mutex<Box<dyn FrameSource>>>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),
    #[error("Detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("Cv utils error: {0}")]
    CvUtils(#[from] CvUtilsError),
}

#[derive(Debug)]
pub struct ProcessedFrame {
    pub jpeg: Vec<u8>,
    pub overlay: Overlay,
}

/// Draws the overlay for `detections` on `frame` and encodes the result.
pub fn render_frame(
    frame: Mat,
    detections: &[Detection],
    class_labels: &[ColorLabel],
    jpeg_quality: i32,
) -> Result<ProcessedFrame, CvUtilsError> {
    let overlay = Overlay::new(detections, class_labels);
    let mut image = CvImage::new(frame);
    let jpeg = image.annotate(&overlay)?.to_jpg(jpeg_quality)?;
    Ok(ProcessedFrame { jpeg, overlay })
}

/// Capture, detect, annotate and encode, one frame per call.
#[derive(Clone)]
pub struct FramePipeline {
    source: SharedFrameSource,
    detector: Arc<dyn Detector>,
    jpeg_quality: i32,
}

impl FramePipeline {
    pub fn new(
        source: SharedFrameSource,
        detector: Arc<dyn Detector>,
        jpeg_quality: i32,
    ) -> Self {
        Self {
            source,
            detector,
            jpeg_quality,
        }
    }

    /// Blocks for the duration of one frame. `Ok(None)` when the source has
    /// nothing left to give.
    pub fn next_frame(&self) -> Result<Option<ProcessedFrame>, PipelineError> {
        let frame = self.source.lock().read_frame()?;
        let Some(frame) = frame else {
            return Ok(None);
        };

        let detections = self.detector.detect(&frame)?;
        let processed = render_frame(
            frame,
            &detections,
            self.detector.class_labels(),
            self.jpeg_quality,
        )?;

        Ok(Some(processed))
    }

    pub fn release_source(&self) -> Result<(), CameraError> {
        self.source.lock().release()
    }
}
