use crate::config::{CameraConfig, Resolution};
use opencv::{core::Mat, prelude::*, videoio};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open camera: {0}")]
    OpenCameraFailed(opencv::Error),
    #[error("Camera device {0} is unavailable")]
    DeviceUnavailable(i32),
    #[error("Failed to read frame: {0}")]
    ReadFrameFailed(opencv::Error),
    #[error("OpenCV error: {0}")]
    OpenCvError(opencv::Error),
}

impl From<opencv::Error> for CameraError {
    fn from(err: opencv::Error) -> Self {
        CameraError::OpenCvError(err)
    }
}

/// Anything that hands out BGR frames one at a time.
///
/// `Ok(None)` means the source has no frame to give; callers treat it as the
/// end of the feed rather than retrying with a previous frame.
pub trait FrameSource: Send + 'static {
    fn read_frame(&mut self) -> Result<Option<Mat>, CameraError>;

    fn release(&mut self) -> Result<(), CameraError> {
        Ok(())
    }
}

pub struct Camera {
    capture: videoio::VideoCapture,
    device_index: i32,
}

impl Camera {
    pub fn open(config: &CameraConfig, resolution: Resolution) -> Result<Self, CameraError> {
        let mut capture = videoio::VideoCapture::new(config.device_index, videoio::CAP_ANY)
            .map_err(CameraError::OpenCameraFailed)?;
        if !capture.is_opened()? {
            return Err(CameraError::DeviceUnavailable(config.device_index));
        }

        capture.set(videoio::CAP_PROP_FRAME_WIDTH, resolution.width as f64)?;
        capture.set(videoio::CAP_PROP_FRAME_HEIGHT, resolution.height as f64)?;

        let actual_width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)?;
        let actual_height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)?;
        tracing::info!(
            "Opened camera {} (requested {}x{}, got {}x{})",
            config.device_index,
            resolution.width,
            resolution.height,
            actual_width,
            actual_height
        );

        Ok(Self {
            capture,
            device_index: config.device_index,
        })
    }
}

impl FrameSource for Camera {
    fn read_frame(&mut self) -> Result<Option<Mat>, CameraError> {
        let mut frame = Mat::default();
        let grabbed = self
            .capture
            .read(&mut frame)
            .map_err(CameraError::ReadFrameFailed)?;
        if !grabbed || frame.empty() {
            tracing::warn!("Camera {} returned no frame", self.device_index);
            return Ok(None);
        }
        Ok(Some(frame))
    }

    fn release(&mut self) -> Result<(), CameraError> {
        self.capture.release()?;
        tracing::info!("Released camera {}", self.device_index);
        Ok(())
    }
}
