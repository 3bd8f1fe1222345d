use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to build ONNX session: {0}")]
    Session(ort::Error),
    #[error("Inference failed: {0}")]
    Inference(ort::Error),
    #[error("Invalid tensor shape: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("Unexpected model output shape: {0:?}")]
    UnexpectedOutput(Vec<usize>),
    #[error("Session mutex poisoned")]
    SessionPoisoned,
}

/// One detected region in source image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: u32,
}

pub trait ModelService: Send + Sync + 'static {
    fn predict(&self, image: &RgbImage) -> Result<Vec<Detection>, ModelError>;
}
