mod ort_service;

pub mod config;
pub mod labels;
pub mod model_service;

pub use labels::{load_yolov8_labels, ColorLabel, LabelsError};
pub use model_service::{Detection, ModelError, ModelService};
pub use ort_service::OrtModelService;
