use serde::Deserialize;
use std::path::PathBuf;

pub trait Validatable {
    fn get_path(&self) -> PathBuf;

    fn validate(&self) -> Result<(), String> {
        if !self.get_path().exists() {
            return Err(format!("File not found: {:?}", self.get_path()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    pub onnx_file: String,
    pub model_dir: PathBuf,
    #[serde(default = "default_min_probability")]
    pub min_probability: f32,
    #[serde(default = "default_iou_threshold")]
    pub iou_threshold: f32,
    /// Class ids kept after decoding. Empty keeps every class.
    #[serde(default = "default_target_classes")]
    pub target_classes: Vec<u32>,
}

fn default_min_probability() -> f32 {
    0.25
}

fn default_iou_threshold() -> f32 {
    0.7
}

fn default_target_classes() -> Vec<u32> {
    vec![0]
}

impl Validatable for ModelConfig {
    fn get_path(&self) -> PathBuf {
        self.model_dir.join(&self.onnx_file)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LabelsConfig {
    pub labels_file: String,
    pub labels_dir: PathBuf,
}

impl Validatable for LabelsConfig {
    fn get_path(&self) -> PathBuf {
        self.labels_dir.join(&self.labels_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_path_joins_dir_and_file() {
        let config = ModelConfig {
            onnx_file: "yolov8n.onnx".to_string(),
            model_dir: PathBuf::from("models"),
            min_probability: default_min_probability(),
            iou_threshold: default_iou_threshold(),
            target_classes: default_target_classes(),
        };

        assert_eq!(config.get_path(), PathBuf::from("models/yolov8n.onnx"));
    }

    #[test]
    fn test_validate_missing_file() {
        let config = LabelsConfig {
            labels_file: "missing_labels.txt".to_string(),
            labels_dir: PathBuf::from("./does_not_exist"),
        };

        let err = config.validate().unwrap_err();
        assert!(err.contains("missing_labels.txt"));
    }
}
