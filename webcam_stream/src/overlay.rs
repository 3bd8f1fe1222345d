use crate::bounding_box::BoundingBoxWithLabels;
use yolo_inference::{ColorLabel, Detection};

/// Everything drawn on one frame: a labeled box per detection and the
/// object counter.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub boxes: Vec<BoundingBoxWithLabels>,
    pub counter_text: String,
}

impl Overlay {
    pub fn new(detections: &[Detection], class_labels: &[ColorLabel]) -> Self {
        let boxes: Vec<BoundingBoxWithLabels> = detections
            .iter()
            .map(|detection| BoundingBoxWithLabels::from_detection(detection, class_labels))
            .collect();
        let counter_text = format!("Total Objects: {}", boxes.len());

        Self {
            boxes,
            counter_text,
        }
    }

    pub fn captions(&self) -> Vec<String> {
        self.boxes.iter().map(BoundingBoxWithLabels::caption).collect()
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}
