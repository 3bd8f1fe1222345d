use yolo_inference::{ColorLabel, Detection};

#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBoxWithLabels {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub class_label: String,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub confidence: f32,
}

impl BoundingBoxWithLabels {
    pub fn from_detection(detection: &Detection, class_labels: &[ColorLabel]) -> Self {
        match class_labels.get(detection.class_id as usize) {
            Some(color_label) => Self {
                x1: detection.x1,
                y1: detection.y1,
                x2: detection.x2,
                y2: detection.y2,
                class_label: color_label.label.clone(),
                red: color_label.red,
                green: color_label.green,
                blue: color_label.blue,
                confidence: detection.confidence,
            },
            None => Self {
                x1: detection.x1,
                y1: detection.y1,
                x2: detection.x2,
                y2: detection.y2,
                class_label: format!("Unknown class {}", detection.class_id),
                red: 0,
                green: 0,
                blue: 0,
                confidence: detection.confidence,
            },
        }
    }

    /// `<class-name> <confidence>` with two decimals.
    pub fn caption(&self) -> String {
        format!("{} {:.2}", self.class_label, self.confidence)
    }
}
