use crate::{
    config::{ModelConfig, Validatable},
    model_service::{Detection, ModelError, ModelService},
};
use image::{imageops::FilterType, RgbImage};
use ndarray::{Array4, ArrayD, ArrayViewD, Axis, Ix3};
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};
use std::{path::Path, sync::Mutex};
use tracing::instrument;

const INPUT_SIZE: u32 = 640;
const OUTPUT_NAME: &str = "output0";

fn intersection(box1: &Detection, box2: &Detection) -> f32 {
    let width = (box1.x2.min(box2.x2) - box1.x1.max(box2.x1)).max(0.0);
    let height = (box1.y2.min(box2.y2) - box1.y1.max(box2.y1)).max(0.0);
    width * height
}

fn union(box1: &Detection, box2: &Detection) -> f32 {
    ((box1.x2 - box1.x1) * (box1.y2 - box1.y1)) + ((box2.x2 - box2.x1) * (box2.y2 - box2.y1))
        - intersection(box1, box2)
}

fn iou(box1: &Detection, box2: &Detection) -> f32 {
    let union = union(box1, box2);
    if union <= 0.0 {
        return 0.0;
    }
    intersection(box1, box2) / union
}

/// Resizes to the network input and lays the pixels out as NCHW in [0, 1].
pub(crate) fn transform_image(image: &RgbImage) -> Array4<f32> {
    let resized = image::imageops::resize(image, INPUT_SIZE, INPUT_SIZE, FilterType::CatmullRom);

    let mut input = Array4::<f32>::zeros((1, 3, INPUT_SIZE as usize, INPUT_SIZE as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        let [r, g, b] = pixel.0;
        input[[0, 0, y, x]] = (r as f32) / 255.;
        input[[0, 1, y, x]] = (g as f32) / 255.;
        input[[0, 2, y, x]] = (b as f32) / 255.;
    }

    input
}

/// Boxes are suppressed only against higher scoring boxes of the same class.
pub(crate) fn non_max_suppression(mut boxes: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    boxes.sort_by(|box1, box2| box2.confidence.total_cmp(&box1.confidence));

    let mut result = Vec::new();
    while !boxes.is_empty() {
        let best = boxes.remove(0);
        boxes.retain(|candidate| {
            candidate.class_id != best.class_id || iou(&best, candidate) < iou_threshold
        });
        result.push(best);
    }

    result
}

#[derive(Debug, Clone)]
pub(crate) struct DecodeParams<'a> {
    pub image_width: u32,
    pub image_height: u32,
    pub min_probability: f32,
    pub iou_threshold: f32,
    pub target_classes: &'a [u32],
}

/// Decodes a YOLOv8 `[1, 4 + classes, anchors]` output into detections in
/// source image coordinates, clipped to the image bounds. Anchors with
/// non-finite values are dropped.
pub(crate) fn decode_output(
    output: ArrayViewD<'_, f32>,
    params: &DecodeParams<'_>,
) -> Result<Vec<Detection>, ModelError> {
    let shape = output.shape().to_vec();
    if shape.len() != 3 || shape[0] != 1 || shape[1] < 5 {
        return Err(ModelError::UnexpectedOutput(shape));
    }

    let output = output.into_dimensionality::<Ix3>()?;
    let predictions = output.index_axis(Axis(0), 0);

    let x_scale = params.image_width as f32 / INPUT_SIZE as f32;
    let y_scale = params.image_height as f32 / INPUT_SIZE as f32;
    let max_x = params.image_width as f32;
    let max_y = params.image_height as f32;

    let mut boxes = Vec::new();
    for anchor in predictions.axis_iter(Axis(1)) {
        let Some((class_id, prob)) = anchor
            .iter()
            .skip(4)
            .copied()
            .enumerate()
            .reduce(|accum, row| if row.1 > accum.1 { row } else { accum })
        else {
            continue;
        };

        if !prob.is_finite() || prob < params.min_probability {
            continue;
        }

        let class_id = class_id as u32;
        if !params.target_classes.is_empty() && !params.target_classes.contains(&class_id) {
            continue;
        }

        if anchor.iter().take(4).any(|value| !value.is_finite()) {
            continue;
        }

        let xc = anchor[0] * x_scale;
        let yc = anchor[1] * y_scale;
        let w = anchor[2] * x_scale;
        let h = anchor[3] * y_scale;

        boxes.push(Detection {
            x1: (xc - w / 2.).clamp(0., max_x),
            y1: (yc - h / 2.).clamp(0., max_y),
            x2: (xc + w / 2.).clamp(0., max_x),
            y2: (yc + h / 2.).clamp(0., max_y),
            confidence: prob,
            class_id,
        });
    }

    Ok(non_max_suppression(boxes, params.iou_threshold))
}

fn build_session(path: &Path) -> Result<Session, ort::Error> {
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .commit_from_file(path)?;
    Ok(session)
}

pub struct OrtModelService {
    session: Mutex<Session>,
    min_probability: f32,
    iou_threshold: f32,
    target_classes: Vec<u32>,
}

impl OrtModelService {
    pub fn new(model_config: &ModelConfig) -> Result<Self, ModelError> {
        let path = model_config.get_path();
        let session = build_session(&path).map_err(ModelError::Session)?;

        tracing::info!(
            "Loaded ONNX model {:?} (target classes: {:?})",
            path,
            model_config.target_classes
        );

        Ok(Self {
            session: Mutex::new(session),
            min_probability: model_config.min_probability,
            iou_threshold: model_config.iou_threshold,
            target_classes: model_config.target_classes.clone(),
        })
    }

    pub fn run_inference(&self, input: &Array4<f32>) -> Result<ArrayD<f32>, ModelError> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| ModelError::SessionPoisoned)?;

        let owned_buffer;
        let input_view = if input.view().is_standard_layout() {
            input.view()
        } else {
            owned_buffer = input.as_standard_layout().into_owned();
            owned_buffer.view()
        };

        let tensor_ref = TensorRef::from_array_view(input_view).map_err(ModelError::Inference)?;

        let outputs = session
            .run(ort::inputs![tensor_ref])
            .map_err(ModelError::Inference)?;

        let (shape, data) = outputs[OUTPUT_NAME]
            .try_extract_tensor::<f32>()
            .map_err(ModelError::Inference)?;

        let array = ArrayD::from_shape_vec(shape.to_ixdyn(), data.to_vec())?;

        Ok(array)
    }
}

impl ModelService for OrtModelService {
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    fn predict(&self, image: &RgbImage) -> Result<Vec<Detection>, ModelError> {
        let input = transform_image(image);
        let output = self.run_inference(&input)?;

        let params = DecodeParams {
            image_width: image.width(),
            image_height: image.height(),
            min_probability: self.min_probability,
            iou_threshold: self.iou_threshold,
            target_classes: &self.target_classes,
        };
        let detections = decode_output(output.view(), &params)?;

        tracing::debug!("Returning {} detections", detections.len());
        for (i, detection) in detections.iter().enumerate() {
            tracing::debug!(
                "Detection {}: class_id={}, confidence={:.3}, bbox=({:.1}, {:.1}, {:.1}, {:.1})",
                i,
                detection.class_id,
                detection.confidence,
                detection.x1,
                detection.y1,
                detection.x2,
                detection.y2
            );
        }

        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use ndarray::Array3;

    fn detection(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32, class_id: u32) -> Detection {
        Detection {
            x1,
            y1,
            x2,
            y2,
            confidence,
            class_id,
        }
    }

    // Two classes, anchors laid out as columns of (xc, yc, w, h, p0, p1).
    fn raw_output(anchors: &[[f32; 6]]) -> ArrayD<f32> {
        let mut output = Array3::<f32>::zeros((1, 6, anchors.len()));
        for (column, anchor) in anchors.iter().enumerate() {
            for (row, value) in anchor.iter().enumerate() {
                output[[0, row, column]] = *value;
            }
        }
        output.into_dyn()
    }

    fn params(target_classes: &[u32]) -> DecodeParams<'_> {
        DecodeParams {
            image_width: 640,
            image_height: 640,
            min_probability: 0.25,
            iou_threshold: 0.7,
            target_classes,
        }
    }

    #[test]
    fn test_transform_image() {
        let img = RgbImage::from_pixel(100, 50, Rgb([255, 0, 0]));

        let input = transform_image(&img);

        assert_eq!(input.shape(), &[1, 3, 640, 640]);
        assert!((input[[0, 0, 320, 320]] - 1.0).abs() < 1e-3);
        assert!(input[[0, 1, 320, 320]].abs() < 1e-3);
        assert!(input[[0, 2, 320, 320]].abs() < 1e-3);
    }

    #[test]
    fn test_iou_of_disjoint_boxes_is_zero() {
        let a = detection(0.0, 0.0, 10.0, 10.0, 0.9, 0);
        let b = detection(20.0, 20.0, 30.0, 30.0, 0.9, 0);

        assert_eq!(iou(&a, &b), 0.0);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_non_max_suppression_keeps_best_overlapping_box() {
        let boxes = vec![
            detection(0.0, 0.0, 100.0, 100.0, 0.6, 0),
            detection(2.0, 2.0, 100.0, 100.0, 0.9, 0),
            detection(200.0, 200.0, 300.0, 300.0, 0.5, 0),
        ];

        let kept = non_max_suppression(boxes, 0.7);

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[1].confidence, 0.5);
    }

    #[test]
    fn test_non_max_suppression_is_per_class() {
        let boxes = vec![
            detection(0.0, 0.0, 100.0, 100.0, 0.9, 0),
            detection(0.0, 0.0, 100.0, 100.0, 0.8, 1),
        ];

        let kept = non_max_suppression(boxes, 0.7);

        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_decode_output_filters_and_scales() {
        let output = raw_output(&[
            [320.0, 320.0, 64.0, 128.0, 0.87, 0.10],
            [100.0, 100.0, 20.0, 20.0, 0.10, 0.05],
            [500.0, 500.0, 40.0, 40.0, 0.05, 0.95],
        ]);
        let params = DecodeParams {
            image_width: 1280,
            image_height: 320,
            ..params(&[])
        };

        let detections = decode_output(output.view(), &params).unwrap();

        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].class_id, 1);
        let person = detections[1];
        assert_eq!(person.class_id, 0);
        assert!((person.confidence - 0.87).abs() < 1e-6);
        assert!((person.x1 - 576.0).abs() < 1e-3);
        assert!((person.x2 - 704.0).abs() < 1e-3);
        assert!((person.y1 - 128.0).abs() < 1e-3);
        assert!((person.y2 - 192.0).abs() < 1e-3);
    }

    #[test]
    fn test_decode_output_restricts_to_target_classes() {
        let output = raw_output(&[
            [320.0, 320.0, 64.0, 128.0, 0.87, 0.10],
            [500.0, 500.0, 40.0, 40.0, 0.05, 0.95],
        ]);
        let targets = [0];

        let detections = decode_output(output.view(), &params(&targets)).unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class_id, 0);
    }

    #[test]
    fn test_decode_output_clips_boxes_to_image() {
        // 640x480 frame: x scales by 1.0, y by 0.75.
        let output = raw_output(&[
            [10.0, 320.0, 60.0, 200.0, 0.9, 0.0],
            [630.0, 630.0, 40.0, 40.0, 0.0, 0.8],
        ]);
        let params = DecodeParams {
            image_width: 640,
            image_height: 480,
            ..params(&[])
        };

        let detections = decode_output(output.view(), &params).unwrap();

        assert_eq!(detections.len(), 2);
        let left = detections[0];
        assert_eq!(left.x1, 0.0);
        assert!((left.y1 - 165.0).abs() < 1e-3);
        assert!((left.x2 - 40.0).abs() < 1e-3);
        assert!((left.y2 - 315.0).abs() < 1e-3);
        let corner = detections[1];
        assert_eq!(corner.x2, 640.0);
        assert_eq!(corner.y2, 480.0);
        for detection in &detections {
            assert!(detection.x1 >= 0.0 && detection.x2 <= 640.0);
            assert!(detection.y1 >= 0.0 && detection.y2 <= 480.0);
        }
    }

    #[test]
    fn test_decode_output_skips_non_finite_anchors() {
        let output = raw_output(&[
            [f32::NAN, 320.0, 60.0, 60.0, 0.9, 0.0],
            [320.0, 320.0, f32::INFINITY, 60.0, 0.9, 0.0],
            [320.0, 320.0, 60.0, 60.0, f32::NAN, 0.0],
            [100.0, 100.0, 20.0, 20.0, 0.6, 0.0],
        ]);

        let detections = decode_output(output.view(), &params(&[])).unwrap();

        assert_eq!(detections.len(), 1);
        assert!((detections[0].confidence - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_decode_output_rejects_unexpected_shape() {
        let output = ArrayD::<f32>::zeros(vec![1, 4, 10]);

        let result = decode_output(output.view(), &params(&[]));

        assert!(matches!(result, Err(ModelError::UnexpectedOutput(_))));
    }
}
