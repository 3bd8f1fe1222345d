use crate::{
    camera::{Camera, CameraError, FrameSource},
    config::{Config, Resolution},
    detection::{Detector, YoloDetector},
    pipeline::FramePipeline,
    stream::VideoStream,
};
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, Semaphore};
use yolo_inference::{
    config::Validatable, load_yolov8_labels, LabelsError, ModelError, OrtModelService,
};

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Failed to load model: {0}")]
    Model(#[from] ModelError),
    #[error("Failed to load labels: {0}")]
    Labels(#[from] LabelsError),
    #[error("Failed to open camera: {0}")]
    Camera(#[from] CameraError),
}

/// Process-wide state shared with every request handler.
///
/// Owns the one camera handle and the loaded detector. Only one video
/// stream may hold the camera at a time.
#[derive(Clone)]
pub struct AppContext {
    pipeline: FramePipeline,
    stream_slot: Arc<Semaphore>,
    shutdown_tx: broadcast::Sender<()>,
}

impl AppContext {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Arc<dyn Detector>,
        jpeg_quality: i32,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            pipeline: FramePipeline::new(Arc::new(Mutex::new(source)), detector, jpeg_quality),
            stream_slot: Arc::new(Semaphore::new(1)),
            shutdown_tx,
        }
    }

    /// Loads the model and class labels, then opens the camera.
    pub fn initialize(config: &Config, resolution: Resolution) -> Result<Self, StartupError> {
        let class_labels = load_yolov8_labels(&config.labels.get_path())?;
        let model = OrtModelService::new(&config.model)?;
        let detector: Arc<dyn Detector> = Arc::new(YoloDetector::new(model, class_labels));

        let camera: Box<dyn FrameSource> = Box::new(Camera::open(&config.camera, resolution)?);

        Ok(Self::new(camera, detector, config.stream.jpeg_quality))
    }

    /// Claims the camera for a new client. `None` while another stream is
    /// active.
    pub fn open_stream(&self) -> Option<VideoStream> {
        let slot = self.stream_slot.clone().try_acquire_owned().ok()?;
        Some(VideoStream::new(
            self.pipeline.clone(),
            self.shutdown_tx.subscribe(),
            slot,
        ))
    }

    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Releases the camera. Call once the server has stopped.
    pub fn teardown(&self) {
        if let Err(e) = self.pipeline.release_source() {
            tracing::error!("Failed to release camera: {:?}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::{StubDetector, SyntheticSource};
    use std::sync::atomic::Ordering;

    fn context(source: SyntheticSource) -> AppContext {
        AppContext::new(
            Box::new(source),
            Arc::new(StubDetector::returning(vec![])),
            95,
        )
    }

    #[test]
    fn test_single_stream_slot() {
        let context = context(SyntheticSource::endless());

        let first = context.open_stream();
        assert!(first.is_some());
        assert!(context.open_stream().is_none());

        drop(first);
        assert!(context.open_stream().is_some());
    }

    #[test]
    fn test_teardown_releases_source() {
        let source = SyntheticSource::endless();
        let released = source.released.clone();
        let context = context(source);

        context.teardown();

        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_shipped_labels_cover_coco() {
        let labels = load_yolov8_labels(std::path::Path::new("configuration/coco_labels.txt"))
            .unwrap();

        assert_eq!(labels.len(), 80);
        assert_eq!(labels[0].label, "person");
    }

    #[test]
    fn test_shutdown_reaches_subscribers() {
        let context = context(SyntheticSource::endless());
        let mut shutdown_rx = context.subscribe_shutdown();

        context.shutdown();

        assert!(shutdown_rx.try_recv().is_ok());
    }
}
