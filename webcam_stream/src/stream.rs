use crate::pipeline::{FramePipeline, PipelineError, ProcessedFrame};
use bytes::Bytes;
use futures::stream;
use tokio::sync::{broadcast, OwnedSemaphorePermit};
use tracing::instrument;

pub const FRAME_BOUNDARY: &str = "frame";

/// Wraps one JPEG payload as a `multipart/x-mixed-replace` part.
pub fn multipart_chunk(jpeg: &[u8]) -> Bytes {
    let part_header = format!("--{}\r\nContent-Type: image/jpeg\r\n\r\n", FRAME_BOUNDARY);
    let mut body = Vec::with_capacity(part_header.len() + jpeg.len() + 4);
    body.extend_from_slice(part_header.as_bytes());
    body.extend_from_slice(jpeg);
    body.extend_from_slice(b"\r\n\r\n");
    Bytes::from(body)
}

/// One client's feed. Frames are produced only when the consumer polls, and
/// the stream ends on the first missing frame, pipeline error or shutdown.
/// Dropping it hands the camera slot back.
pub struct VideoStream {
    pipeline: FramePipeline,
    shutdown_rx: broadcast::Receiver<()>,
    _slot: OwnedSemaphorePermit,
}

enum Step {
    Shutdown,
    Frame(Result<Option<ProcessedFrame>, PipelineError>),
    Panicked(tokio::task::JoinError),
}

impl VideoStream {
    pub fn new(
        pipeline: FramePipeline,
        shutdown_rx: broadcast::Receiver<()>,
        slot: OwnedSemaphorePermit,
    ) -> Self {
        Self {
            pipeline,
            shutdown_rx,
            _slot: slot,
        }
    }

    #[instrument(skip(self))]
    pub fn generate_stream(self) -> impl futures::Stream<Item = Bytes> + Send + 'static {
        stream::unfold(self, |mut video_stream| async move {
            let pipeline = video_stream.pipeline.clone();
            let task = tokio::task::spawn_blocking(move || pipeline.next_frame());

            let step = tokio::select! {
                biased;
                _ = video_stream.shutdown_rx.recv() => Step::Shutdown,
                joined = task => match joined {
                    Ok(result) => Step::Frame(result),
                    Err(e) => Step::Panicked(e),
                },
            };

            match step {
                Step::Frame(Ok(Some(frame))) => {
                    tracing::debug!(
                        "Streaming frame with {} objects ({} bytes)",
                        frame.overlay.len(),
                        frame.jpeg.len()
                    );
                    Some((multipart_chunk(&frame.jpeg), video_stream))
                }
                Step::Frame(Ok(None)) => {
                    tracing::info!("No frame available, closing video stream");
                    None
                }
                Step::Frame(Err(e)) => {
                    tracing::error!("Error producing frame: {:?}", e);
                    None
                }
                Step::Panicked(e) => {
                    tracing::error!("Frame task failed: {:?}", e);
                    None
                }
                Step::Shutdown => {
                    tracing::info!("Video stream received shutdown signal");
                    None
                }
            }
        })
    }
}

impl Drop for VideoStream {
    fn drop(&mut self) {
        tracing::info!("Video stream closed");
    }
}
