use crate::context::AppContext;
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use std::convert::Infallible;
use thiserror::Error;
use tracing::instrument;

pub const CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

#[derive(Error, Debug)]
pub enum VideoFeedError {
    #[error("Camera is already streaming to another client")]
    Busy,
    #[error("Http builder error: {0}")]
    HttpBuilderError(String),
}

#[instrument(skip(state))]
pub async fn video_feed(State(state): State<AppContext>) -> Result<Response, VideoFeedError> {
    let video_stream = state.open_stream().ok_or(VideoFeedError::Busy)?;
    tracing::info!("Starting video stream");

    let stream = video_stream.generate_stream().map(Ok::<_, Infallible>);
    let body = Body::from_stream(stream);

    let response = Response::builder()
        .header(header::CONTENT_TYPE, CONTENT_TYPE)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(body)
        .map_err(|e| VideoFeedError::HttpBuilderError(e.to_string()))?;

    Ok(response)
}

impl IntoResponse for VideoFeedError {
    fn into_response(self) -> Response {
        let status = match self {
            VideoFeedError::Busy => StatusCode::SERVICE_UNAVAILABLE,
            VideoFeedError::HttpBuilderError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!("Video feed request rejected: {}", self);
        (status, self.to_string()).into_response()
    }
}
