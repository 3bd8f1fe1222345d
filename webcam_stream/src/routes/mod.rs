mod index;
mod video_feed;

use crate::context::AppContext;
use axum::{routing::get, Router};

pub fn api_routes() -> Router<AppContext> {
    Router::new()
        .route("/", get(index::index))
        .route("/video_feed", get(video_feed::video_feed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::{person, StubDetector, SyntheticSource};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    fn router(source: SyntheticSource, detector: StubDetector) -> Router {
        let context = AppContext::new(Box::new(source), Arc::new(detector), 90);
        api_routes().with_state(context)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack
            .windows(needle.len())
            .filter(|window| *window == needle)
            .count()
    }

    #[tokio::test]
    async fn test_index_embeds_stream() {
        let app = router(SyntheticSource::endless(), StubDetector::returning(vec![]));

        let response = app.oneshot(get_request("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("src=\"/video_feed\""));
    }

    #[tokio::test]
    async fn test_video_feed_streams_multipart_frames() {
        let app = router(
            SyntheticSource::finite(2),
            StubDetector::returning(vec![person(0.87)]),
        );

        let response = app.oneshot(get_request("/video_feed")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "multipart/x-mixed-replace; boundary=frame"
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.starts_with(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n"));
        assert!(body.ends_with(b"\r\n\r\n"));
        assert_eq!(count(&body, b"Content-Type: image/jpeg\r\n\r\n"), 2);
    }

    #[tokio::test]
    async fn test_second_client_is_rejected_while_streaming() {
        let app = router(SyntheticSource::endless(), StubDetector::returning(vec![]));

        let first = app.clone().oneshot(get_request("/video_feed")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app.clone().oneshot(get_request("/video_feed")).await.unwrap();
        assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);

        drop(first);

        let third = app.oneshot(get_request("/video_feed")).await.unwrap();
        assert_eq!(third.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = router(SyntheticSource::endless(), StubDetector::returning(vec![]));

        let response = app.oneshot(get_request("/metrics")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
