//! HTTP transport for segment submissions.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use seg_protocol::{Address, PAYMENT_HEADER, SEGMENT_HEADER, SEGMENT_PATH, SENDER_HEADER};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::handler::{serve_segment, SegmentRequest, SegmentResponse};
use crate::orchestrator::Orchestrator;

#[derive(Clone)]
pub struct ServerState {
    pub orchestrator: Arc<dyn Orchestrator>,
}

pub fn router(orchestrator: Arc<dyn Orchestrator>, max_segment_bytes: usize) -> Router {
    Router::new()
        .route(SEGMENT_PATH, post(submit_segment))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_segment_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(ServerState { orchestrator })
}

pub async fn serve(
    listener: tokio::net::TcpListener,
    router: Router,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn submit_segment(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = SegmentRequest {
        payment_header: header_text(&headers, PAYMENT_HEADER),
        creds_header: header_text(&headers, SEGMENT_HEADER),
        sender: sender_address(&headers),
        body: body.to_vec(),
    };

    // The capabilities block (transcoding, disk), so keep them off the
    // async workers.
    let orchestrator = Arc::clone(&state.orchestrator);
    match tokio::task::spawn_blocking(move || serve_segment(orchestrator.as_ref(), request)).await
    {
        Ok(response) => into_http(response),
        Err(e) => {
            error!(error = %e, "segment handler panicked");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn header_text(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .unwrap_or_default()
}

/// A missing or unparsable sender is the zero address, which no keyring
/// entry matches.
fn sender_address(headers: &HeaderMap) -> Address {
    let raw = header_text(headers, SENDER_HEADER);
    if raw.trim().is_empty() {
        return Address::ZERO;
    }
    raw.parse().unwrap_or_else(|e| {
        warn!(sender = %raw, error = %e, "unparsable sender header");
        Address::ZERO
    })
}

fn into_http(response: SegmentResponse) -> Response {
    let status = StatusCode::from_u16(response.status.code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(CONTENT_TYPE, response.content_type)], response.body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_sender_defaults_to_zero() {
        let headers = HeaderMap::new();
        assert_eq!(sender_address(&headers), Address::ZERO);
    }

    #[test]
    fn test_sender_parsed() {
        let addr = Address([0x42; 20]);
        let mut headers = HeaderMap::new();
        headers.insert(SENDER_HEADER, HeaderValue::from_str(&addr.to_string()).unwrap());
        assert_eq!(sender_address(&headers), addr);
    }

    #[test]
    fn test_bad_sender_is_zero() {
        let mut headers = HeaderMap::new();
        headers.insert(SENDER_HEADER, HeaderValue::from_static("nope"));
        assert_eq!(sender_address(&headers), Address::ZERO);
    }

    #[test]
    fn test_missing_header_is_empty() {
        assert_eq!(header_text(&HeaderMap::new(), PAYMENT_HEADER), "");
    }
}
