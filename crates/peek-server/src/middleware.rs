//! Request timing middleware.
//!
//! Every request through the inspector server is timed and recorded under its
//! timestamp-stripped url, feeding the `getServerMetrics` query. A fresh
//! request replaces the url's previous samples, so the store reflects the
//! latest reload rather than growing unboundedly.

use crate::state::{MiddlewareTiming, SharedState};
use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use peek_core::util::remove_timestamp_query;
use std::time::Instant;

pub async fn time_requests(State(state): State<SharedState>, request: Request, next: Next) -> Response {
    let url = remove_timestamp_query(
        request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| request.uri().path()),
    );
    let name = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "router".to_string());

    let start = Instant::now();
    let response = next.run(request).await;
    let total = start.elapsed().as_millis() as u64;

    state.record_request_timing(
        url,
        vec![MiddlewareTiming {
            name,
            self_time: total,
            total,
        }],
    );

    response
}
