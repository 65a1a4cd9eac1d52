use std::sync::Arc;

use axum::body::Body;
use axum::extract::RawQuery;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::response::Response;
use bytes::Bytes;
use http::HeaderValue;
use http::header::CONTENT_TYPE;
use http_body_util::BodyExt;
use http_body_util::LengthLimitError;
use http_body_util::Limited;
use serde::Serialize;

use crate::batching::BatchExecutor;
use crate::batching::batch_from_bytes;
use crate::configuration::Batching;
use crate::error::RelayError;
use crate::graphql;
use crate::services::Executor;

/// Everything the handlers need, shared by every connection.
#[derive(Clone)]
pub(super) struct RelayState {
    pub(super) executor: Arc<dyn Executor>,
    pub(super) batch_executor: BatchExecutor<dyn Executor>,
    pub(super) batching: Batching,
    pub(super) max_request_bytes: usize,
}

pub(super) async fn handle_get(
    State(state): State<RelayState>,
    RawQuery(query): RawQuery,
) -> Result<Response, RelayError> {
    let query = query.ok_or(RelayError::MissingQuery)?;
    let request =
        graphql::Request::from_urlencoded_query(&query).map_err(RelayError::MalformedRequest)?;
    if request.query.is_none() {
        return Err(RelayError::MissingQuery);
    }
    run_single(&state, request).await
}

pub(super) async fn handle_post(
    State(state): State<RelayState>,
    body: Body,
) -> Result<Response, RelayError> {
    let bytes = read_body(body, state.max_request_bytes).await?;
    let request: graphql::Request =
        serde_json::from_slice(&bytes).map_err(RelayError::MalformedRequest)?;
    run_single(&state, request).await
}

pub(super) async fn handle_batch(
    State(state): State<RelayState>,
    body: Body,
) -> Result<Response, RelayError> {
    let bytes = read_body(body, state.max_request_bytes).await?;
    let batch = batch_from_bytes(&bytes).map_err(RelayError::MalformedRequest)?;

    if state.batching.exceeds_batch_size(&batch) {
        return Err(RelayError::BatchLimitExceeded {
            size: batch.len(),
            // exceeds_batch_size only returns true when a maximum is set
            maximum: state.batching.maximum_size.unwrap_or_default(),
        });
    }

    let responses = state.batch_executor.execute(batch).await?;
    json_response(&responses)
}

async fn run_single(
    state: &RelayState,
    request: graphql::Request,
) -> Result<Response, RelayError> {
    let response = state.executor.execute(request).await;
    json_response(&response)
}

async fn read_body(body: Body, limit: usize) -> Result<Bytes, RelayError> {
    Limited::new(body, limit)
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .map_err(|err| {
            if err.downcast_ref::<LengthLimitError>().is_some() {
                RelayError::PayloadTooLarge(limit)
            } else {
                RelayError::BodyRead(err)
            }
        })
}

fn json_response<T: Serialize>(value: &T) -> Result<Response, RelayError> {
    let body = tracing::trace_span!("serialize_response")
        .in_scope(|| serde_json::to_vec(value))
        .map_err(RelayError::Serialization)?;
    Ok((
        [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        body,
    )
        .into_response())
}
