//! Batched execution.
//!
//! A batch is a JSON array of requests, each tagged with a caller chosen `id`.
//! Every item is executed on its own task and the responses are collected in
//! completion order, so callers match them back up through the `id`.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::error::BatchingError;
use crate::graphql;
use crate::services::Executor;

/// One item of a batch: a GraphQL request plus the `id` used to correlate its
/// response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Opaque to the relay. Absent ids are treated as `""`.
    #[serde(default)]
    pub id: String,

    #[serde(flatten)]
    pub request: graphql::Request,
}

/// The response to one [`BatchRequest`], carrying the same `id`.
///
/// Serializes as a single flat object: `{"id": ..., "data": ..., "errors": ...}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(default)]
    pub id: String,

    #[serde(flatten)]
    pub response: graphql::Response,
}

/// Decode a batch body. Anything but a JSON array of request objects is an error.
pub fn batch_from_bytes(bytes: &[u8]) -> Result<Vec<BatchRequest>, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Runs batches against a shared [`Executor`].
///
/// With `max_parallel_queries` set, at most that many items of a single batch
/// run at once. The bound applies per batch: two batches served at the same
/// time each get their own allowance.
pub struct BatchExecutor<E: ?Sized> {
    executor: Arc<E>,
    max_parallel_queries: Option<NonZeroUsize>,
}

impl<E: ?Sized> Clone for BatchExecutor<E> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            max_parallel_queries: self.max_parallel_queries,
        }
    }
}

impl<E: ?Sized> fmt::Debug for BatchExecutor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchExecutor")
            .field("max_parallel_queries", &self.max_parallel_queries)
            .finish_non_exhaustive()
    }
}

impl<E> BatchExecutor<E>
where
    E: Executor + ?Sized,
{
    /// `max_parallel_queries` of `0` means unbounded.
    pub fn new(executor: Arc<E>, max_parallel_queries: usize) -> Self {
        Self {
            executor,
            max_parallel_queries: NonZeroUsize::new(max_parallel_queries),
        }
    }

    pub fn max_parallel_queries(&self) -> Option<NonZeroUsize> {
        self.max_parallel_queries
    }

    /// Execute every item of `batch` and return exactly one response per item,
    /// in completion order.
    ///
    /// Fails only if some item never produced a response, for instance because
    /// the executor panicked. No partial result is returned in that case.
    pub async fn execute(
        &self,
        batch: Vec<BatchRequest>,
    ) -> Result<Vec<BatchResponse>, BatchingError> {
        let span = tracing::info_span!("batch", size = batch.len());
        self.fan_out(batch).instrument(span).await
    }

    async fn fan_out(
        &self,
        batch: Vec<BatchRequest>,
    ) -> Result<Vec<BatchResponse>, BatchingError> {
        let expected = batch.len();
        if expected == 0 {
            return Ok(Vec::new());
        }

        let gate = self
            .max_parallel_queries
            .map(|limit| Arc::new(Semaphore::new(limit.get())));
        // Sized to the batch so that finished units never wait on the collector.
        let (tx, mut rx) = mpsc::channel(expected);

        for (index, BatchRequest { id, request }) in batch.into_iter().enumerate() {
            let permit = match &gate {
                // The gate belongs to this batch and is never closed, so acquiring cannot fail.
                Some(gate) => gate.clone().acquire_owned().await.ok(),
                None => None,
            };
            let executor = self.executor.clone();
            let tx = tx.clone();
            let span = tracing::debug_span!("batch_item", index, id = %id);
            tokio::spawn(
                async move {
                    let response = executor.execute(request).await;
                    drop(permit);
                    if tx.send(BatchResponse { id, response }).await.is_err() {
                        tracing::debug!("batch abandoned, dropping response");
                    }
                }
                .instrument(span),
            );
        }
        drop(tx);

        let mut responses = Vec::with_capacity(expected);
        while let Some(response) = rx.recv().await {
            responses.push(response);
        }

        if responses.len() != expected {
            let error = BatchingError::MissingResponses {
                expected,
                received: responses.len(),
            };
            tracing::error!(%error, "batch incomplete");
            return Err(error);
        }
        Ok(responses)
    }
}
