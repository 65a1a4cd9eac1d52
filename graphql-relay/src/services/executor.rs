use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::graphql;

/// Runs a single GraphQL operation.
///
/// The relay knows nothing about schemas: it hands each decoded request to an
/// `Executor` and sends back whatever comes out. Failures are reported inside
/// the returned [`graphql::Response`], never as a Rust error, so one bad item
/// cannot take a batch down with it.
///
/// One instance is shared by every request the relay serves, concurrently.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Executor: Send + Sync + 'static {
    /// Execute `request` and return its result, errors included.
    async fn execute(&self, request: graphql::Request) -> graphql::Response;
}

#[async_trait]
impl<E> Executor for Arc<E>
where
    E: Executor + ?Sized,
{
    async fn execute(&self, request: graphql::Request) -> graphql::Response {
        (**self).execute(request).await
    }
}

/// An [`Executor`] built from a closure, see [`executor_fn`].
#[derive(Clone, Copy, Debug)]
pub struct ExecutorFn<F>(F);

/// Returns an [`Executor`] that calls `f` for every request.
pub fn executor_fn<F, Fut>(f: F) -> ExecutorFn<F>
where
    F: Fn(graphql::Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = graphql::Response> + Send + 'static,
{
    ExecutorFn(f)
}

#[async_trait]
impl<F, Fut> Executor for ExecutorFn<F>
where
    F: Fn(graphql::Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = graphql::Response> + Send + 'static,
{
    async fn execute(&self, request: graphql::Request) -> graphql::Response {
        (self.0)(request).await
    }
}
