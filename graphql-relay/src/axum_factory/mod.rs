//! axum factory is useful to create an [`Router`] exposing the relay endpoints.

mod handlers;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::Span;

use self::handlers::RelayState;
use self::handlers::handle_batch;
use self::handlers::handle_get;
use self::handlers::handle_post;
use crate::batching::BatchExecutor;
use crate::configuration::Configuration;
use crate::services::Executor;

/// Build the relay's [`Router`]: the single query endpoint answers GET and POST
/// on `server.path`, the batch endpoint answers POST on `server.batch_path`.
pub fn make_router(executor: Arc<dyn Executor>, configuration: &Configuration) -> Router {
    let state = RelayState {
        batch_executor: BatchExecutor::new(
            executor.clone(),
            configuration.batching.max_parallel_queries,
        ),
        executor,
        batching: configuration.batching.clone(),
        max_request_bytes: configuration.limits.http_max_request_bytes,
    };

    Router::new()
        .route(
            &configuration.server.path,
            get(handle_get).post(handle_post),
        )
        .route(&configuration.server.batch_path, post(handle_batch))
        .layer(
            TraceLayer::new_for_http().on_response(
                |response: &Response, latency: Duration, _span: &Span| {
                    if response.status().is_server_error() {
                        tracing::error!(status = %response.status(), ?latency, "request failed");
                    } else {
                        tracing::debug!(status = %response.status(), ?latency, "finished processing request");
                    }
                },
            ),
        )
        .with_state(state)
}

/// A handle with which a client can shut down the server gracefully.
#[derive(Debug)]
pub struct HttpServerHandle {
    /// Sender to use to notify of shutdown
    shutdown_sender: oneshot::Sender<()>,

    /// The server task, resolving once every connection is closed.
    server: JoinHandle<io::Result<()>>,

    /// The address the server is actually listening on.
    /// If the configured address used port zero the OS picked a free one.
    listen_address: SocketAddr,
}

impl HttpServerHandle {
    pub fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Stop accepting connections and wait for in flight requests to finish.
    pub async fn shutdown(self) -> io::Result<()> {
        if self.shutdown_sender.send(()).is_err() {
            tracing::error!("Failed to notify http thread of shutdown")
        };
        self.server.await.map_err(io::Error::other)?
    }
}

/// Bind `listen` and serve `router` on it until [`HttpServerHandle::shutdown`].
pub async fn serve(router: Router, listen: SocketAddr) -> io::Result<HttpServerHandle> {
    let listener = TcpListener::bind(listen).await?;
    let listen_address = listener.local_addr()?;
    let (shutdown_sender, shutdown_receiver) = oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_receiver.await;
            })
            .await
    });
    tracing::info!("GraphQL relay serving on http://{listen_address}");

    Ok(HttpServerHandle {
        shutdown_sender,
        server,
        listen_address,
    })
}
