//! Relay errors.
use axum::response::IntoResponse;
use axum::response::Response;
use displaydoc::Display;
use http::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tower::BoxError;

pub use crate::configuration::ConfigurationError;
use crate::graphql;
use crate::json_ext::Object;

/// Errors raised while forwarding a request to the upstream server.
///
/// Note that these are not returned to the client as such, but are instead
/// converted to a GraphQL [`graphql::Error`] inside the item's response.
#[derive(Error, Display, Debug, Clone, Serialize, Eq, PartialEq)]
#[serde(untagged)]
#[ignore_extra_doc_attributes]
#[non_exhaustive]
pub enum FetchError {
    /// request was malformed: {reason}
    MalformedRequest {
        /// The reason the serialization failed.
        reason: String,
    },

    /// service '{service}' response was malformed: {reason}
    SubrequestMalformedResponse {
        /// The service that responded with the malformed response.
        service: String,

        /// The reason the serialization failed.
        reason: String,
    },

    /// HTTP fetch failed from '{service}': {reason}
    ///
    /// note that this relates to a transport error and not a GraphQL error
    SubrequestHttpError {
        status_code: Option<u16>,

        /// The service failed.
        service: String,

        /// The reason the fetch failed.
        reason: String,
    },
}

impl FetchError {
    /// Convert the fetch error to a GraphQL error.
    pub fn to_graphql_error(&self) -> graphql::Error {
        let mut extensions = Object::new();
        match self {
            FetchError::SubrequestHttpError {
                service,
                status_code,
                ..
            } => {
                extensions.insert("service", service.clone().into());
                if let Some(status_code) = status_code {
                    extensions.insert(
                        "http",
                        serde_json_bytes::json!({ "status": status_code }),
                    );
                }
            }
            FetchError::SubrequestMalformedResponse { service, .. } => {
                extensions.insert("service", service.clone().into());
            }
            FetchError::MalformedRequest { .. } => {}
        }
        graphql::Error::builder()
            .message(self.to_string())
            .extension_code(self.extension_code())
            .extensions(extensions)
            .build()
    }

    /// Convert the error to an appropriate response.
    pub fn to_response(&self) -> graphql::Response {
        graphql::Response::from_errors(vec![self.to_graphql_error()])
    }

    fn extension_code(&self) -> &'static str {
        match self {
            FetchError::MalformedRequest { .. } => "MALFORMED_REQUEST",
            FetchError::SubrequestMalformedResponse { .. } => "SUBREQUEST_MALFORMED_RESPONSE",
            FetchError::SubrequestHttpError { .. } => "SUBREQUEST_HTTP_ERROR",
        }
    }
}

/// Errors that stop a whole batch.
#[derive(Error, Display, Debug)]
#[non_exhaustive]
pub enum BatchingError {
    /// batch ended with {received} responses out of {expected}
    MissingResponses {
        /// The number of items in the batch.
        expected: usize,
        /// The number of responses collected before every execution unit was gone.
        received: usize,
    },
}

/// Errors returned by the HTTP endpoints, before or after execution.
///
/// Each one ends the HTTP call with a plain text body; nothing reaches the
/// client from a batch that failed this way.
#[derive(Error, Display, Debug)]
#[non_exhaustive]
pub enum RelayError {
    /// failed to read the request body: {0}
    BodyRead(BoxError),

    /// request body is larger than the limit of {0} bytes
    PayloadTooLarge(usize),

    /// {0}
    MalformedRequest(#[source] serde_json::Error),

    /// There was no GraphQL operation to execute. Use the `query` parameter to send an operation, using either GET or POST.
    MissingQuery,

    /// batch of {size} entries exceeds the configured maximum batch size of {maximum}
    BatchLimitExceeded {
        /// The number of items received.
        size: usize,
        /// The configured maximum.
        maximum: usize,
    },

    /// {0}
    Batching(#[from] BatchingError),

    /// failed to serialize the response: {0}
    Serialization(#[source] serde_json::Error),
}

impl RelayError {
    pub(crate) fn status_code(&self) -> StatusCode {
        match self {
            RelayError::BodyRead(_)
            | RelayError::MalformedRequest(_)
            | RelayError::MissingQuery => StatusCode::BAD_REQUEST,
            RelayError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::BatchLimitExceeded { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            RelayError::Batching(_) | RelayError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        (status, self.to_string()).into_response()
    }
}
