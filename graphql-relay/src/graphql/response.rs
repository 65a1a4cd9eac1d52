use bytes::Bytes;
use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map;

use crate::error::FetchError;
use crate::graphql::Error;
use crate::json_ext::Object;
use crate::json_ext::Value;

/// A GraphQL response, as produced by an [`Executor`](crate::Executor).
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Response {
    /// The response data.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<Value>,

    /// The optional graphql errors encountered.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<Error>,

    /// The optional graphql extensions.
    #[serde(skip_serializing_if = "Object::is_empty", default)]
    pub extensions: Object,
}

#[buildstructor::buildstructor]
impl Response {
    /// Constructor
    #[builder(visibility = "pub")]
    fn new(data: Option<Value>, errors: Vec<Error>, extensions: Map<ByteString, Value>) -> Self {
        Self {
            data,
            errors,
            extensions,
        }
    }

    /// A response carrying nothing but the given errors.
    pub fn from_errors(errors: Vec<Error>) -> Self {
        Self {
            errors,
            ..Default::default()
        }
    }

    /// Create a [`Response`] from the supplied [`Bytes`].
    ///
    /// This will return an error (identifying the faulty service) if the input is not a
    /// GraphQL response. An explicit `"data": null` is kept as `Some(Value::Null)`.
    pub fn from_bytes(service: &str, b: Bytes) -> Result<Response, FetchError> {
        let malformed = |reason: String| FetchError::SubrequestMalformedResponse {
            service: service.to_string(),
            reason,
        };

        let mut object = match Value::from_bytes(b).map_err(|err| malformed(err.to_string()))? {
            Value::Object(object) => object,
            _ => return Err(malformed("expected a JSON object".to_string())),
        };

        let data = object.remove("data");
        let errors = match object.remove("errors") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(errors)) => errors
                .into_iter()
                .map(|error| Error::from_value(error).map_err(&malformed))
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(malformed("`errors` must be an array".to_string())),
        };
        let extensions = match object.remove("extensions") {
            None | Some(Value::Null) => Object::default(),
            Some(Value::Object(extensions)) => extensions,
            Some(_) => return Err(malformed("`extensions` must be an object".to_string())),
        };

        // A response without data must say why.
        if data.is_none() && errors.is_empty() {
            return Err(malformed(
                "graphql response without data must contain at least one error".to_string(),
            ));
        }

        Ok(Response {
            data,
            errors,
            extensions,
        })
    }

    /// True when the executor reported at least one error.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
