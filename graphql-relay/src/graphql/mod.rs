//! Types related to GraphQL requests, responses, etc.

mod request;
mod response;

pub use request::Request;
pub use response::Response;
use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map as JsonMap;
use serde_json_bytes::Value;

use crate::json_ext::Object;
use crate::json_ext::Path;

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
/// The error location
pub struct Location {
    /// The line number
    pub line: u32,
    /// The column number
    pub column: u32,
}

/// A [GraphQL error](https://spec.graphql.org/October2021/#sec-Errors)
/// as may be found in the `errors` field of a GraphQL [`Response`].
///
/// Converted to (or from) JSON with serde.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Error {
    /// The error message.
    pub message: String,

    /// The locations of the error in the GraphQL document of the originating request.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub locations: Vec<Location>,

    /// If this is a field error, the JSON path to that field in [`Response::data`]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub path: Option<Path>,

    /// The optional GraphQL extensions for this error.
    #[serde(skip_serializing_if = "Object::is_empty", default)]
    pub extensions: Object,
}

#[buildstructor::buildstructor]
impl Error {
    /// Returns a builder that builds a GraphQL [`Error`] from its components.
    ///
    /// Builder methods:
    ///
    /// * `.message(impl Into<`[`String`]`>)`
    ///   Required.
    ///   Sets [`Error::message`].
    ///
    /// * `.location(impl Into<`[`Location`]`>)`
    ///   Optional, may be called multiple times.
    ///   Adds one item at the end of [`Error::locations`].
    ///
    /// * `.path(impl Into<`[`Path`]`>)`
    ///   Optional.
    ///   Sets [`Error::path`].
    ///
    /// * `.extension(impl Into<`[`ByteString`]`>, impl Into<`[`Value`]`>)`
    ///   Optional, may be called multiple times.
    ///   Adds one item to the [`Error::extensions`] map.
    ///
    /// * `.extension_code(impl Into<`[`String`]`>)`
    ///   Optional.
    ///   Sets the "code" in the extension map. Will be ignored if extension already has this key
    ///   set.
    ///
    /// * `.build()`
    ///   Finishes the builder and returns a GraphQL [`Error`].
    #[builder(visibility = "pub")]
    fn new(
        message: String,
        locations: Vec<Location>,
        path: Option<Path>,
        extension_code: Option<String>,
        // Skip the `Object` type alias in order to use buildstructor's map special-casing
        mut extensions: JsonMap<ByteString, Value>,
    ) -> Self {
        if let Some(code) = extension_code {
            extensions
                .entry("code")
                .or_insert(Value::String(ByteString::from(code)));
        }
        Self {
            message,
            locations,
            path,
            extensions,
        }
    }

    /// Reads one entry of a response's `errors`, which must at least carry a `message`.
    pub(crate) fn from_value(value: Value) -> Result<Error, String> {
        let mut object = match value {
            Value::Object(object) => object,
            _ => return Err("invalid error within `errors`: expected an object".to_string()),
        };

        let message = match object.remove("message") {
            Some(Value::String(message)) => message.as_str().to_string(),
            Some(_) => return Err("invalid `message` within error: expected a string".to_string()),
            None => return Err("missing required `message` property within error".to_string()),
        };
        let locations = object
            .remove("locations")
            .map(serde_json_bytes::from_value)
            .transpose()
            .map_err(|err| format!("invalid `locations` within error: {err}"))?
            .unwrap_or_default();
        let path = object
            .remove("path")
            .map(serde_json_bytes::from_value)
            .transpose()
            .map_err(|err| format!("invalid `path` within error: {err}"))?;
        let extensions = match object.remove("extensions") {
            None | Some(Value::Null) => Object::default(),
            Some(Value::Object(extensions)) => extensions,
            Some(_) => return Err("invalid `extensions` within error: expected an object".to_string()),
        };

        Ok(Self::new(message, locations, path, None, extensions))
    }

    /// The `code` extension, if any.
    pub fn extension_code(&self) -> Option<&str> {
        self.extensions.get("code").and_then(|code| code.as_str())
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;

    #[test]
    fn error_builder_sets_the_extension_code() {
        let error = Error::builder()
            .message("Cannot query field \"droid\" on type \"Query\".")
            .location(Location { line: 1, column: 3 })
            .extension_code("GRAPHQL_VALIDATION_FAILED")
            .build();

        assert_eq!(error.extension_code(), Some("GRAPHQL_VALIDATION_FAILED"));
        assert_eq!(
            serde_json_bytes::to_value(&error).unwrap(),
            json!({
                "message": "Cannot query field \"droid\" on type \"Query\".",
                "locations": [{ "line": 1, "column": 3 }],
                "extensions": { "code": "GRAPHQL_VALIDATION_FAILED" }
            })
        );
    }

    #[test]
    fn error_builder_keeps_an_explicit_code_extension() {
        let error = Error::builder()
            .message("boom")
            .extension("code", "ALREADY_SET")
            .extension_code("IGNORED")
            .build();

        assert_eq!(error.extension_code(), Some("ALREADY_SET"));
    }

    #[test]
    fn error_from_value_reads_every_field() {
        let error = Error::from_value(json!({
            "message": "Luke is not a droid",
            "locations": [{ "line": 2, "column": 5 }],
            "path": ["hero", "friends", 0],
            "extensions": { "code": "NOT_A_DROID" }
        }))
        .unwrap();

        assert_eq!(
            error,
            Error::builder()
                .message("Luke is not a droid")
                .location(Location { line: 2, column: 5 })
                .path(Path::from("hero/friends/0"))
                .extension_code("NOT_A_DROID")
                .build()
        );
    }

    #[test]
    fn error_from_value_requires_a_message() {
        assert_eq!(
            Error::from_value(json!({ "path": ["hero"] })).unwrap_err(),
            "missing required `message` property within error"
        );
        assert!(Error::from_value(json!({ "message": 42 })).is_err());
        assert!(Error::from_value(json!("boom")).is_err());
    }

    #[test]
    fn error_deserialization_requires_a_message() {
        assert!(serde_json::from_str::<Error>(r#"{"path":["hero"]}"#).is_err());
        let error: Error = serde_json::from_str(r#"{"message":"boom"}"#).unwrap();
        assert_eq!(error, Error::builder().message("boom").build());
    }
}
