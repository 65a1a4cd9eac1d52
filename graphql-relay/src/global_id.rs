//! Opaque global object identifiers.
//!
//! An [`Id`] packs the kind of an entity together with whatever data is needed
//! to fetch it again. The payload is `kind`, a `:` separator, then the spec as
//! canonical JSON, the whole thing encoded with URL safe base64. Nothing but
//! [`unmarshal_kind`] and [`unmarshal_spec`] should look inside.

use std::fmt;

use base64::Engine as _;
use base64::prelude::BASE64_URL_SAFE;
use displaydoc::Display;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

const SEPARATOR: u8 = b':';

/// A global object identifier.
///
/// Serializes as a plain string so it can be used directly as a GraphQL `ID`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(String);

impl Id {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Global ID errors.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum IdError {
    /// kind '{0}' must not contain ':'
    InvalidKind(String),
    /// could not serialize the id spec: {0}
    Serialize(#[source] serde_json::Error),
    /// id is not valid base64: {0}
    Decode(#[from] base64::DecodeError),
    /// invalid id: missing kind separator
    MissingSeparator,
    /// could not deserialize the id spec: {0}
    Deserialize(#[source] serde_json::Error),
}

/// Encode `kind` and `spec` into an opaque [`Id`].
///
/// `spec` is serialized to JSON with object keys sorted, so equal values always
/// produce the same id, whatever the iteration order of the maps they contain.
pub fn marshal_id<T>(kind: &str, spec: &T) -> Result<Id, IdError>
where
    T: Serialize + ?Sized,
{
    if kind.as_bytes().contains(&SEPARATOR) {
        return Err(IdError::InvalidKind(kind.to_string()));
    }
    let value = serde_json::to_value(spec).map_err(IdError::Serialize)?;
    let spec = serde_json::to_vec(&canonicalize(value)).map_err(IdError::Serialize)?;

    let mut payload = Vec::with_capacity(kind.len() + 1 + spec.len());
    payload.extend_from_slice(kind.as_bytes());
    payload.push(SEPARATOR);
    payload.extend_from_slice(&spec);

    Ok(Id(BASE64_URL_SAFE.encode(payload)))
}

/// The kind encoded in `id`, or `None` if `id` was not produced by [`marshal_id`].
pub fn unmarshal_kind(id: &Id) -> Option<String> {
    let payload = BASE64_URL_SAFE.decode(id.as_str()).ok()?;
    let (kind, _) = split(&payload)?;
    String::from_utf8(kind.to_vec()).ok()
}

/// Decode the spec encoded in `id` into `T`.
pub fn unmarshal_spec<T>(id: &Id) -> Result<T, IdError>
where
    T: DeserializeOwned,
{
    let payload = BASE64_URL_SAFE.decode(id.as_str())?;
    let (_, spec) = split(&payload).ok_or(IdError::MissingSeparator)?;
    serde_json::from_slice(spec).map_err(IdError::Deserialize)
}

fn split(payload: &[u8]) -> Option<(&[u8], &[u8])> {
    let index = payload.iter().position(|b| *b == SEPARATOR)?;
    Some((&payload[..index], &payload[index + 1..]))
}

fn canonicalize(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<_> = map
                .into_iter()
                .map(|(key, value)| (key, canonicalize(value)))
                .collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            serde_json::Value::Object(entries.into_iter().collect())
        }
        serde_json::Value::Array(values) => {
            serde_json::Value::Array(values.into_iter().map(canonicalize).collect())
        }
        other => other,
    }
}
