//! Logic for loading configuration in to an object model
use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use displaydoc::Display;
use schemars::JsonSchema;
use schemars::r#gen::SchemaSettings;
use schemars::schema::RootSchema;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

#[cfg(test)]
mod tests;

/// Configuration error.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// could not read configuration file {path}: {source}
    Read {
        path: String,
        source: std::io::Error,
    },
    /// could not deserialize configuration: {0}
    Deserialize(#[from] serde_yaml::Error),
    /// {message}: {error}
    InvalidConfiguration {
        message: &'static str,
        error: String,
    },
}

/// The configuration for the relay.
///
/// Can be created through `serde::Deserialize` from YAML, or inline in Rust
/// code with the builders.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Configuration {
    /// Configuration options pertaining to the http server component.
    pub server: Server,

    /// Batch execution.
    pub batching: Batching,

    /// Request limits.
    pub limits: Limits,

    /// Upstream GraphQL server every operation is forwarded to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream: Option<Upstream>,
}

#[buildstructor::buildstructor]
impl Configuration {
    #[builder(visibility = "pub")]
    fn new(
        server: Option<Server>,
        batching: Option<Batching>,
        limits: Option<Limits>,
        upstream: Option<Upstream>,
    ) -> Result<Self, ConfigurationError> {
        let configuration = Self {
            server: server.unwrap_or_default(),
            batching: batching.unwrap_or_default(),
            limits: limits.unwrap_or_default(),
            upstream,
        };
        configuration.validate()
    }

    /// Read and validate the YAML file at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    /// Parse and validate a YAML document. An empty document yields the defaults.
    pub fn from_yaml(raw_yaml: &str) -> Result<Self, ConfigurationError> {
        if raw_yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let configuration: Configuration = raw_yaml.parse()?;
        configuration.validate()
    }

    pub(crate) fn validate(self) -> Result<Self, ConfigurationError> {
        for (name, path) in [
            ("server.path", &self.server.path),
            ("server.batch_path", &self.server.batch_path),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigurationError::InvalidConfiguration {
                    message: "endpoint paths must start with '/'",
                    error: format!("{name} is '{path}'"),
                });
            }
        }
        if self.server.path == self.server.batch_path {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "server.path and server.batch_path must differ",
                error: format!("both are '{}'", self.server.path),
            });
        }
        if self.batching.maximum_size == Some(0) {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "batching.maximum_size must be at least 1",
                error: "got 0".to_string(),
            });
        }
        if self.limits.http_max_request_bytes == 0 {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "limits.http_max_request_bytes must be at least 1",
                error: "got 0".to_string(),
            });
        }
        Ok(self)
    }
}

impl FromStr for Configuration {
    type Err = serde_yaml::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_yaml::from_str(s)
    }
}

/// Configuration options pertaining to the http server component.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Server {
    /// The socket address to listen on, default `127.0.0.1:4000`.
    pub listen: SocketAddr,

    /// Single query endpoint, default `/graphql`.
    pub path: String,

    /// Batch endpoint, default `/graphql/batch`.
    pub batch_path: String,
}

fn default_listen() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 4000)
}

fn default_graphql_path() -> String {
    String::from("/graphql")
}

fn default_batch_path() -> String {
    String::from("/graphql/batch")
}

#[buildstructor::buildstructor]
impl Server {
    #[builder(visibility = "pub")]
    fn new(listen: Option<SocketAddr>, path: Option<String>, batch_path: Option<String>) -> Self {
        Self {
            listen: listen.unwrap_or_else(default_listen),
            path: path.unwrap_or_else(default_graphql_path),
            batch_path: batch_path.unwrap_or_else(default_batch_path),
        }
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Batch execution.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Batching {
    /// How many items of one batch may execute at the same time. `0` means no
    /// limit.
    pub max_parallel_queries: usize,

    /// Largest accepted batch. Bigger batches are refused as a whole.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_size: Option<usize>,
}

impl Batching {
    // Check if we have exceeded our maximum batch size
    pub(crate) fn exceeds_batch_size<T>(&self, batch: &[T]) -> bool {
        match self.maximum_size {
            Some(maximum_size) => batch.len() > maximum_size,
            None => false,
        }
    }
}

/// Request limits.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Limits {
    /// Largest request body accepted on either endpoint, in bytes.
    pub http_max_request_bytes: usize,
}

const DEFAULT_HTTP_MAX_REQUEST_BYTES: usize = 2_000_000;

impl Default for Limits {
    fn default() -> Self {
        Self {
            http_max_request_bytes: DEFAULT_HTTP_MAX_REQUEST_BYTES,
        }
    }
}

/// Upstream GraphQL server.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Upstream {
    /// Where operations are POSTed.
    pub url: Url,

    /// Per request timeout, in human-readable format; defaults to 30s.
    #[serde(with = "humantime_serde", default = "default_upstream_timeout")]
    #[schemars(with = "String", default = "default_upstream_timeout")]
    pub timeout: Duration,
}

fn default_upstream_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Upstream {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            timeout: default_upstream_timeout(),
        }
    }
}

/// Generate a JSON schema for the configuration.
pub fn generate_config_schema() -> RootSchema {
    let settings = SchemaSettings::draft07().with(|s| {
        s.option_nullable = true;
        s.option_add_null_type = false;
        s.inline_subschemas = true;
    });
    settings.into_generator().into_root_schema_for::<Configuration>()
}
