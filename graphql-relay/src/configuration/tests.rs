use std::io::Write;

use insta::assert_json_snapshot;

use super::*;

#[test]
fn empty_config_uses_the_defaults() {
    let configuration = Configuration::from_yaml("").unwrap();
    assert_eq!(configuration, Configuration::default());
    assert_eq!(configuration.server.listen, "127.0.0.1:4000".parse::<SocketAddr>().unwrap());
    assert_eq!(configuration.server.path, "/graphql");
    assert_eq!(configuration.server.batch_path, "/graphql/batch");
    assert_eq!(configuration.batching.max_parallel_queries, 0);
    assert_eq!(configuration.batching.maximum_size, None);
    assert_eq!(configuration.limits.http_max_request_bytes, 2_000_000);
    assert!(configuration.upstream.is_none());
}

#[test]
fn default_config_serializes() {
    assert_json_snapshot!(Configuration::default(), @r###"
    {
      "server": {
        "listen": "127.0.0.1:4000",
        "path": "/graphql",
        "batch_path": "/graphql/batch"
      },
      "batching": {
        "max_parallel_queries": 0
      },
      "limits": {
        "http_max_request_bytes": 2000000
      }
    }
    "###);
}

#[test]
fn it_reads_every_section() {
    let configuration = Configuration::from_yaml(
        r#"
server:
  listen: 0.0.0.0:8080
  path: /query
  batch_path: /batch
batching:
  max_parallel_queries: 4
  maximum_size: 50
limits:
  http_max_request_bytes: 1024
upstream:
  url: http://localhost:4001/graphql
  timeout: 1m 30s
"#,
    )
    .unwrap();

    assert_eq!(configuration.server.listen, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
    assert_eq!(configuration.server.path, "/query");
    assert_eq!(configuration.server.batch_path, "/batch");
    assert_eq!(configuration.batching.max_parallel_queries, 4);
    assert_eq!(configuration.batching.maximum_size, Some(50));
    assert_eq!(configuration.limits.http_max_request_bytes, 1024);
    let upstream = configuration.upstream.unwrap();
    assert_eq!(upstream.url.as_str(), "http://localhost:4001/graphql");
    assert_eq!(upstream.timeout, Duration::from_secs(90));
}

#[test]
fn upstream_timeout_defaults_to_thirty_seconds() {
    let configuration = Configuration::from_yaml(
        r#"
upstream:
  url: http://localhost:4001/graphql
"#,
    )
    .unwrap();
    assert_eq!(
        configuration.upstream.unwrap().timeout,
        Duration::from_secs(30)
    );
}

#[test]
fn it_rejects_unknown_fields() {
    let error = Configuration::from_yaml(
        r#"
batching:
  max_parallel: 4
"#,
    )
    .unwrap_err();
    assert!(matches!(error, ConfigurationError::Deserialize(_)));
    assert!(error.to_string().contains("max_parallel"), "{error}");
}

#[test]
fn it_rejects_relative_paths() {
    let error = Configuration::from_yaml(
        r#"
server:
  path: graphql
"#,
    )
    .unwrap_err();
    assert_eq!(
        error.to_string(),
        "endpoint paths must start with '/': server.path is 'graphql'"
    );
}

#[test]
fn it_rejects_clashing_paths() {
    let error = Configuration::builder()
        .server(Server::builder().path("/gql").batch_path("/gql").build())
        .build()
        .unwrap_err();
    assert!(matches!(
        error,
        ConfigurationError::InvalidConfiguration { .. }
    ));
}

#[test]
fn it_rejects_zero_limits() {
    assert!(
        Configuration::from_yaml("batching:\n  maximum_size: 0\n").is_err()
    );
    assert!(
        Configuration::from_yaml("limits:\n  http_max_request_bytes: 0\n").is_err()
    );
    // zero parallelism means unbounded and is fine
    assert!(
        Configuration::from_yaml("batching:\n  max_parallel_queries: 0\n").is_ok()
    );
}

#[test]
fn it_loads_a_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "batching:\n  max_parallel_queries: 2").unwrap();

    let configuration = Configuration::from_file(file.path()).unwrap();
    assert_eq!(configuration.batching.max_parallel_queries, 2);
}

#[test]
fn it_reports_a_missing_file() {
    let error = Configuration::from_file("/definitely/not/here.yaml").unwrap_err();
    assert!(matches!(error, ConfigurationError::Read { .. }));
    assert!(error.to_string().contains("/definitely/not/here.yaml"));
}

#[test]
fn batch_size_check() {
    let batching = Batching {
        maximum_size: Some(2),
        ..Default::default()
    };
    assert!(!batching.exceeds_batch_size(&[1, 2]));
    assert!(batching.exceeds_batch_size(&[1, 2, 3]));
    assert!(!Batching::default().exceeds_batch_size(&[0; 1000]));
}

#[test]
fn schema_lists_the_sections() {
    let schema = serde_json::to_value(generate_config_schema()).unwrap();
    let properties = schema["properties"].as_object().unwrap();
    for section in ["server", "batching", "limits", "upstream"] {
        assert!(properties.contains_key(section), "{section}");
    }
    assert_eq!(schema["additionalProperties"], serde_json::json!(false));
}
