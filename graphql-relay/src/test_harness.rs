//! In-memory executors for tests and benchmarks.

use async_trait::async_trait;
use serde_json_bytes::json;

use crate::graphql;
use crate::services::Executor;

/// A tiny stand-in for a Star Wars schema.
///
/// It understands exactly one operation, `{ hero { name } }` (optionally
/// prefixed with `query`), and answers it with R2-D2. Any other document gets
/// the error a real server would give for an unknown root field.
#[derive(Clone, Copy, Debug, Default)]
pub struct StarWars;

#[async_trait]
impl Executor for StarWars {
    async fn execute(&self, request: graphql::Request) -> graphql::Response {
        let Some(query) = request.query.as_deref() else {
            return graphql::Response::from_errors(vec![
                graphql::Error::builder()
                    .message("Must provide query string.")
                    .extension_code("GRAPHQL_VALIDATION_FAILED")
                    .build(),
            ]);
        };

        let document = query.split_whitespace().collect::<Vec<_>>().join(" ");
        let document = document.strip_prefix("query ").unwrap_or(&document);
        if document == "{ hero { name } }" {
            return graphql::Response::builder()
                .data(json!({ "hero": { "name": "R2-D2" } }))
                .build();
        }

        graphql::Response::from_errors(vec![
            graphql::Error::builder()
                .message(format!(
                    r#"Cannot query field "{}" on type "Query"."#,
                    root_field(document)
                ))
                .extension_code("GRAPHQL_VALIDATION_FAILED")
                .build(),
        ])
    }
}

fn root_field(document: &str) -> &str {
    let after_brace = document
        .split_once('{')
        .map(|(_, rest)| rest)
        .unwrap_or(document)
        .trim_start();
    let end = after_brace
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(after_brace.len());
    &after_brace[..end]
}
