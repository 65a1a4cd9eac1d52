//! Forwards operations to a GraphQL-over-HTTP server.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::ACCEPT;
use url::Url;

use crate::configuration::Upstream;
use crate::error::FetchError;
use crate::graphql;
use crate::services::Executor;

/// An [`Executor`] that POSTs every request as JSON to an upstream server.
///
/// Whatever goes wrong on the way is reported as a GraphQL error in the
/// returned response.
#[derive(Clone, Debug)]
pub struct UpstreamExecutor {
    client: reqwest::Client,
    url: Url,
}

impl UpstreamExecutor {
    pub fn new(upstream: &Upstream) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(upstream.timeout)
            .build()?;
        Ok(Self {
            client,
            url: upstream.url.clone(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn fetch(
        &self,
        request: &graphql::Request,
    ) -> Result<graphql::Response, FetchError> {
        let service = self.url.to_string();
        let http_error = |status_code: Option<u16>, reason: String| {
            FetchError::SubrequestHttpError {
                status_code,
                service: service.clone(),
                reason,
            }
        };

        let response = self
            .client
            .post(self.url.clone())
            .header(ACCEPT, mime::APPLICATION_JSON.essence_str())
            .json(request)
            .send()
            .await
            .map_err(|err| http_error(err.status().map(|s| s.as_u16()), err.to_string()))?;

        let status = response.status();
        let body: Bytes = response
            .bytes()
            .await
            .map_err(|err| http_error(Some(status.as_u16()), err.to_string()))?;

        // GraphQL servers commonly answer validation failures with a 4xx and a
        // proper GraphQL body, so the body is tried first.
        match graphql::Response::from_bytes(&service, body) {
            Ok(response) => Ok(response),
            Err(_) if !status.is_success() => {
                Err(http_error(Some(status.as_u16()), status.to_string()))
            }
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl Executor for UpstreamExecutor {
    async fn execute(&self, request: graphql::Request) -> graphql::Response {
        match self.fetch(&request).await {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(%error, "upstream fetch failed");
                error.to_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json_bytes::json;
    use wiremock::Mock;
    use wiremock::MockServer;
    use wiremock::ResponseTemplate;
    use wiremock::matchers::body_json;
    use wiremock::matchers::header;
    use wiremock::matchers::method;
    use wiremock::matchers::path;

    use super::*;

    async fn executor_for(server: &MockServer, timeout: Duration) -> UpstreamExecutor {
        let url = Url::parse(&format!("{}/graphql", server.uri())).unwrap();
        UpstreamExecutor::new(&Upstream { url, timeout }).unwrap()
    }

    fn hero_request() -> graphql::Request {
        graphql::Request::builder()
            .query("query Hero($episode: Episode) { hero(episode: $episode) { name } }")
            .operation_name("Hero")
            .variable("episode", "JEDI")
            .build()
    }

    #[test_log::test(tokio::test)]
    async fn it_forwards_the_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({
                "query": "query Hero($episode: Episode) { hero(episode: $episode) { name } }",
                "operationName": "Hero",
                "variables": { "episode": "JEDI" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "hero": { "name": "R2-D2" } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = executor_for(&server, Duration::from_secs(5))
            .await
            .execute(hero_request())
            .await;

        assert_eq!(response.data, Some(json!({ "hero": { "name": "R2-D2" } })));
        assert!(response.errors.is_empty());
    }

    #[tokio::test]
    async fn it_passes_graphql_errors_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "errors": [{ "message": "Cannot query field \"villain\" on type \"Query\"." }]
            })))
            .mount(&server)
            .await;

        let response = executor_for(&server, Duration::from_secs(5))
            .await
            .execute(graphql::Request::builder().query("{ villain }").build())
            .await;

        assert_eq!(
            response.errors[0].message,
            "Cannot query field \"villain\" on type \"Query\"."
        );
        assert_eq!(response.errors[0].extension_code(), None);
    }

    #[tokio::test]
    async fn it_reports_http_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("try again later"))
            .mount(&server)
            .await;

        let response = executor_for(&server, Duration::from_secs(5))
            .await
            .execute(hero_request())
            .await;

        assert!(response.data.is_none());
        assert_eq!(
            response.errors[0].extension_code(),
            Some("SUBREQUEST_HTTP_ERROR")
        );
        assert_eq!(
            response.errors[0].extensions.get("http"),
            Some(&json!({ "status": 503 }))
        );
        assert!(
            response.errors[0].message.ends_with(": 503 Service Unavailable"),
            "{}",
            response.errors[0].message
        );
    }

    #[tokio::test]
    async fn it_reports_malformed_bodies() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let response = executor_for(&server, Duration::from_secs(5))
            .await
            .execute(hero_request())
            .await;

        assert_eq!(
            response.errors[0].extension_code(),
            Some("SUBREQUEST_MALFORMED_RESPONSE")
        );
    }

    #[tokio::test]
    async fn it_keeps_null_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": null,
                "errors": [{ "message": "boom", "path": ["hero"] }]
            })))
            .mount(&server)
            .await;

        let response = executor_for(&server, Duration::from_secs(5))
            .await
            .execute(hero_request())
            .await;

        assert_eq!(response.data, Some(json!(null)));
        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"data":null,"errors":[{"message":"boom","path":["hero"]}]}"#
        );
    }

    #[tokio::test]
    async fn it_rejects_replies_that_are_not_graphql_responses() {
        for reply in [
            serde_json::json!({}),
            serde_json::json!({ "errors": [{ "path": ["hero"] }] }),
            serde_json::json!({ "data": null, "errors": [{ "locations": [] }] }),
        ] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200).set_body_json(reply.clone()))
                .mount(&server)
                .await;

            let response = executor_for(&server, Duration::from_secs(5))
                .await
                .execute(hero_request())
                .await;

            assert!(response.data.is_none(), "{reply}");
            assert_eq!(response.errors.len(), 1, "{reply}");
            assert_eq!(
                response.errors[0].extension_code(),
                Some("SUBREQUEST_MALFORMED_RESPONSE"),
                "{reply}"
            );
        }
    }

    #[tokio::test]
    async fn it_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "data": {} }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let response = executor_for(&server, Duration::from_millis(100))
            .await
            .execute(hero_request())
            .await;

        assert_eq!(
            response.errors[0].extension_code(),
            Some("SUBREQUEST_HTTP_ERROR")
        );
        assert!(response.errors[0].extensions.get("http").is_none());
    }

    #[tokio::test]
    async fn it_reports_an_unreachable_upstream() {
        let url = Url::parse("http://127.0.0.1:1/graphql").unwrap();
        let response = UpstreamExecutor::new(&Upstream::new(url))
            .unwrap()
            .execute(hero_request())
            .await;

        assert_eq!(
            response.errors[0].extension_code(),
            Some("SUBREQUEST_HTTP_ERROR")
        );
        assert_eq!(
            response.errors[0].extensions.get("service"),
            Some(&json!("http://127.0.0.1:1/graphql"))
        );
    }
}
