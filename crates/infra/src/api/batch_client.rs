//! Batch endpoint client
//!
//! Implements the [`BatchSubmitter`] port against the core service's
//! `api/v1/batch/` endpoint: one JSON POST per commit, answered with one
//! outcome per queued operation. A batch runs side effects on the server,
//! so a delivered POST is never sent again, whatever its status.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use batchwire_core::{BatchSubmitter, Batcher};
use batchwire_domain::constants::BATCH_ENDPOINT;
use batchwire_domain::{
    BatchRequest, BatchResponse, BatchwireError, ClientConfig, CoreConfig, Result,
};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::errors::conversions::status_error;
use crate::errors::InfraError;
use crate::http::HttpClient;

/// Resolve the batch endpoint under `base_url`.
///
/// The base may carry a path prefix; a missing trailing slash is added so
/// the prefix is kept when joining.
pub fn batch_endpoint(base_url: &str) -> Result<Url> {
    let mut base = Url::parse(base_url.trim()).map_err(|err| {
        BatchwireError::Config(format!("invalid core base url '{base_url}': {err}"))
    })?;

    if !matches!(base.scheme(), "http" | "https") || base.cannot_be_a_base() {
        return Err(BatchwireError::Config(format!(
            "core base url must be an http(s) url, got '{base_url}'"
        )));
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    base.join(BATCH_ENDPOINT).map_err(|err| {
        BatchwireError::Config(format!("cannot build batch endpoint from '{base_url}': {err}"))
    })
}

/// Credentials sent as HTTP basic auth
#[derive(Clone)]
struct BasicAuth {
    username: String,
    password: Option<String>,
}

/// HTTP adapter for the core service batch endpoint
#[derive(Clone)]
pub struct CoreBatchClient {
    http: HttpClient,
    endpoint: Url,
    auth: Option<BasicAuth>,
}

impl fmt::Debug for CoreBatchClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreBatchClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("username", &self.auth.as_ref().map(|auth| auth.username.as_str()))
            .finish()
    }
}

impl CoreBatchClient {
    pub fn new(http: HttpClient, core: &CoreConfig) -> Result<Self> {
        let endpoint = batch_endpoint(&core.base_url)?;
        let auth = core
            .username
            .clone()
            .map(|username| BasicAuth { username, password: core.password.clone() });

        Ok(Self { http, endpoint, auth })
    }

    /// Build the client and its HTTP transport from configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let http = HttpClient::from_config(&config.http)?;
        Self::new(http, &config.core)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl BatchSubmitter for CoreBatchClient {
    #[instrument(skip(self, request), fields(count = request.data.len()))]
    async fn submit(&self, request: &BatchRequest) -> Result<BatchResponse> {
        let body = serde_json::to_vec(request).map_err(|err| BatchwireError::from(InfraError::from(err)))?;

        let mut builder = self
            .http
            .request(Method::POST, self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body);
        if let Some(auth) = &self.auth {
            builder = builder.basic_auth(&auth.username, auth.password.as_deref());
        }

        let response = self.http.send(builder).await?;
        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            debug!("batch endpoint returned no content");
            return Ok(BatchResponse::default());
        }

        let text =
            response.text().await.map_err(|err| BatchwireError::from(InfraError::from(err)))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "batch endpoint rejected request");
            let reason = status.canonical_reason().unwrap_or("");
            let detail = if text.is_empty() { reason.to_string() } else { format!("{reason}: {text}") };
            return Err(status_error(status.as_u16(), &detail));
        }

        let parsed: BatchResponse =
            serde_json::from_str(&text).map_err(|err| BatchwireError::from(InfraError::from(err)))?;
        debug!(outcomes = parsed.data.len(), "batch endpoint responded");
        Ok(parsed)
    }
}

/// Create a [`Batcher`] that commits to the configured core service.
pub fn batcher_from_config(config: &ClientConfig) -> Result<Batcher> {
    let client = CoreBatchClient::from_config(config)?;
    Ok(Batcher::new(Arc::new(client), config.batch.clone()))
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};
    use std::time::Duration;

    use batchwire_domain::OperationRecord;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer, username: Option<&str>) -> CoreBatchClient {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(5))
            .base_backoff(Duration::from_millis(5))
            .max_attempts(2)
            .build()
            .expect("http client");
        let core = CoreConfig {
            base_url: server.uri(),
            username: username.map(str::to_string),
            password: username.map(|_| "secret".to_string()),
        };
        CoreBatchClient::new(http, &core).expect("batch client")
    }

    fn request_with(kind: &str) -> BatchRequest {
        BatchRequest {
            data: vec![OperationRecord {
                kind: kind.to_string(),
                body: None,
                variables: BTreeMap::new(),
                alias: "BatchAlias0".to_string(),
                dependencies: BTreeSet::new(),
                stage: 0,
                placeholders: BTreeMap::new(),
            }],
        }
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        assert_eq!(
            batch_endpoint("http://localhost:8080").unwrap().as_str(),
            "http://localhost:8080/api/v1/batch/"
        );
        assert_eq!(
            batch_endpoint("https://core.example.com/prefix").unwrap().as_str(),
            "https://core.example.com/prefix/api/v1/batch/"
        );
        assert!(matches!(batch_endpoint("localhost:8080"), Err(BatchwireError::Config(_))));
        assert!(matches!(batch_endpoint("not a url"), Err(BatchwireError::Config(_))));
    }

    #[tokio::test]
    async fn posts_request_with_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/batch/"))
            .and(header("authorization", "Basic YWxpY2U6c2VjcmV0"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"data": [{
                "type": "createThing",
                "data": null,
                "vars": {},
                "alias": "BatchAlias0",
                "dependencies": [],
                "stage": 0,
                "placeholders": {}
            }]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"alias": "BatchAlias0", "data": "123", "code": 200}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("alice"));
        let response = client.submit(&request_with("createThing")).await.unwrap();

        assert_eq!(response.data.len(), 1);
        assert_eq!(response.data[0].data, "123");
        assert_eq!(response.data[0].code, 200);
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server, Some("alice")).submit(&request_with("x")).await.unwrap_err();
        match err {
            BatchwireError::Auth(msg) => assert!(msg.contains("401") && msg.contains("bad credentials")),
            other => panic!("expected auth error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn server_error_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server, None).submit(&request_with("x")).await.unwrap_err();
        match err {
            BatchwireError::Network(msg) => assert!(msg.contains("500") && msg.contains("overloaded")),
            other => panic!("expected network error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn bad_gateway_does_not_resend_the_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"alias": "BatchAlias0", "data": "1", "code": 200}]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server, None).submit(&request_with("x")).await.unwrap_err();

        assert!(matches!(err, BatchwireError::Network(ref msg) if msg.contains("502")));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn no_content_is_an_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let response = client_for(&server, None).submit(&request_with("x")).await.unwrap();
        assert!(response.data.is_empty());
    }

    #[tokio::test]
    async fn malformed_body_is_serialization_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client_for(&server, None).submit(&request_with("x")).await.unwrap_err();
        assert!(matches!(err, BatchwireError::Serialization(_)));
    }

    #[tokio::test]
    async fn anonymous_client_sends_no_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        client_for(&server, None).submit(&request_with("x")).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].headers.contains_key("authorization"));
    }
}
