//! Conversions from external infrastructure errors into domain errors.

use batchwire_domain::BatchwireError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub BatchwireError);

impl From<InfraError> for BatchwireError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<BatchwireError> for InfraError {
    fn from(value: BatchwireError) -> Self {
        InfraError(value)
    }
}

trait IntoBatchwireError {
    fn into_batchwire(self) -> BatchwireError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → BatchwireError */
/* -------------------------------------------------------------------------- */

impl IntoBatchwireError for HttpError {
    fn into_batchwire(self) -> BatchwireError {
        if self.is_timeout() {
            return BatchwireError::Network("batch request timed out".into());
        }

        if self.is_connect() {
            return BatchwireError::Network(format!("connection to core service failed: {self}"));
        }

        if self.is_decode() {
            return BatchwireError::Serialization(format!("malformed batch response: {self}"));
        }

        if self.is_builder() {
            return BatchwireError::InvalidInput(format!("invalid batch request: {self}"));
        }

        if let Some(status) = self.status() {
            return status_error(status.as_u16(), status.canonical_reason().unwrap_or(""));
        }

        BatchwireError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_batchwire())
    }
}

/// Map a non-success batch endpoint status to a domain error. `detail`
/// carries the reason phrase and, when present, the response body.
pub(crate) fn status_error(code: u16, detail: &str) -> BatchwireError {
    let message = format!("HTTP {code} {detail}").trim_end().to_string();
    match code {
        401 | 403 => BatchwireError::Auth(message),
        _ => BatchwireError::Network(message),
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json / toml → BatchwireError */
/* -------------------------------------------------------------------------- */

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(BatchwireError::Serialization(format!("invalid JSON: {value}")))
    }
}

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        InfraError(BatchwireError::Config(format!("invalid TOML: {value}")))
    }
}

#[cfg(test)]
mod tests {
    use reqwest::{Client, StatusCode};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn status_codes_map_to_auth_or_network() {
        assert!(matches!(status_error(401, "Unauthorized"), BatchwireError::Auth(_)));
        assert!(matches!(status_error(403, "Forbidden"), BatchwireError::Auth(_)));
        match status_error(502, "Bad Gateway") {
            BatchwireError::Network(msg) => assert_eq!(msg, "HTTP 502 Bad Gateway"),
            other => panic!("expected network error, got {:?}", other),
        }
    }

    #[test]
    fn json_errors_map_to_serialization() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let mapped: BatchwireError = InfraError::from(err).into();
        assert!(matches!(mapped, BatchwireError::Serialization(_)));
    }

    #[test]
    fn toml_errors_map_to_config() {
        let err = toml::from_str::<toml::Value>("= nope").unwrap_err();
        let mapped: BatchwireError = InfraError::from(err).into();
        assert!(matches!(mapped, BatchwireError::Config(msg) if msg.contains("TOML")));
    }

    #[tokio::test]
    async fn http_status_401_maps_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(StatusCode::UNAUTHORIZED))
            .mount(&server)
            .await;

        let client = Client::builder().no_proxy().build().unwrap();
        let error =
            client.post(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

        let mapped: BatchwireError = InfraError::from(error).into();
        match mapped {
            BatchwireError::Auth(msg) => assert!(msg.contains("401")),
            other => panic!("expected auth error, got {:?}", other),
        }
    }
}
