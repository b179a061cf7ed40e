use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::core::error::{BackendError, ConfigError};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Thin JSON-over-HTTP client for the backend's REST surface.
///
/// Requests are single-shot; callers decide whether a failure is worth
/// repeating.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout_ms: u64,
}

impl HttpTransport {
    pub fn new(timeout_ms: u64) -> Result<Self, ConfigError> {
        Self::with_client(reqwest::Client::new(), timeout_ms)
    }

    pub fn with_client(client: reqwest::Client, timeout_ms: u64) -> Result<Self, ConfigError> {
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout { timeout_ms });
        }

        Ok(Self { client, timeout_ms })
    }

    pub async fn get_json<TResp>(&self, url: &str, bearer: Option<&str>) -> Result<TResp, BackendError>
    where
        TResp: DeserializeOwned,
    {
        let mut request = self
            .client
            .get(url)
            .timeout(Duration::from_millis(self.timeout_ms));
        if let Some(token) = bearer {
            request = request.headers(bearer_headers(token)?);
        }

        debug!(url, "sending backend request");
        let response = request
            .send()
            .await
            .map_err(|error| BackendError::Transport {
                request_id: None,
                message: error.to_string(),
            })?;

        let request_id = extract_request_id(response.headers());
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, request_id, response).await);
        }

        response
            .json::<TResp>()
            .await
            .map_err(|error| BackendError::Serialization {
                message: error.to_string(),
            })
    }
}

fn bearer_headers(token: &str) -> Result<HeaderMap, BackendError> {
    let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|error| {
        BackendError::Protocol {
            message: format!("invalid bearer token header value: {error}"),
        }
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}

async fn status_error(
    status: StatusCode,
    request_id: Option<String>,
    response: Response,
) -> BackendError {
    let status_code = status.as_u16();
    let message = match response.text().await {
        Ok(body) if !body.trim().is_empty() => body,
        Ok(_) => format!("http status {status_code}"),
        Err(error) => {
            format!("http status {status_code}; failed to read response body: {error}")
        }
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::CredentialsRejected {
            request_id,
            message,
        },
        _ => BackendError::Status {
            status_code,
            request_id,
            message,
        },
    }
}

fn extract_request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(HeaderName::from_static(REQUEST_ID_HEADER))
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
