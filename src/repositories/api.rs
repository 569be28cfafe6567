use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use crate::models::envelope::Envelope;
use crate::utils;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Bad response format: {0}")]
    Decode(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("{message}")]
    Rejected {
        status: u16,
        message: String,
        retry_after_minutes: Option<u32>,
    },
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            ApiError::Decode(_) | ApiError::InvalidRequest(_) => None,
        }
    }

    /// Minutes until the server accepts the same request again, when the
    /// rejection carried such a hint.
    pub fn retry_after_minutes(&self) -> Option<u32> {
        match self {
            ApiError::Rejected {
                retry_after_minutes,
                ..
            } => *retry_after_minutes,
            _ => None,
        }
    }
}

/// Raw result of a call that reached the server with a 2xx status.
#[derive(Debug)]
pub struct ApiResponse {
    pub status: u16,
    pub envelope: Envelope,
}

impl ApiResponse {
    /// Treats `success: false` as a rejection even on a 2xx status.
    pub fn into_success(self) -> Result<Envelope, ApiError> {
        if self.envelope.success {
            Ok(self.envelope)
        } else {
            Err(rejection(self.status, Some(&self.envelope)))
        }
    }
}

fn rejection(status: u16, envelope: Option<&Envelope>) -> ApiError {
    let message = envelope
        .and_then(|e| e.error.clone())
        .unwrap_or_else(|| format!("HTTP error! status: {}", status));

    // Only a still-valid code carries a wait. The structured field wins over
    // the hint embedded in the text.
    let still_valid =
        status == 429 || envelope.and_then(|e| e.extra_bool("code_still_valid")) == Some(true);
    let retry_after_minutes = if still_valid {
        envelope
            .and_then(|e| e.extra_u32("minutes_remaining"))
            .or_else(|| utils::parse_minutes_hint(&message))
    } else {
        None
    };

    ApiError::Rejected {
        status,
        message,
        retry_after_minutes,
    }
}

pub fn decode<T: DeserializeOwned>(envelope: &Envelope, what: &str) -> Result<T, ApiError> {
    envelope
        .data_as()
        .map_err(|e| ApiError::Decode(format!("{}: {}", what, e)))
}

/// Reads a list that the server may return bare, under `data.<key>` or
/// under `data.data.<key>`.
pub fn decode_list<T: DeserializeOwned>(
    envelope: &Envelope,
    key: &str,
) -> Result<Vec<T>, ApiError> {
    let null = Value::Null;
    let data = envelope.data.as_ref().unwrap_or(&null);
    let list = if data.is_array() {
        data
    } else if data[key].is_array() {
        &data[key]
    } else if data["data"][key].is_array() {
        &data["data"][key]
    } else {
        return Err(ApiError::Decode(format!("Missing list key: {}", key)));
    };

    serde_json::from_value(list.clone())
        .map_err(|e| ApiError::Decode(format!("{}: {}", key, e)))
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get(
        &self,
        path: &str,
        token: Option<&str>,
        query: &[(&str, String)],
    ) -> Result<ApiResponse, ApiError> {
        self.send(Method::GET, path, token, None, query).await
    }

    pub async fn post(
        &self,
        path: &str,
        token: Option<&str>,
        body: &Value,
    ) -> Result<ApiResponse, ApiError> {
        self.send(Method::POST, path, token, Some(body), &[]).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<ApiResponse, ApiError> {
        self.send(Method::DELETE, path, token, None, &[]).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<&Value>,
        query: &[(&str, String)],
    ) -> Result<ApiResponse, ApiError> {
        let mut request = self
            .client
            .request(method.clone(), format!("{}{}", self.base_url, path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await.map_err(|e| {
            log::error!("{} {} failed: {}", method, path, e);
            ApiError::Network(e)
        })?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| {
            log::error!("{} {}: could not read body: {}", method, path, e);
            ApiError::Network(e)
        })?;
        let envelope = serde_json::from_str::<Envelope>(&text).ok();

        if !(200..300).contains(&status) {
            let error = rejection(status, envelope.as_ref());
            log::warn!("{} {} rejected ({}): {}", method, path, status, error);
            return Err(error);
        }

        match envelope {
            Some(envelope) => {
                log::debug!("{} {} -> {}", method, path, status);
                Ok(ApiResponse { status, envelope })
            }
            None => {
                log::error!("{} {} returned a non-JSON body", method, path);
                Err(ApiError::Decode(format!("{} {}: expected JSON body", method, path)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use serde_json::json;

    fn client(url: String) -> ApiClient {
        ApiClient::new(&url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn attaches_bearer_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/auth/me")
            .match_header("authorization", "Bearer t1")
            .with_status(200)
            .with_body(r#"{"success": true, "data": {}}"#)
            .create_async()
            .await;

        let response = client(server.url())
            .get("/api/auth/me", Some("t1"), &[])
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(response.envelope.success);
    }

    #[tokio::test]
    async fn non_success_status_surfaces_server_error_text() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/auth/login")
            .with_status(401)
            .with_body(r#"{"success": false, "error": "Invalid credentials"}"#)
            .create_async()
            .await;

        let err = client(server.url())
            .post("/api/auth/login", None, &json!({}))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(err.status(), Some(401));
    }

    #[tokio::test]
    async fn non_json_failure_gets_generic_message() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/banks")
            .with_status(502)
            .with_body("<html>Bad Gateway</html>")
            .create_async()
            .await;

        let err = client(server.url())
            .get("/api/banks", None, &[])
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "HTTP error! status: 502");
    }

    #[tokio::test]
    async fn structured_retry_hint_wins_over_text() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/auth/regenerate_verification_code")
            .with_status(429)
            .with_body(
                json!({
                    "success": false,
                    "error": "Please wait 9 minutes before requesting a new code.",
                    "code_still_valid": true,
                    "minutes_remaining": 4
                })
                .to_string(),
            )
            .create_async()
            .await;

        let err = client(server.url())
            .post("/api/auth/regenerate_verification_code", Some("t"), &json!({}))
            .await
            .unwrap_err();

        assert_eq!(err.retry_after_minutes(), Some(4));
    }

    #[tokio::test]
    async fn server_failure_mentioning_minutes_has_no_retry_hint() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/auth/regenerate_verification_code")
            .with_status(500)
            .with_body(r#"{"success": false, "error": "Email failed, retry in 2 minutes"}"#)
            .create_async()
            .await;

        let err = client(server.url())
            .post("/api/auth/regenerate_verification_code", Some("t"), &json!({}))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert_eq!(err.retry_after_minutes(), None);
    }

    #[test]
    fn still_valid_flag_reads_hint_on_any_status() {
        let envelope = Envelope {
            error: Some("Code still valid for 2 minutes".to_string()),
            extra: json!({"code_still_valid": true})
                .as_object()
                .cloned()
                .unwrap(),
            ..Default::default()
        };

        assert_eq!(rejection(400, Some(&envelope)).retry_after_minutes(), Some(2));
    }

    #[test]
    fn success_false_on_ok_status_is_a_rejection() {
        let response = ApiResponse {
            status: 200,
            envelope: Envelope {
                success: false,
                error: Some("Limit must be a positive integer".to_string()),
                ..Default::default()
            },
        };

        let err = response.into_success().unwrap_err();
        assert_eq!(err.status(), Some(200));
        assert_eq!(err.to_string(), "Limit must be a positive integer");
    }

    #[test]
    fn list_is_found_at_any_nesting() {
        let bare = Envelope {
            data: Some(json!([1, 2])),
            ..Default::default()
        };
        let nested = Envelope {
            data: Some(json!({"banks": [1, 2]})),
            ..Default::default()
        };
        let double = Envelope {
            data: Some(json!({"data": {"banks": [1, 2]}})),
            ..Default::default()
        };

        for envelope in [bare, nested, double] {
            let list: Vec<u8> = decode_list(&envelope, "banks").unwrap();
            assert_eq!(list, vec![1, 2]);
        }

        let missing = Envelope::default();
        assert!(decode_list::<u8>(&missing, "banks").is_err());
    }
}
