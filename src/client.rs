//! Webhook client
//!
//! Three POST operations against one automation service: a login probe,
//! a chat message, and a knowledgebase refresh. The credential always
//! travels in the `Authorization` header, never in the body. Nothing here
//! retries; a retry is the user submitting again.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;

use crate::config::Endpoints;
use crate::credential::Credential;

/// Tag sent with every chat message
pub const MESSAGE_SOURCE: &str = "web-chatbot";
/// Reply used when the webhook answers 2xx without any output
pub const EMPTY_REPLY_FALLBACK: &str = "I received your message but got no response.";

const LOGIN_PROBE_ACTION: &str = "login_test";
const REFRESH_ACTION: &str = "refresh_knowledgebase";

/// Result of a login probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// 2xx: the credential is good
    Accepted(Credential),
    /// The service answered with a non-2xx status
    Rejected { status: u16 },
    /// No answer at all
    Unreachable,
}

/// Failure of a chat or refresh call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("webhook responded with status {0}")]
    Status(u16),
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed response body: {0}")]
    Decode(String),
    #[error("no refresh URL configured")]
    NotConfigured,
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            RemoteError::Decode(e.to_string())
        } else {
            RemoteError::Network(e.to_string())
        }
    }
}

/// The remote service as seen by the workflows
#[async_trait]
pub trait Webhook: Send + Sync {
    async fn verify(&self, username: &str, password: &str) -> VerifyOutcome;

    async fn send_message(&self, credential: &Credential, text: &str) -> Result<String, RemoteError>;

    async fn refresh_knowledgebase(&self, credential: &Credential) -> Result<(), RemoteError>;
}

/// HTTP implementation of [`Webhook`]
#[derive(Debug, Clone)]
pub struct WebhookClient {
    http: reqwest::Client,
    endpoints: Endpoints,
}

impl WebhookClient {
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoints,
        }
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        credential: &Credential,
        body: &B,
    ) -> Result<reqwest::Response, reqwest::Error> {
        tracing::debug!(url, "POST");
        self.http
            .post(url)
            .header(AUTHORIZATION, credential.header_value())
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await
    }
}

#[async_trait]
impl Webhook for WebhookClient {
    async fn verify(&self, username: &str, password: &str) -> VerifyOutcome {
        let credential = Credential::from_login(username, password);
        let body = ActionRequest {
            action: LOGIN_PROBE_ACTION,
            timestamp: None,
        };

        match self.post(&self.endpoints.verify_url, &credential, &body).await {
            Ok(resp) if resp.status().is_success() => VerifyOutcome::Accepted(credential),
            Ok(resp) => VerifyOutcome::Rejected {
                status: resp.status().as_u16(),
            },
            Err(e) => {
                tracing::error!(error = %e, "login probe failed");
                VerifyOutcome::Unreachable
            }
        }
    }

    async fn send_message(&self, credential: &Credential, text: &str) -> Result<String, RemoteError> {
        let body = ChatRequest {
            message: text,
            source: MESSAGE_SOURCE,
            timestamp: iso_now(),
        };

        let resp = self.post(&self.endpoints.chat_url, credential, &body).await?;
        if !resp.status().is_success() {
            return Err(RemoteError::Status(resp.status().as_u16()));
        }

        let data: serde_json::Value = resp.json().await?;
        Ok(reply_text(&data))
    }

    async fn refresh_knowledgebase(&self, credential: &Credential) -> Result<(), RemoteError> {
        let url = self
            .endpoints
            .refresh_url
            .as_deref()
            .ok_or(RemoteError::NotConfigured)?;
        let body = ActionRequest {
            action: REFRESH_ACTION,
            timestamp: Some(iso_now()),
        };

        let resp = self.post(url, credential, &body).await?;
        if !resp.status().is_success() {
            return Err(RemoteError::Status(resp.status().as_u16()));
        }
        Ok(())
    }
}

/// Check that something answers at `url`. Any HTTP status counts.
pub async fn check_reachable(url: &str) -> anyhow::Result<u16> {
    let resp = reqwest::Client::new()
        .get(url)
        .timeout(std::time::Duration::from_secs(5))
        .send()
        .await
        .with_context(|| format!("Failed to connect to {}", url))?;
    Ok(resp.status().as_u16())
}

/// ISO-8601 UTC with millisecond precision, e.g. `2024-05-01T12:00:00.000Z`
pub fn iso_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ═══════════════════════════════════════════════════════════════
// Wire Types
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    source: &'a str,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct ActionRequest<'a> {
    action: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
}

/// Pull `output` out of a 2xx body. Anything other than a non-empty
/// string there (array body, number, false, null) gets the fallback.
fn reply_text(body: &serde_json::Value) -> String {
    body.get("output")
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(EMPTY_REPLY_FALLBACK)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_shape() {
        let req = ChatRequest {
            message: "hello",
            source: MESSAGE_SOURCE,
            timestamp: "2024-01-01T00:00:00.000Z".into(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "message": "hello",
                "source": "web-chatbot",
                "timestamp": "2024-01-01T00:00:00.000Z"
            })
        );
    }

    #[test]
    fn test_login_probe_has_no_timestamp() {
        let req = ActionRequest {
            action: LOGIN_PROBE_ACTION,
            timestamp: None,
        };
        assert_eq!(serde_json::to_string(&req).unwrap(), r#"{"action":"login_test"}"#);
    }

    #[test]
    fn test_reply_fallbacks() {
        for body in [
            "{}",
            r#"{"output":""}"#,
            r#"{"output":null}"#,
            r#"{"output":0}"#,
            r#"{"output":false}"#,
            r#"[{"output":"hi"}]"#,
            "[]",
        ] {
            let value: serde_json::Value = serde_json::from_str(body).unwrap();
            assert_eq!(reply_text(&value), EMPTY_REPLY_FALLBACK, "body {}", body);
        }

        let full = serde_json::json!({"output": "hi there"});
        assert_eq!(reply_text(&full), "hi there");
    }

    #[tokio::test]
    async fn test_odd_reply_shapes_fall_back_over_http() {
        use axum::{routing::post, Router};

        async fn numeric() -> &'static str {
            r#"{"output":0}"#
        }
        async fn listed() -> &'static str {
            r#"[{"output":"hi"}]"#
        }
        async fn garbage() -> &'static str {
            "not json"
        }

        let app = Router::new()
            .route("/numeric", post(numeric))
            .route("/listed", post(listed))
            .route("/garbage", post(garbage));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let cred = Credential::from_token("abc");
        for path in ["numeric", "listed"] {
            let client = WebhookClient::new(Endpoints::new(format!("{}/{}", base, path)));
            assert_eq!(
                client.send_message(&cred, "hello").await.unwrap(),
                EMPTY_REPLY_FALLBACK
            );
        }

        let client = WebhookClient::new(Endpoints::new(format!("{}/garbage", base)));
        assert!(matches!(
            client.send_message(&cred, "hello").await,
            Err(RemoteError::Decode(_))
        ));
    }

    #[test]
    fn test_iso_timestamp_format() {
        let ts = iso_now();
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), "2024-01-01T00:00:00.000Z".len());
    }

    #[tokio::test]
    async fn test_refresh_without_url_is_not_configured() {
        let client = WebhookClient::new(Endpoints::new("http://127.0.0.1:9/chat"));
        let err = client
            .refresh_knowledgebase(&Credential::from_token("abc"))
            .await
            .unwrap_err();
        assert_eq!(err, RemoteError::NotConfigured);
    }
}
