//! hookchat-stub: local stand-in for the automation webhook
//!
//! Speaks the same contract as the real service so the client can be
//! exercised without one. Chat messages are echoed back as markdown.
//! Run with: HOOKCHAT_STUB_USER=demo HOOKCHAT_STUB_PASS=demo cargo run --bin hookchat-stub

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::{env, sync::Arc};
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use hookchat::credential::Credential;
use hookchat::logging;

/// Application state
struct AppState {
    expected: Credential,
    refreshes: RwLock<Vec<String>>,
}

/// Anything the chat webhook receives: a login probe or a message
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatBody {
    Message {
        message: String,
        #[serde(default)]
        source: Option<String>,
    },
    Action {
        action: String,
    },
}

#[derive(Debug, Serialize)]
struct ChatReply {
    output: String,
}

#[derive(Debug, Deserialize)]
struct RefreshBody {
    action: String,
}

#[derive(Debug, Serialize)]
struct RefreshReply {
    status: &'static str,
    job_id: String,
    /// Jobs accepted since the stub started, this one included
    queued: usize,
}

fn authorized(state: &AppState, headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == state.expected.header_value())
}

async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ChatBody>,
) -> Result<Json<ChatReply>, StatusCode> {
    if !authorized(&state, &headers) {
        tracing::warn!("rejected chat call with bad credentials");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let output = match body {
        ChatBody::Action { action } => format!("ok: {}", action),
        ChatBody::Message { message, source } => {
            tracing::info!(source = source.as_deref().unwrap_or("-"), "message received");
            format!("You said:\n\n> {}\n\n**{}** characters.", message, message.chars().count())
        }
    };
    Ok(Json(ChatReply { output }))
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<RefreshBody>,
) -> Result<Json<RefreshReply>, StatusCode> {
    if !authorized(&state, &headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    if body.action != "refresh_knowledgebase" {
        return Err(StatusCode::BAD_REQUEST);
    }

    let job_id = Uuid::new_v4().to_string();
    let queued = {
        let mut jobs = state.refreshes.write().await;
        jobs.push(job_id.clone());
        jobs.len()
    };
    tracing::info!(%job_id, queued, "knowledgebase refresh queued");

    Ok(Json(RefreshReply {
        status: "accepted",
        job_id,
        queued,
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_stderr();

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(5678);
    let user = env::var("HOOKCHAT_STUB_USER").unwrap_or_else(|_| "demo".into());
    let pass = env::var("HOOKCHAT_STUB_PASS").unwrap_or_else(|_| "demo".into());

    let state = Arc::new(AppState {
        expected: Credential::from_login(&user, &pass),
        refreshes: RwLock::new(Vec::new()),
    });

    let app = Router::new()
        .route("/webhook/chat", post(chat))
        .route("/webhook/refresh", post(refresh))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!(
        "hookchat-stub listening on http://127.0.0.1:{}/webhook/chat (refresh: /webhook/refresh)",
        port
    );

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> Arc<AppState> {
        Arc::new(AppState {
            expected: Credential::from_login("demo", "demo"),
            refreshes: RwLock::new(Vec::new()),
        })
    }

    fn auth(cred: &Credential) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, cred.header_value().parse().unwrap());
        headers
    }

    fn body() -> Json<RefreshBody> {
        Json(RefreshBody {
            action: "refresh_knowledgebase".into(),
        })
    }

    #[tokio::test]
    async fn test_refresh_reports_queue_length() {
        let state = state();
        let headers = auth(&state.expected);

        let first = refresh(State(state.clone()), headers.clone(), body()).await.unwrap().0;
        let second = refresh(State(state.clone()), headers, body()).await.unwrap().0;

        assert_eq!(first.queued, 1);
        assert_eq!(second.queued, 2);
        assert_ne!(first.job_id, second.job_id);
        assert_eq!(state.refreshes.read().await.len(), 2);
    }

    #[tokio::test]
    async fn test_refresh_rejects_wrong_credentials() {
        let state = state();
        let headers = auth(&Credential::from_login("demo", "wrong"));

        let err = refresh(State(state.clone()), headers, body()).await.unwrap_err();
        assert_eq!(err, StatusCode::UNAUTHORIZED);
        assert!(state.refreshes.read().await.is_empty());
    }
}
