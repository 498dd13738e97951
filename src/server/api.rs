use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use futures::StreamExt;
use log::info;
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};

use crate::cli::Args;
use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::sse;
use crate::upstream::{ChatBackend, ChatCall};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub assistant_id: Option<String>,
}

#[derive(Clone)]
struct AppState {
    backend: Arc<dyn ChatBackend>,
    config: RelayConfig,
}

pub fn router(backend: Arc<dyn ChatBackend>, config: RelayConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(chat_handler))
        .layer(cors)
        .with_state(AppState { backend, config })
}

pub async fn start_http_server(
    addr: &str,
    backend: Arc<dyn ChatBackend>,
    config: RelayConfig,
    args: &Args,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = addr.parse::<SocketAddr>()?;
    let app = router(backend, config);

    if args.enable_tls && args.tls_cert_path.is_some() && args.tls_key_path.is_some() {
        let cert_path = args.tls_cert_path.as_ref().unwrap();
        let key_path = args.tls_key_path.as_ref().unwrap();

        let tls_config =
            axum_server::tls_rustls::RustlsConfig::from_pem_file(cert_path, key_path).await?;

        info!("Starting HTTPS relay server on: https://{}", addr);
        axum_server::bind_rustls(addr, tls_config)
            .serve(app.into_make_service())
            .await?;
    } else {
        info!("Starting HTTP relay server on: http://{}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app.into_make_service()).await?;
    }

    Ok(())
}

async fn chat_handler(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Response {
    match relay_chat(state, req).await {
        Ok(resp) => resp,
        Err(e) => e.into_response(),
    }
}

/// Validates the request, opens the upstream stream, and re-emits each text
/// delta as one SSE frame in arrival order. Errors after the response head
/// has been sent terminate the body abruptly instead of producing a trailer.
async fn relay_chat(state: AppState, req: ChatRequest) -> Result<Response, RelayError> {
    let message = req.message.unwrap_or_default();
    if message.is_empty() {
        return Err(RelayError::Validation("Message is required".to_string()));
    }

    let (api_key, assistant_id) = state
        .config
        .resolve_credentials(req.api_key.as_deref(), req.assistant_id.as_deref());
    let (Some(api_key), Some(assistant_id)) = (api_key, assistant_id) else {
        return Err(RelayError::Validation(
            "API key and Assistant ID are required".to_string(),
        ));
    };

    let call = ChatCall {
        api_key,
        assistant_id,
        input: message,
    };
    let deltas = state.backend.stream_chat(&call).await?;
    info!("Relaying chat stream for assistant {}", call.assistant_id);

    let frames = deltas.map(|item| item.map(|delta| sse::delta_frame(&delta)));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(frames))
        .map_err(|e| RelayError::Upstream(e.to_string()))
}
