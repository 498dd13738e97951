use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::{ChatBackend, ChatCall, DeltaStream};
use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::sse::{self, SseLineBuffer};

/// Event type the upstream uses to tag streamed text fragments; everything
/// else on the stream is ignored.
const TEXT_DELTA_EVENT: &str = "response.output_text.delta";

/// Streaming client for the Vapi chat endpoint. One upstream connection is
/// opened per call and consumed (or dropped) within that call's lifetime.
pub struct VapiClient {
    http: HttpClient,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatStreamRequest {
    model: String,
    input: String,
    stream: bool,
    assistant_id: String,
}

#[derive(Deserialize)]
struct UpstreamEvent {
    #[serde(rename = "type")]
    event_type: Option<String>,
    delta: Option<String>,
}

impl VapiClient {
    pub fn new(base_url: String, model: String) -> Result<Self, RelayError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| RelayError::Upstream(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            model,
        })
    }

    pub fn from_config(config: &RelayConfig) -> Result<Self, RelayError> {
        Self::new(config.upstream_url.clone(), config.model.clone())
    }

    fn request_body(&self, call: &ChatCall) -> ChatStreamRequest {
        ChatStreamRequest {
            model: self.model.clone(),
            input: call.input.clone(),
            stream: true,
            assistant_id: call.assistant_id.clone(),
        }
    }
}

#[async_trait]
impl ChatBackend for VapiClient {
    async fn stream_chat(&self, call: &ChatCall) -> Result<DeltaStream, RelayError> {
        let url = self.base_url.trim_end_matches('/').to_string();
        let req = self.request_body(call);

        let resp = self
            .http
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", call.api_key))
            .json(&req)
            .send()
            .await
            .map_err(|e| RelayError::Upstream(e.to_string()))?;

        if let Err(e) = resp.error_for_status_ref() {
            return Err(RelayError::Upstream(e.to_string()));
        }

        let (tx, rx) = mpsc::channel(32);

        tokio::spawn(async move {
            let mut lines = SseLineBuffer::new();
            let mut stream = resp.bytes_stream();

            while let Some(chunk_result) = stream.next().await {
                match chunk_result {
                    Ok(chunk) => {
                        for line in lines.push(&chunk) {
                            let Some(data) = sse::data_payload(&line) else {
                                continue;
                            };
                            if data == sse::DONE_MARKER {
                                return;
                            }

                            match serde_json::from_str::<UpstreamEvent>(data) {
                                Ok(event) => {
                                    if event.event_type.as_deref() != Some(TEXT_DELTA_EVENT) {
                                        debug!(
                                            "Ignoring upstream event: {}",
                                            event.event_type.as_deref().unwrap_or("<untyped>")
                                        );
                                        continue;
                                    }
                                    if let Some(delta) = event.delta {
                                        if !delta.is_empty() && tx.send(Ok(delta)).await.is_err() {
                                            // Receiver dropped; stop reading upstream.
                                            return;
                                        }
                                    }
                                }
                                Err(e) => {
                                    warn!("Skipping malformed upstream event: {} for data: {}", e, data);
                                }
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(RelayError::Upstream(e.to_string()))).await;
                        return;
                    }
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;
    use futures::stream;
    use std::net::SocketAddr;

    /// Serves one scripted chat response: each `Ok` is written as its own
    /// body chunk; an `Err` aborts the body mid-stream.
    async fn spawn_upstream(chunks: Vec<Result<String, String>>) -> SocketAddr {
        let app = Router::new().route(
            "/chat",
            post(move || {
                let items: Vec<Result<String, std::io::Error>> = chunks
                    .iter()
                    .cloned()
                    .map(|r| {
                        r.map_err(|e| std::io::Error::new(std::io::ErrorKind::ConnectionReset, e))
                    })
                    .collect();
                async move {
                    // Yield between items so each chunk is flushed to the
                    // socket before a scripted `Err` aborts the connection;
                    // with a plain `stream::iter` hyper polls the error
                    // immediately and resets before the head is delivered.
                    let body = stream::iter(items).then(|item| async move {
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        item
                    });
                    axum::response::Response::builder()
                        .header("content-type", "text/event-stream")
                        .body(Body::from_stream(body))
                        .unwrap()
                }
            }),
        );
        spawn_server(app).await
    }

    async fn spawn_server(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service()).await.unwrap();
        });
        addr
    }

    fn call() -> ChatCall {
        ChatCall {
            api_key: "key-1".to_string(),
            assistant_id: "assistant-1".to_string(),
            input: "hi".to_string(),
        }
    }

    fn client_for(addr: SocketAddr) -> VapiClient {
        VapiClient::new(format!("http://{}/chat", addr), "gpt-4o".to_string()).unwrap()
    }

    #[tokio::test]
    async fn forwards_only_text_delta_events_in_order() {
        // Mixes a non-delta event, a malformed line, an empty delta, a frame
        // split across chunks, and a [DONE] marker followed by a stray frame.
        let addr = spawn_upstream(vec![
            Ok(concat!(
                "data: {\"type\":\"response.created\"}\n\n",
                "data: {\"type\":\"response.output_text.delta\",\"delta\":\"Hel\"}\n\n",
            )
            .to_string()),
            Ok(concat!(
                "data: {not json}\n\n",
                "data: {\"type\":\"response.output_text.delta\",\"del",
            )
            .to_string()),
            Ok(concat!(
                "ta\":\"lo\"}\n\n",
                "data: {\"type\":\"response.output_text.delta\",\"delta\":\"\"}\n\n",
            )
            .to_string()),
            Ok(concat!(
                "data: [DONE]\n\n",
                "data: {\"type\":\"response.output_text.delta\",\"delta\":\"late\"}\n\n",
            )
            .to_string()),
        ])
        .await;

        let client = client_for(addr);
        let mut stream = client.stream_chat(&call()).await.unwrap();

        let mut deltas = Vec::new();
        while let Some(item) = stream.next().await {
            deltas.push(item.unwrap());
        }
        assert_eq!(deltas, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn mid_stream_transport_error_is_forwarded() {
        let addr = spawn_upstream(vec![
            Ok("data: {\"type\":\"response.output_text.delta\",\"delta\":\"par\"}\n\n".to_string()),
            Err("connection reset".to_string()),
        ])
        .await;

        let client = client_for(addr);
        let mut stream = client.stream_chat(&call()).await.unwrap();

        let mut deltas = Vec::new();
        let mut saw_error = false;
        while let Some(item) = stream.next().await {
            match item {
                Ok(delta) => deltas.push(delta),
                Err(e) => {
                    assert!(matches!(e, RelayError::Upstream(_)));
                    saw_error = true;
                    break;
                }
            }
        }
        assert_eq!(deltas, vec!["par"]);
        assert!(saw_error);
    }

    #[tokio::test]
    async fn non_success_status_fails_before_streaming() {
        let app = Router::new().route(
            "/chat",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let addr = spawn_server(app).await;

        let client = client_for(addr);
        let result = client.stream_chat(&call()).await;

        assert!(matches!(result, Err(RelayError::Upstream(_))));
    }

    #[test]
    fn request_body_carries_message_and_assistant_verbatim() {
        let client = VapiClient::new(
            "https://api.vapi.ai/chat".to_string(),
            "gpt-4o".to_string(),
        )
        .unwrap();
        let call = ChatCall {
            api_key: "key-1".to_string(),
            assistant_id: "assistant-1".to_string(),
            input: "Can you write me a poem?".to_string(),
        };

        let body = serde_json::to_value(client.request_body(&call)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "model": "gpt-4o",
                "input": "Can you write me a poem?",
                "stream": true,
                "assistantId": "assistant-1",
            })
        );
    }

    #[test]
    fn upstream_event_gates_on_type() {
        let delta: UpstreamEvent =
            serde_json::from_str(r#"{"type":"response.output_text.delta","delta":"hi"}"#).unwrap();
        assert_eq!(delta.event_type.as_deref(), Some(TEXT_DELTA_EVENT));
        assert_eq!(delta.delta.as_deref(), Some("hi"));

        let other: UpstreamEvent =
            serde_json::from_str(r#"{"type":"response.completed"}"#).unwrap();
        assert_ne!(other.event_type.as_deref(), Some(TEXT_DELTA_EVENT));
        assert!(other.delta.is_none());
    }
}
