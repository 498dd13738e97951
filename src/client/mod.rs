use std::error::Error;
use std::io::Write;

use futures_util::{pin_mut, Stream, StreamExt};
use log::warn;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::models::chat::{ChatMessage, Conversation, Role};
use crate::sse::{self, SseLineBuffer};

/// Shown in place of the assistant reply when the request or stream fails.
const ERROR_REPLY: &str = "Sorry, I encountered an error. Please try again.";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RelayRequest<'a> {
    message: &'a str,
    api_key: &'a str,
    assistant_id: &'a str,
}

#[derive(Deserialize)]
struct DeltaEvent {
    delta: Option<String>,
}

/// Outcome of one submission, after the session has returned to idle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// The stream completed; the trailing assistant message holds the full reply.
    Done,
    /// The request or stream failed; the trailing assistant message holds
    /// the fixed apology string.
    Errored,
    /// The submission was gated off (already streaming, blank input, or blank
    /// credentials) and nothing was appended or sent.
    Ignored,
}

/// Consumer side of the relay: owns the conversation, submits messages, and
/// folds the SSE delta stream into the trailing assistant entry. One
/// submission at a time; the loading flag gates re-entry.
pub struct ChatSession {
    http: HttpClient,
    relay_url: String,
    api_key: String,
    assistant_id: String,
    conversation: Conversation,
    is_loading: bool,
}

impl ChatSession {
    pub fn new(relay_url: String, api_key: String, assistant_id: String) -> Self {
        Self {
            http: HttpClient::new(),
            relay_url,
            api_key,
            assistant_id,
            conversation: Conversation::new(),
            is_loading: false,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub async fn send_message(&mut self, input: &str) -> SendOutcome {
        self.send_message_with(input, |_| {}).await
    }

    /// Submits one message and streams the reply, invoking `on_delta` for each
    /// fragment as it arrives. The conversation gains a user entry and an
    /// assistant entry that grows as deltas land.
    pub async fn send_message_with<F>(&mut self, input: &str, on_delta: F) -> SendOutcome
    where
        F: FnMut(&str),
    {
        if self.is_loading
            || input.trim().is_empty()
            || self.api_key.trim().is_empty()
            || self.assistant_id.trim().is_empty()
        {
            return SendOutcome::Ignored;
        }

        self.conversation.push(ChatMessage::new(Role::User, input));
        self.conversation.push(ChatMessage::new(Role::Assistant, ""));
        self.is_loading = true;

        let outcome = match self.stream_reply(input, on_delta).await {
            Ok(()) => SendOutcome::Done,
            Err(e) => {
                warn!("Chat request failed: {}", e);
                self.conversation.update_last(ERROR_REPLY);
                SendOutcome::Errored
            }
        };

        // Runs on every path back to idle, success or failure.
        self.is_loading = false;
        outcome
    }

    async fn stream_reply<F>(
        &mut self,
        input: &str,
        on_delta: F,
    ) -> Result<(), Box<dyn Error + Send + Sync>>
    where
        F: FnMut(&str),
    {
        let req = RelayRequest {
            message: input,
            api_key: &self.api_key,
            assistant_id: &self.assistant_id,
        };

        let resp = self
            .http
            .post(&self.relay_url)
            .json(&req)
            .send()
            .await?
            .error_for_status()?;

        self.consume_deltas(resp.bytes_stream(), on_delta).await?;
        Ok(())
    }

    /// Folds a chunked SSE byte stream into the trailing assistant message.
    /// Only `data: ` lines count; malformed JSON is logged and skipped; a
    /// chunk boundary can land anywhere without affecting the result.
    async fn consume_deltas<S, B, E, F>(&mut self, stream: S, mut on_delta: F) -> Result<(), E>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        F: FnMut(&str),
    {
        pin_mut!(stream);
        let mut lines = SseLineBuffer::new();
        let mut accumulated = String::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for line in lines.push(chunk.as_ref()) {
                let Some(data) = sse::data_payload(&line) else {
                    continue;
                };

                match serde_json::from_str::<DeltaEvent>(data) {
                    Ok(event) => {
                        if let Some(delta) = event.delta {
                            accumulated.push_str(&delta);
                            on_delta(&delta);
                            self.conversation.update_last(&accumulated);
                        }
                    }
                    Err(e) => {
                        warn!("Failed to parse streaming data: {} for line: {}", e, data);
                    }
                }
            }
        }

        Ok(())
    }
}

/// Interactive terminal client: reads lines from stdin, sends each through a
/// [`ChatSession`], and prints deltas as they arrive.
pub async fn run_client(
    relay_url: String,
    api_key: String,
    assistant_id: String,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    if api_key.trim().is_empty() || assistant_id.trim().is_empty() {
        return Err("VAPI_API_KEY and VAPI_ASSISTANT_ID are required in client mode".into());
    }

    let mut session = ChatSession::new(relay_url, api_key, assistant_id);
    let mut input_lines = BufReader::new(tokio::io::stdin()).lines();

    prompt()?;
    while let Some(line) = input_lines.next_line().await? {
        if line.trim().is_empty() {
            prompt()?;
            continue;
        }

        let outcome = session
            .send_message_with(&line, |delta| {
                print!("{}", delta);
                let _ = std::io::stdout().flush();
            })
            .await;

        if outcome == SendOutcome::Ignored {
            warn!("Message ignored: a reply is still streaming or credentials are blank");
        }
        println!();
        prompt()?;
    }

    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("> ");
    std::io::stdout().flush()
}
