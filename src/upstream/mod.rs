pub mod vapi;

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::error::RelayError;

pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, RelayError>> + Send>>;

/// Parameters for one streaming chat call. Credentials travel with the call
/// rather than living in shared client state.
#[derive(Clone, Debug)]
pub struct ChatCall {
    pub api_key: String,
    pub assistant_id: String,
    pub input: String,
}

/// Seam between the relay endpoint and the upstream chat service. The relay
/// handler only sees text deltas in arrival order; transport details stay
/// behind this trait.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Opens a streaming chat request. Setup failures (connect errors,
    /// non-success upstream status) are returned here, before any outbound
    /// bytes exist; failures after that surface as stream items.
    async fn stream_chat(&self, call: &ChatCall) -> Result<DeltaStream, RelayError>;
}
