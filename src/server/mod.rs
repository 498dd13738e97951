pub mod api;

use std::error::Error;
use std::sync::Arc;

use crate::cli::Args;
use crate::config::RelayConfig;
use crate::upstream::ChatBackend;

pub struct Server {
    addr: String,
    backend: Arc<dyn ChatBackend>,
    config: RelayConfig,
    args: Args,
}

impl Server {
    pub fn new(
        addr: String,
        backend: Arc<dyn ChatBackend>,
        config: RelayConfig,
        args: Args,
    ) -> Self {
        Self {
            addr,
            backend,
            config,
            args,
        }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        api::start_http_server(
            &self.addr,
            self.backend.clone(),
            self.config.clone(),
            &self.args,
        )
        .await
    }
}
