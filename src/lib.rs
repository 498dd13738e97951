pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod server;
pub mod sse;
pub mod upstream;

use cli::Args;
use config::RelayConfig;
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;
use upstream::vapi::VapiClient;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = RelayConfig::from_args(&args);

    if let Some(relay_url) = args.client.clone() {
        let api_key = config.fallback_api_key.unwrap_or_default();
        let assistant_id = config.fallback_assistant_id.unwrap_or_default();
        return client::run_client(relay_url, api_key, assistant_id).await;
    }

    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Upstream Chat URL: {}", config.upstream_url);
    info!("Chat Model: {}", config.model);
    info!(
        "Fallback Credentials: {}",
        if config.fallback_api_key.is_some() && config.fallback_assistant_id.is_some() {
            "configured"
        } else {
            "not configured (requests must carry apiKey and assistantId)"
        }
    );
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let backend = Arc::new(VapiClient::from_config(&config)?);
    let server = Server::new(args.server_addr.clone(), backend, config, args);
    server.run().await
}
