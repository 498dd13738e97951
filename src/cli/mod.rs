use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Host address and port for the relay server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,

    /// Base URL of the upstream chat API.
    #[arg(long, env = "UPSTREAM_URL", default_value = "https://api.vapi.ai/chat")]
    pub upstream_url: String,

    /// Model name passed through to the upstream chat API.
    #[arg(long, env = "CHAT_MODEL", default_value = "gpt-4o")]
    pub model: String,

    /// Fallback API key used when a request carries none (single-tenant mode).
    #[arg(long, env = "VAPI_API_KEY", default_value = "")]
    pub api_key: String,

    /// Fallback assistant ID used when a request carries none.
    #[arg(long, env = "VAPI_ASSISTANT_ID", default_value = "")]
    pub assistant_id: String,

    /// Run as an interactive terminal client against the given relay URL
    /// (e.g., http://127.0.0.1:4000/api/chat) instead of serving. Client mode
    /// takes its credentials from VAPI_API_KEY and VAPI_ASSISTANT_ID (or the
    /// matching flags) and exits with an error when either is blank.
    #[arg(long, env = "CLIENT_URL")]
    pub client: Option<String>,

    /// Optional path to the TLS certificate file (PEM format) for serving over HTTPS. Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format) for serving over HTTPS. Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}
