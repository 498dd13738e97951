use crate::cli::Args;

/// Per-call relay configuration. Built once from [`Args`] and passed
/// explicitly wherever it is needed; there is no process-wide client state,
/// so credential handling stays testable across runs.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub upstream_url: String,
    pub model: String,
    pub fallback_api_key: Option<String>,
    pub fallback_assistant_id: Option<String>,
}

impl RelayConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            upstream_url: args.upstream_url.clone(),
            model: args.model.clone(),
            fallback_api_key: non_blank(&args.api_key),
            fallback_assistant_id: non_blank(&args.assistant_id),
        }
    }

    /// Request-supplied credentials win; blanks fall back to the configured
    /// single-tenant pair, if any.
    pub fn resolve_credentials(
        &self,
        api_key: Option<&str>,
        assistant_id: Option<&str>,
    ) -> (Option<String>, Option<String>) {
        (
            api_key
                .and_then(non_blank)
                .or_else(|| self.fallback_api_key.clone()),
            assistant_id
                .and_then(non_blank)
                .or_else(|| self.fallback_assistant_id.clone()),
        )
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
