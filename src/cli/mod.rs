use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Chat LLM Provider Args ---
    /// Transport used for chat completion (azure, openai)
    #[arg(long, env = "LLM_PROVIDER", default_value = "azure")]
    pub provider: String,

    /// API key for the chat completion endpoint. Missing keys are reported at startup, not rejected.
    #[arg(long, env = "AZURE_OPENAI_API_KEY")]
    pub api_key: Option<String>,

    /// Endpoint of the chat completion API (e.g., https://my-resource.openai.azure.com)
    #[arg(long, env = "AZURE_OPENAI_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Azure OpenAI API version sent as the `api-version` query parameter.
    #[arg(long, env = "AZURE_OPENAI_API_VERSION", default_value = "2024-12-01-preview")]
    pub api_version: String,

    /// Deployment (model) identifier to invoke.
    #[arg(long, env = "AZURE_OPENAI_DEPLOYMENT", default_value = "gpt-4.1")]
    pub deployment: String,

    /// Sampling temperature used for both the proposal and the critic call.
    #[arg(long, env = "LLM_TEMPERATURE", default_value = "0.2")]
    pub temperature: f32,

    /// Upper bound on generated tokens per call.
    #[arg(long, env = "LLM_MAX_COMPLETION_TOKENS", default_value = "900")]
    pub max_completion_tokens: u32,

    /// Per-call timeout in seconds for the remote chat API.
    #[arg(long, env = "LLM_TIMEOUT_SECS", default_value = "60")]
    pub timeout_secs: u64,

    // --- Retry Args ---
    /// Total attempts per remote call, including the first one.
    #[arg(long, env = "RETRY_MAX_ATTEMPTS", default_value = "3")]
    pub retry_max_attempts: u32,

    /// Backoff before the second attempt, in milliseconds.
    #[arg(long, env = "RETRY_INITIAL_BACKOFF_MS", default_value = "1000")]
    pub retry_initial_backoff_ms: u64,

    /// Ceiling for the exponential backoff, in milliseconds.
    #[arg(long, env = "RETRY_MAX_BACKOFF_MS", default_value = "8000")]
    pub retry_max_backoff_ms: u64,

    // --- General App Args ---
    /// Optional JSON file overriding the built-in system/critic prompts.
    #[arg(long, env = "PROMPTS_PATH")]
    pub prompts_path: Option<String>,

    /// Host address and port for the HTTP server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "0.0.0.0:7071")]
    pub server_addr: String,

    /// Optional path to the TLS certificate file (PEM format) for enabling HTTPS. Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format) for enabling HTTPS. Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,

    // --- One-shot Mode ---
    /// Run the pipeline once for this problem, print the result and exit instead of serving HTTP.
    #[arg(long)]
    pub problem: Option<String>,

    /// Skip the critic pass in one-shot mode.
    #[arg(long, default_value = "false")]
    pub no_critic: bool,
}

/// Hides a secret for log output, keeping only whether it was set.
pub fn mask_secret(value: Option<&str>) -> &'static str {
    match value {
        Some(v) if !v.trim().is_empty() => "***",
        _ => "<not set>",
    }
}
