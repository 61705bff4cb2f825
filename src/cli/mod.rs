use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- History Store Args ---
    /// Path of the JSON file holding the conversation log
    #[arg(long, env = "HISTORY_FILE", default_value = "conversation.json")]
    pub history_file: String,

    /// Number of prompt/answer pairs to keep; older pairs are evicted first. 0 keeps everything.
    #[arg(long, env = "MAX_HISTORY", default_value = "10")]
    pub max_history: usize,

    // --- Chat LLM Provider Args ---
    /// API key for the Gemini API
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: String,

    /// Model name for chat completion (e.g., gemini-2.5-pro-exp-03-25, gemini-1.5-flash-latest)
    #[arg(long, env = "CHAT_MODEL", default_value = crate::llm::DEFAULT_GEMINI_MODEL)]
    pub chat_model: String,

    /// Base URL for the Gemini API, without the `/models/...` suffix
    #[arg(long, env = "CHAT_BASE_URL", default_value = crate::llm::DEFAULT_GEMINI_BASE_URL)]
    pub chat_base_url: String,

    /// Timeout in seconds for a single generation request. 0 disables the timeout.
    #[arg(long, env = "CHAT_TIMEOUT_SECS", default_value = "120")]
    pub chat_timeout_secs: u64,

    // --- Server Args ---
    /// Host address and port for the server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "0.0.0.0:3000")]
    pub server_addr: String,

    /// Directory with the browser UI (index.html and its assets)
    #[arg(long, env = "PUBLIC_DIR", default_value = "public")]
    pub public_dir: String,

    /// Optional path to the TLS certificate file (PEM format) for enabling HTTPS. Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format) for enabling HTTPS. Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_only_key_given() {
        let args = Args::try_parse_from(["ask-relay", "--gemini-api-key", "k"]).unwrap();
        assert_eq!(args.history_file, "conversation.json");
        assert_eq!(args.max_history, 10);
        assert_eq!(args.server_addr, "0.0.0.0:3000");
        assert_eq!(args.chat_timeout_secs, 120);
        assert!(!args.enable_tls);
    }
}
