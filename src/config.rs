use std::env;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_CHUNK_SIZE: usize = 1000;
const DEFAULT_CHUNK_OVERLAP: usize = 200;
const DEFAULT_SEPARATOR: &str = "\n";
const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 16;
const DEFAULT_RETRIEVAL_TOP_K: usize = 4;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for pdfchat.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the Azure OpenAI resource, e.g. `https://my-resource.openai.azure.com`.
    pub azure_openai_endpoint: String,
    /// API key sent in the `api-key` header.
    pub azure_openai_api_key: String,
    /// Embedding model; doubles as the embedding deployment name.
    pub embedding_model: String,
    /// Chat model deployment name.
    pub chat_deployment: String,
    /// Azure OpenAI REST API version (`api-version` query parameter).
    pub api_version: String,
    /// Maximum chunk length in characters.
    pub text_splitter_chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub text_splitter_chunk_overlap: usize,
    /// Separator the splitter prefers for chunk boundaries.
    pub text_splitter_separator: String,
    /// Number of chunks sent per embeddings request.
    pub embedding_batch_size: usize,
    /// Number of chunks retrieved per question.
    pub retrieval_top_k: usize,
    /// Optional sampling temperature forwarded to the chat model.
    pub chat_temperature: Option<f32>,
    /// Rephrase follow-up questions into standalone ones before retrieval.
    pub condense_follow_ups: bool,
    /// Timeout applied to every Azure request.
    pub request_timeout_secs: u64,
    /// Idle time after which an HTTP session and its index are discarded.
    pub session_ttl_secs: u64,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
        };
        let optional = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let azure_openai_endpoint = required("AZURE_OPENAI_ENDPOINT")?;
        if !azure_openai_endpoint.starts_with("http://")
            && !azure_openai_endpoint.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue("AZURE_OPENAI_ENDPOINT".into()));
        }

        let text_splitter_chunk_size =
            parse_optional(&optional, "TEXT_SPLITTER_CHUNK_SIZE")?.unwrap_or(DEFAULT_CHUNK_SIZE);
        let text_splitter_chunk_overlap = parse_optional(&optional, "TEXT_SPLITTER_CHUNK_OVERLAP")?
            .unwrap_or(DEFAULT_CHUNK_OVERLAP);
        if text_splitter_chunk_size == 0 {
            return Err(ConfigError::InvalidValue("TEXT_SPLITTER_CHUNK_SIZE".into()));
        }
        if text_splitter_chunk_overlap > text_splitter_chunk_size {
            return Err(ConfigError::InvalidValue(
                "TEXT_SPLITTER_CHUNK_OVERLAP".into(),
            ));
        }

        let embedding_batch_size = parse_optional(&optional, "EMBEDDING_BATCH_SIZE")?
            .unwrap_or(DEFAULT_EMBEDDING_BATCH_SIZE);
        if embedding_batch_size == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_BATCH_SIZE".into()));
        }
        let retrieval_top_k =
            parse_optional(&optional, "RETRIEVAL_TOP_K")?.unwrap_or(DEFAULT_RETRIEVAL_TOP_K);
        if retrieval_top_k == 0 {
            return Err(ConfigError::InvalidValue("RETRIEVAL_TOP_K".into()));
        }

        // Whitespace separators are kept verbatim; only the empty string is refused.
        let text_splitter_separator = match lookup("TEXT_SPLITTER_SEPARATOR") {
            Some(value) if value.is_empty() => {
                return Err(ConfigError::InvalidValue("TEXT_SPLITTER_SEPARATOR".into()));
            }
            Some(value) => unescape_separator(&value),
            None => DEFAULT_SEPARATOR.to_string(),
        };

        let session_ttl_secs =
            parse_optional(&optional, "SESSION_TTL_SECS")?.unwrap_or(DEFAULT_SESSION_TTL_SECS);
        if session_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue("SESSION_TTL_SECS".into()));
        }

        Ok(Self {
            azure_openai_endpoint,
            azure_openai_api_key: required("AZURE_OPENAI_API_KEY")?,
            embedding_model: required("AZURE_EMBEDDING_MODEL")?,
            chat_deployment: required("AZURE_CHAT_MODEL")?,
            api_version: required("OPENAI_API_VERSION")?,
            text_splitter_chunk_size,
            text_splitter_chunk_overlap,
            text_splitter_separator,
            embedding_batch_size,
            retrieval_top_k,
            chat_temperature: parse_optional(&optional, "CHAT_TEMPERATURE")?,
            condense_follow_ups: optional("CONDENSE_FOLLOW_UPS")
                .map(|value| {
                    parse_bool(&value)
                        .ok_or_else(|| ConfigError::InvalidValue("CONDENSE_FOLLOW_UPS".into()))
                })
                .transpose()?
                .unwrap_or(true),
            request_timeout_secs: parse_optional(&optional, "REQUEST_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            session_ttl_secs,
            server_port: parse_optional(&optional, "SERVER_PORT")?,
        })
    }
}

fn parse_optional<T, F>(optional: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// `.env` files cannot carry a literal newline comfortably, so `\n`, `\r`, and `\t` escapes are
/// expanded here.
fn unescape_separator(raw: &str) -> String {
    let mut output = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            output.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => output.push('\n'),
            Some('r') => output.push('\r'),
            Some('t') => output.push('\t'),
            Some('\\') => output.push('\\'),
            Some(other) => {
                output.push('\\');
                output.push(other);
            }
            None => output.push('\\'),
        }
    }
    output
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Merge a `.env` file from the working directory (or its parents) into the process
/// environment. Existing variables win.
///
/// Binaries call this before [`crate::logging::init_tracing`] so `RUST_LOG` and
/// `PDFCHAT_LOG_FILE` may live in `.env` alongside the Azure settings.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Load configuration from the environment (and `.env`) and install it in the global cache.
///
/// Called once at startup so that missing Azure settings fail before any request is served.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    load_dotenv();
    let config = Config::from_env()?;
    tracing::debug!(
        endpoint = %config.azure_openai_endpoint,
        embedding_model = %config.embedding_model,
        chat_deployment = %config.chat_deployment,
        api_version = %config.api_version,
        chunk_size = config.text_splitter_chunk_size,
        chunk_overlap = config.text_splitter_chunk_overlap,
        top_k = config.retrieval_top_k,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}
