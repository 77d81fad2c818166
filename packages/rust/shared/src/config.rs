//! Application configuration for Brochurizer.
//!
//! User config lives at `~/.brochurizer/brochurizer.toml`.
//! CLI flags override environment variables, which override config file values,
//! which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BrochureError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "brochurizer.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".brochurizer";

/// Environment variable overriding `[llm].base_url`.
pub const BASE_URL_ENV: &str = "BASE_URL";

/// Environment variable overriding `[llm].model`.
pub const MODEL_ENV: &str = "MODEL";

// ---------------------------------------------------------------------------
// Config structs (matching brochurizer.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Language model endpoint settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Page fetching settings.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Brochure generation and export settings.
    #[serde(default)]
    pub brochure: BrochureConfig,
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible API (without `/chat/completions`).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Client-side timeout for model calls. Unset means no timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            model: default_model(),
            request_timeout_secs: None,
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_api_key_env() -> String {
    "API_KEY".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Timeout for a single page fetch.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// Timeout for the seed URL reachability check.
    #[serde(default = "default_reachability_timeout")]
    pub reachability_timeout_secs: u64,

    /// Maximum redirects followed per fetch.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            reachability_timeout_secs: default_reachability_timeout(),
            max_redirects: default_max_redirects(),
        }
    }
}

fn default_fetch_timeout() -> u64 {
    30
}
fn default_reachability_timeout() -> u64 {
    5
}
fn default_max_redirects() -> usize {
    5
}

/// `[brochure]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrochureConfig {
    /// Directory exported brochures are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Cap on aggregated page text sent to the drafting request.
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,

    /// Languages accepted as translation targets.
    #[serde(default = "default_supported_languages")]
    pub supported_languages: Vec<String>,
}

impl Default for BrochureConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            max_content_chars: default_max_content_chars(),
            supported_languages: default_supported_languages(),
        }
    }
}

fn default_output_dir() -> String {
    "output".into()
}
fn default_max_content_chars() -> usize {
    20_000
}
fn default_supported_languages() -> Vec<String> {
    ["spanish", "english", "french", "chinese", "german"]
        .into_iter()
        .map(String::from)
        .collect()
}

// ---------------------------------------------------------------------------
// Resolved LLM settings (config + env)
// ---------------------------------------------------------------------------

/// Resolved language model settings handed to the client constructor.
#[derive(Clone)]
pub struct LlmSettings {
    /// API base URL.
    pub base_url: String,
    /// Bearer token.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Optional request timeout.
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl LlmSettings {
    /// Resolve settings from the config and the process environment.
    pub fn resolve(config: &AppConfig) -> Result<Self> {
        Self::resolve_with(config, |name| std::env::var(name).ok())
    }

    /// Resolve settings using `lookup` for environment variables.
    pub fn resolve_with(
        config: &AppConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let var_name = &config.llm.api_key_env;
        let api_key = non_empty(var_name).ok_or_else(|| {
            BrochureError::config(format!(
                "API key not found. Set the {var_name} environment variable."
            ))
        })?;

        let base_url = non_empty(BASE_URL_ENV).unwrap_or_else(|| config.llm.base_url.clone());
        let model = non_empty(MODEL_ENV).unwrap_or_else(|| config.llm.model.clone());

        if model.trim().is_empty() {
            return Err(BrochureError::config("model identifier is empty"));
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            timeout: config.llm.request_timeout_secs.map(Duration::from_secs),
        })
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.brochurizer/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| BrochureError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.brochurizer/brochurizer.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| BrochureError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| BrochureError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BrochureError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| BrochureError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| BrochureError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
