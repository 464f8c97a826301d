//! Application configuration for Bidcraft.
//!
//! User config lives at `~/.bidcraft/bidcraft.toml`.
//! CLI flags override config file values, which override defaults.
//! Secrets never live in the file: it only names the environment variables
//! that hold them, and those are read once at startup into [`Credentials`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BidcraftError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "bidcraft.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".bidcraft";

// ---------------------------------------------------------------------------
// Config structs (matching bidcraft.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Anthropic model provider settings.
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Government data feed settings.
    #[serde(default)]
    pub feeds: FeedsConfig,
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port for the proposal deployment.
    #[serde(default = "default_proposal_port")]
    pub proposal_port: u16,

    /// Port for the BD-research deployment.
    #[serde(default = "default_research_port")]
    pub research_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            proposal_port: default_proposal_port(),
            research_port: default_research_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_proposal_port() -> u16 {
    8000
}
fn default_research_port() -> u16 {
    8001
}

/// `[anthropic]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_anthropic_key_env")]
    pub api_key_env: String,

    /// Model used for every pipeline step.
    #[serde(default = "default_model")]
    pub model: String,

    /// API base URL, without the `/v1/messages` suffix.
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,

    /// Connect timeout in seconds; request lifetime is left to the provider.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Per-step output token ceilings.
    #[serde(default)]
    pub max_tokens: MaxTokensConfig,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_anthropic_key_env(),
            model: default_model(),
            base_url: default_anthropic_base_url(),
            connect_timeout_secs: default_connect_timeout(),
            max_tokens: MaxTokensConfig::default(),
        }
    }
}

fn default_anthropic_key_env() -> String {
    "ANTHROPIC_API_KEY".into()
}
fn default_model() -> String {
    "claude-sonnet-4-6".into()
}
fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".into()
}
fn default_connect_timeout() -> u64 {
    10
}

/// `[anthropic.max_tokens]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaxTokensConfig {
    #[serde(default = "default_extract_tokens")]
    pub extract: u32,
    #[serde(default = "default_match_tokens")]
    pub matching: u32,
    #[serde(default = "default_score_tokens")]
    pub score: u32,
    #[serde(default = "default_draft_tokens")]
    pub draft: u32,
    #[serde(default = "default_brief_tokens")]
    pub brief: u32,
}

impl Default for MaxTokensConfig {
    fn default() -> Self {
        Self {
            extract: default_extract_tokens(),
            matching: default_match_tokens(),
            score: default_score_tokens(),
            draft: default_draft_tokens(),
            brief: default_brief_tokens(),
        }
    }
}

fn default_extract_tokens() -> u32 {
    4096
}
fn default_match_tokens() -> u32 {
    4096
}
fn default_score_tokens() -> u32 {
    8192
}
fn default_draft_tokens() -> u32 {
    64_000
}
fn default_brief_tokens() -> u32 {
    8192
}

/// `[feeds]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedsConfig {
    /// Name of the env var holding the SAM.gov API key. Optional at runtime.
    #[serde(default = "default_sam_key_env")]
    pub sam_api_key_env: String,

    /// SAM.gov opportunities search endpoint.
    #[serde(default = "default_sam_url")]
    pub sam_search_url: String,

    /// USASpending.gov API root (`.../api/v2`).
    #[serde(default = "default_usaspending_url")]
    pub usaspending_base_url: String,

    /// Hard ceiling on each data API call.
    #[serde(default = "default_feed_timeout")]
    pub timeout_secs: u64,

    /// SAM.gov posting window in days.
    #[serde(default = "default_days_posted")]
    pub days_posted: i64,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            sam_api_key_env: default_sam_key_env(),
            sam_search_url: default_sam_url(),
            usaspending_base_url: default_usaspending_url(),
            timeout_secs: default_feed_timeout(),
            days_posted: default_days_posted(),
        }
    }
}

fn default_sam_key_env() -> String {
    "SAM_API_KEY".into()
}
fn default_sam_url() -> String {
    "https://api.sam.gov/opportunities/v2/search".into()
}
fn default_usaspending_url() -> String {
    "https://api.usaspending.gov/api/v2".into()
}
fn default_feed_timeout() -> u64 {
    30
}
fn default_days_posted() -> i64 {
    90
}

// ---------------------------------------------------------------------------
// Credentials (resolved once at startup)
// ---------------------------------------------------------------------------

/// Secrets resolved from the environment. Immutable for the process lifetime.
#[derive(Clone, Default)]
pub struct Credentials {
    /// Anthropic API key.
    pub anthropic_api_key: String,
    /// SAM.gov API key, when configured.
    pub sam_api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("anthropic_api_key", &"<redacted>")
            .field("sam_api_key", &self.sam_api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credentials {
    /// Read every credential named by `config` from the environment.
    ///
    /// The Anthropic key is mandatory; the SAM.gov key is optional and its
    /// absence only degrades the research pipeline.
    pub fn from_env(config: &AppConfig) -> Result<Self> {
        let anthropic_api_key = read_env(&config.anthropic.api_key_env).ok_or_else(|| {
            BidcraftError::config(format!(
                "Anthropic API key not found. Set the {} environment variable.",
                config.anthropic.api_key_env
            ))
        })?;

        let sam_api_key = read_env(&config.feeds.sam_api_key_env);
        if sam_api_key.is_none() {
            tracing::debug!(var = %config.feeds.sam_api_key_env, "SAM.gov key not set");
        }

        Ok(Self {
            anthropic_api_key,
            sam_api_key,
        })
    }
}

fn read_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Some(val.trim().to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.bidcraft/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| BidcraftError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.bidcraft/bidcraft.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| BidcraftError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        BidcraftError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BidcraftError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| BidcraftError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| BidcraftError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("ANTHROPIC_API_KEY"));
        assert!(toml_str.contains("SAM_API_KEY"));
        assert!(toml_str.contains("usaspending_base_url"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[server]
proposal_port = 9000

[anthropic.max_tokens]
draft = 16000
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.server.proposal_port, 9000);
        assert_eq!(config.server.research_port, 8001);
        assert_eq!(config.anthropic.max_tokens.draft, 16000);
        assert_eq!(config.anthropic.max_tokens.score, 8192);
        assert_eq!(config.feeds.timeout_secs, 30);
    }

    #[test]
    fn missing_anthropic_key_is_config_error() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.anthropic.api_key_env = "BIDCRAFT_TEST_NONEXISTENT_KEY_12345".into();
        let result = Credentials::from_env(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }

    #[test]
    fn credentials_debug_redacts_secrets() {
        let creds = Credentials {
            anthropic_api_key: "sk-secret".into(),
            sam_api_key: Some("sam-secret".into()),
        };
        let shown = format!("{creds:?}");
        assert!(!shown.contains("sk-secret"));
        assert!(!shown.contains("sam-secret"));
    }
}
