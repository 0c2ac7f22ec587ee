use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    pub github: GithubConfig,
    pub genai: GenAiConfig,
    pub review: ReviewConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(".")
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Config::builder()
            .add_source(
                File::with_name(
                    path.as_ref()
                        .join("config/default")
                        .to_string_lossy()
                        .as_ref(),
                )
                .required(false),
            )
            .add_source(
                File::with_name(
                    path.as_ref()
                        .join("config/local")
                        .to_string_lossy()
                        .as_ref(),
                )
                .required(false),
            )
            .add_source(Environment::default().separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    /// When unset the run persists to the in-memory store only.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    /// Personal access token, possibly wrapped by the configured cipher.
    pub token: String,
    /// Identity handed to the cipher when unwrapping the token.
    #[serde(default)]
    pub token_key_id: Option<String>,
    pub username: String,
    #[serde(default = "GithubConfig::default_user_agent")]
    pub user_agent: String,
    #[serde(default = "GithubConfig::default_api_base")]
    pub api_base: String,
}

impl GithubConfig {
    fn default_user_agent() -> String {
        "review-prep-lab".to_string()
    }

    fn default_api_base() -> String {
        "https://api.github.com/".to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenAiConfig {
    #[serde(default = "GenAiConfig::default_endpoint")]
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

impl GenAiConfig {
    fn default_endpoint() -> String {
        "https://api.openai.com/v1/chat/completions".to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewConfig {
    pub user_email: String,
    /// Rubric level: foundation, core, or peak.
    pub level: String,
    /// Review period bounds, ISO dates (YYYY-MM-DD).
    pub period_start: String,
    pub period_end: String,
    /// Web URLs of pull requests to include besides the search results.
    #[serde(default)]
    pub manual_pr_urls: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "CacheConfig::default_snapshot_capacity")]
    pub snapshot_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            snapshot_capacity: Self::default_snapshot_capacity(),
        }
    }
}

impl CacheConfig {
    const fn default_snapshot_capacity() -> usize {
        64
    }
}
