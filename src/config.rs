use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use hackscope_core::retry::BackoffPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

/// Where the fast cache lives.
///
/// `sqlite` shares entries with every process using the same database file;
/// `memory` is private to one process.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_namespace_repo")]
    pub namespace_repo: String,
    #[serde(default = "default_namespace_project")]
    pub namespace_project: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            ttl_secs: default_ttl_secs(),
            namespace_repo: default_namespace_repo(),
            namespace_project: default_namespace_project(),
        }
    }
}

impl CacheConfig {
    /// `None` when entries never expire.
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_secs > 0).then(|| Duration::from_secs(self.ttl_secs))
    }
}

fn default_ttl_secs() -> u64 {
    86_400
}
fn default_namespace_repo() -> String {
    "repo-analysis".to_string()
}
fn default_namespace_project() -> String {
    "project-analysis".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct GithubConfig {
    #[serde(default = "default_github_url")]
    pub api_url: String,
    #[serde(default = "default_github_token_env")]
    pub token_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_url(),
            token_env: default_github_token_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_github_url() -> String {
    "https://api.github.com".to_string()
}
fn default_github_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_url")]
    pub api_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_gemini_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_project_temperature")]
    pub project_temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_rate_limit_cap_ms")]
    pub rate_limit_cap_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_url: default_generation_url(),
            model: default_model(),
            api_key_env: default_gemini_key_env(),
            temperature: default_temperature(),
            project_temperature: default_project_temperature(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            rate_limit_cap_ms: default_rate_limit_cap_ms(),
        }
    }
}

impl GenerationConfig {
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
            rate_limit_cap: Duration::from_millis(self.rate_limit_cap_ms),
        }
    }
}

fn default_generation_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}
fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_gemini_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_project_temperature() -> f32 {
    0.1
}
fn default_max_output_tokens() -> u32 {
    1000
}
fn default_max_retries() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    1500
}
fn default_rate_limit_cap_ms() -> u64 {
    10_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScrapeConfig {
    #[serde(default = "default_scrape_url")]
    pub api_url: String,
    #[serde(default = "default_firecrawl_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_scrape_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_page_base_url")]
    pub page_base_url: String,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            api_url: default_scrape_url(),
            api_key_env: default_firecrawl_key_env(),
            timeout_secs: default_scrape_timeout_secs(),
            page_base_url: default_page_base_url(),
        }
    }
}

fn default_scrape_url() -> String {
    "https://api.firecrawl.dev".to_string()
}
fn default_firecrawl_key_env() -> String {
    "FIRECRAWL_API_KEY".to_string()
}
fn default_scrape_timeout_secs() -> u64 {
    15
}
fn default_page_base_url() -> String {
    "https://devpost.com/software/".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

const TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 3..=30;

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&content)?;
    Ok(config)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if !TIMEOUT_RANGE.contains(&config.github.timeout_secs) {
        anyhow::bail!("github.timeout_secs must be between 3 and 30");
    }
    if !TIMEOUT_RANGE.contains(&config.generation.timeout_secs) {
        anyhow::bail!("generation.timeout_secs must be between 3 and 30");
    }
    if !TIMEOUT_RANGE.contains(&config.scrape.timeout_secs) {
        anyhow::bail!("scrape.timeout_secs must be between 3 and 30");
    }

    let generation = &config.generation;
    if generation.model.trim().is_empty() {
        anyhow::bail!("generation.model must not be empty");
    }
    for (name, t) in [
        ("temperature", generation.temperature),
        ("project_temperature", generation.project_temperature),
    ] {
        if !(0.0..=2.0).contains(&t) {
            anyhow::bail!("generation.{} must be in [0.0, 2.0]", name);
        }
    }
    if generation.max_retries > 10 {
        anyhow::bail!("generation.max_retries must be <= 10");
    }
    if generation.max_output_tokens == 0 {
        anyhow::bail!("generation.max_output_tokens must be > 0");
    }

    if config.cache.namespace_repo.is_empty() || config.cache.namespace_project.is_empty() {
        anyhow::bail!("cache namespaces must not be empty");
    }
    if config.cache.namespace_repo == config.cache.namespace_project {
        anyhow::bail!("cache.namespace_repo and cache.namespace_project must differ");
    }

    Ok(config)
}
