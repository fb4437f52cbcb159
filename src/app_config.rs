use anyhow::{anyhow, Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::default::Default;
use std::fs;
use std::path::{Path, PathBuf};

use crate::providers::BackoffPolicy;

/// Application configuration module
/// This module handles the application configuration including loading,
/// environment overrides, validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Language of the optimized resume and fallback output language (ISO)
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Output languages offered besides the built-in ones (ISO codes)
    #[serde(default)]
    pub extra_languages: Vec<String>,

    /// Maximum translate-review attempts per run
    #[serde(default = "default_translation_max_iterations")]
    pub translation_max_iterations: u32,

    /// Maximum drafting rounds of the upstream filter chain
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Minimum reviewer score for a translation to be accepted
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: f32,

    /// Run upstream filters concurrently instead of in priority order
    #[serde(default)]
    pub parallel_filters: bool,

    /// Folder where rendered documents are stored
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// HTML-to-PDF command, reads HTML on stdin and writes PDF on stdout
    #[serde(default = "default_render_command")]
    pub render_command: Vec<String>,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: Anthropic
    #[default]
    Anthropic,
    // @provider: OpenAI
    OpenAI,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::LMStudio => "LM Studio",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
        }
    }

    /// Whether the provider is a hosted API that needs a key
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::LMStudio)
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "lmstudio" => Ok(Self::LMStudio),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        match provider_type {
            TranslationProvider::OpenAI => Self {
                provider_type: "openai".to_string(),
                model: default_openai_model(),
                api_key: String::new(),
                endpoint: default_openai_endpoint(),
                timeout_secs: default_timeout_secs(),
            },
            TranslationProvider::Anthropic => Self {
                provider_type: "anthropic".to_string(),
                model: default_anthropic_model(),
                api_key: String::new(),
                endpoint: default_anthropic_endpoint(),
                timeout_secs: default_anthropic_timeout_secs(),
            },
            TranslationProvider::LMStudio => Self {
                provider_type: "lmstudio".to_string(),
                model: default_lmstudio_model(),
                api_key: String::new(),
                endpoint: default_lmstudio_endpoint(),
                timeout_secs: default_timeout_secs(),
            },
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff multiplier for retries (in milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Temperature for the translator (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Temperature for the reviewer, kept low for consistent scoring
    #[serde(default = "default_review_temperature")]
    pub review_temperature: f32,

    /// Maximum tokens per completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Extra terms kept untranslated, e.g. employer product names
    #[serde(default)]
    pub preserved_terms: Vec<String>,

    /// Fixed translations, source term -> target term
    #[serde(default)]
    pub term_overrides: BTreeMap<String, String>,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            temperature: default_temperature(),
            review_temperature: default_review_temperature(),
            max_tokens: default_max_tokens(),
            preserved_terms: Vec::new(),
            term_overrides: BTreeMap::new(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(anyhow!("Invalid log level: {}", s)),
        }
    }
}

fn default_language() -> String {
    "en".to_string()
}

fn default_translation_max_iterations() -> u32 {
    2
}

fn default_max_iterations() -> u32 {
    5
}

fn default_pass_threshold() -> f32 {
    0.8
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_render_command() -> Vec<String> {
    vec!["weasyprint".to_string(), "-".to_string(), "-".to_string()]
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_anthropic_timeout_secs() -> u64 {
    120
}

fn default_retry_count() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_temperature() -> f32 {
    0.3
}

fn default_review_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_lmstudio_endpoint() -> String {
    // LM Studio default server (OpenAI compatible) runs on port 1234 under /v1
    "http://localhost:1234/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o".to_string()
}

fn default_anthropic_model() -> String {
    "claude-sonnet-4-5".to_string()
}

fn default_lmstudio_model() -> String {
    // Placeholder; users should set to the loaded model name in LM Studio
    "local-model".to_string()
}

impl Config {
    /// Load configuration from a JSON file, or defaults when `path` does not
    /// exist, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str::<Config>(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            debug!("Config file {} not found, using defaults", path.display());
            Config::default()
        };

        // A missing .env file is not an error
        dotenvy::dotenv().ok();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults with overrides resolved through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        config.apply_overrides(lookup)?;
        Ok(config)
    }

    /// Apply the recognized environment keys found through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(value) = get("DEFAULT_LANGUAGE") {
            self.default_language = value.to_lowercase();
        }
        if let Some(value) = get("TRANSLATION_MAX_ITERATIONS") {
            self.translation_max_iterations = value
                .parse()
                .with_context(|| format!("Invalid TRANSLATION_MAX_ITERATIONS: {}", value))?;
        }
        if let Some(value) = get("MAX_ITERATIONS") {
            self.max_iterations = value
                .parse()
                .with_context(|| format!("Invalid MAX_ITERATIONS: {}", value))?;
        }
        if let Some(value) = get("TRANSLATION_PASS_THRESHOLD") {
            self.pass_threshold = value
                .parse()
                .with_context(|| format!("Invalid TRANSLATION_PASS_THRESHOLD: {}", value))?;
        }
        if let Some(value) = get("OUTPUT_DIR") {
            self.output_dir = PathBuf::from(value);
        }
        if let Some(value) = get("TRANSLATION_PROVIDER") {
            self.translation.provider = value.parse()?;
        }
        if let Some(value) = get("ANTHROPIC_API_KEY") {
            self.translation
                .provider_config_mut(TranslationProvider::Anthropic)
                .api_key = value;
        }
        if let Some(value) = get("OPENAI_API_KEY") {
            self.translation
                .provider_config_mut(TranslationProvider::OpenAI)
                .api_key = value;
        }
        Ok(())
    }

    /// Write the configuration as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        crate::language::validate_language_code(&self.default_language)
            .with_context(|| format!("Invalid default_language: {}", self.default_language))?;
        for code in &self.extra_languages {
            crate::language::validate_language_code(code)
                .with_context(|| format!("Invalid entry in extra_languages: {}", code))?;
        }

        if self.translation_max_iterations < 1 {
            return Err(anyhow!("translation_max_iterations must be at least 1"));
        }
        if self.max_iterations < 1 {
            return Err(anyhow!("max_iterations must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.pass_threshold) {
            return Err(anyhow!(
                "pass_threshold must be between 0.0 and 1.0, got {}",
                self.pass_threshold
            ));
        }
        if self.render_command.is_empty() {
            return Err(anyhow!("render_command must name a program"));
        }

        let provider = &self.translation.provider;
        if let Some(endpoint) = self
            .translation
            .get_active_provider_config()
            .map(|c| c.endpoint.trim())
            .filter(|e| !e.is_empty())
        {
            url::Url::parse(endpoint)
                .with_context(|| format!("Invalid endpoint for {}: {}", provider.display_name(), endpoint))?;
        }
        if provider.requires_api_key() && self.translation.get_api_key().is_empty() {
            return Err(anyhow!(
                "Translation API key is required for {} provider",
                provider.display_name()
            ));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            default_language: default_language(),
            extra_languages: Vec::new(),
            translation_max_iterations: default_translation_max_iterations(),
            max_iterations: default_max_iterations(),
            pass_threshold: default_pass_threshold(),
            parallel_filters: false,
            output_dir: default_output_dir(),
            render_command: default_render_command(),
            translation: TranslationConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &TranslationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers
            .iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Mutable provider entry, inserted with defaults when missing
    pub fn provider_config_mut(&mut self, provider_type: TranslationProvider) -> &mut ProviderConfig {
        let provider_str = provider_type.to_lowercase_string();
        let index = match self
            .available_providers
            .iter()
            .position(|p| p.provider_type == provider_str)
        {
            Some(index) => index,
            None => {
                self.available_providers.push(ProviderConfig::new(provider_type));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[index]
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.model.is_empty() {
                return provider_config.model.clone();
            }
        }

        // Default fallback based on provider type
        match self.provider {
            TranslationProvider::OpenAI => default_openai_model(),
            TranslationProvider::Anthropic => default_anthropic_model(),
            TranslationProvider::LMStudio => default_lmstudio_model(),
        }
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.api_key.clone())
            .unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.endpoint.is_empty() {
                return provider_config.endpoint.clone();
            }
        }

        match self.provider {
            TranslationProvider::OpenAI => default_openai_endpoint(),
            TranslationProvider::Anthropic => default_anthropic_endpoint(),
            TranslationProvider::LMStudio => default_lmstudio_endpoint(),
        }
    }

    /// Get the request timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .filter(|t| *t > 0)
            .unwrap_or_else(default_timeout_secs)
    }

    /// Client-side backoff for transient provider failures
    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            retry_count: self.common.retry_count,
            backoff_ms: self.common.retry_backoff_ms,
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: vec![
                ProviderConfig::new(TranslationProvider::Anthropic),
                ProviderConfig::new(TranslationProvider::OpenAI),
                ProviderConfig::new(TranslationProvider::LMStudio),
            ],
            common: TranslationCommonConfig::default(),
        }
    }
}
