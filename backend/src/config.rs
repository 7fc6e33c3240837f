use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::inference::quality::DEFAULT_BLUR_THRESHOLD;
use crate::inference::saliency::MAX_GRID;

pub const CONFIG_PATH_VAR: &str = "CROPGUARD_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/cropguard.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid URL for {key}: {source}")]
    Url {
        key: &'static str,
        source: url::ParseError,
    },
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub models: ModelConfig,
    pub saliency: SaliencyConfig,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub frontend_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub classifier_path: PathBuf,
    pub enhancer_path: PathBuf,
    pub enhancer_scale: u32,
    pub blur_variance_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SaliencyConfig {
    pub enabled: bool,
    pub grid: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            debug: true,
            frontend_dir: PathBuf::from("frontend"),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            classifier_path: PathBuf::from("models/classifier/mobilenet_v3_large.pt"),
            enhancer_path: PathBuf::from("models/enhancer_weights/RealESRGAN_x4plus.pt"),
            enhancer_scale: 4,
            blur_variance_threshold: DEFAULT_BLUR_THRESHOLD,
        }
    }
}

impl Default for SaliencyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            grid: 7,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "Groq".to_string(),
            api_key: None,
            base_url: None,
            model: None,
            temperature: 0.3,
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_retries: 1,
            retry_backoff_ms: 500,
        }
    }
}

impl SaliencyConfig {
    pub fn grid(&self) -> Option<usize> {
        self.enabled.then_some(self.grid)
    }
}

impl LlmConfig {
    fn is_groq(&self) -> bool {
        self.provider.eq_ignore_ascii_case("groq")
    }

    /// Environment variable holding the provider credential, e.g. `GROQ_API_KEY`.
    pub fn api_key_var(&self) -> String {
        format!("{}_API_KEY", self.provider.to_uppercase())
    }

    pub fn base_url(&self) -> &str {
        match &self.base_url {
            Some(url) => url,
            None if self.is_groq() => "https://api.groq.com/openai/v1",
            None => "https://api.openai.com/v1",
        }
    }

    pub fn model(&self) -> &str {
        match &self.model {
            Some(model) => model,
            None if self.is_groq() => "llama-3.1-8b-instant",
            None => "gpt-4-turbo",
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.trim().is_empty())
    }
}

impl AppConfig {
    /// Loads `.env`, the optional YAML file and then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let mut config = Self::from_file_or_default(Path::new(&path))?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = parse("PORT", &port)?;
        }
        if let Some(debug) = lookup("DEBUG") {
            self.server.debug = debug.to_lowercase() == "true";
        }
        if let Some(dir) = lookup("FRONTEND_DIR") {
            self.server.frontend_dir = PathBuf::from(dir);
        }

        if let Some(path) = lookup("CLASSIFIER_MODEL_PATH") {
            self.models.classifier_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("ENHANCER_MODEL_PATH") {
            self.models.enhancer_path = PathBuf::from(path);
        }
        if let Some(threshold) = lookup("BLUR_VARIANCE_THRESHOLD") {
            self.models.blur_variance_threshold = parse("BLUR_VARIANCE_THRESHOLD", &threshold)?;
        }

        if let Some(enabled) = lookup("SALIENCY_ENABLED") {
            self.saliency.enabled = enabled.to_lowercase() == "true";
        }
        if let Some(grid) = lookup("SALIENCY_GRID") {
            self.saliency.grid = parse("SALIENCY_GRID", &grid)?;
        }

        if let Some(provider) = lookup("LLM_PROVIDER_NAME") {
            self.llm.provider = provider;
        }
        if let Some(key) = lookup(&self.llm.api_key_var()) {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = lookup("LLM_BASE_URL") {
            self.llm.base_url = Some(url);
        }
        if let Some(model) = lookup("LLM_MODEL") {
            self.llm.model = Some(model);
        }
        if let Some(timeout) = lookup("LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse("LLM_TIMEOUT_SECS", &timeout)?;
        }
        if let Some(retries) = lookup("LLM_MAX_RETRIES") {
            self.llm.max_retries = parse("LLM_MAX_RETRIES", &retries)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(invalid("PORT", self.server.port));
        }
        let threshold = self.models.blur_variance_threshold;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(invalid("BLUR_VARIANCE_THRESHOLD", threshold));
        }
        if self.models.enhancer_scale == 0 {
            return Err(invalid("enhancer_scale", self.models.enhancer_scale));
        }
        if self.saliency.grid == 0 || self.saliency.grid > MAX_GRID {
            return Err(invalid("SALIENCY_GRID", self.saliency.grid));
        }
        if self.llm.timeout_secs == 0 {
            return Err(invalid("LLM_TIMEOUT_SECS", self.llm.timeout_secs));
        }
        Url::parse(self.llm.base_url()).map_err(|source| ConfigError::Url {
            key: "LLM_BASE_URL",
            source,
        })?;
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

fn invalid(key: &'static str, value: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
    }
}
