use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Openai,
    Openrouter,
    Ollama,
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProvider::Openai => write!(f, "openai"),
            LlmProvider::Openrouter => write!(f, "openrouter"),
            LlmProvider::Ollama => write!(f, "ollama"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: default_model(),
            base_url: String::new(),
            api_key: String::new(),
            max_tokens: None,
            system_prompt: default_system_prompt(),
        }
    }
}

impl LlmConfig {
    /// Returns the effective base_url: if the stored value is empty,
    /// fall back to the canonical URL for the configured provider.
    pub fn effective_base_url(&self) -> &str {
        if !self.base_url.is_empty() {
            return self.base_url.trim_end_matches('/');
        }
        match self.provider {
            LlmProvider::Openai => "https://api.openai.com/v1",
            LlmProvider::Openrouter => "https://openrouter.ai/api/v1",
            LlmProvider::Ollama => "http://localhost:11434/v1",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default = "default_sticker_file_id")]
    pub sticker_file_id: String,
    /// Username the bot answers to in `/command@username` forms.
    #[serde(default)]
    pub bot_username: Option<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            sticker_file_id: default_sticker_file_id(),
            bot_username: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Public URL Telegram should deliver updates to. Registered on startup when set.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            webhook_url: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_system_prompt() -> String {
    "Ты опытный нутрициолог со стажем работы более 10 лет и высшим медицинским образованием. \
     Тебе на консультацию обращаются клиенты, который хотят наладить и улучшить свое качество \
     жизни через питание и прием витаминов и минералов, а также поддержания здорового образа жизни"
        .to_string()
}

fn default_sticker_file_id() -> String {
    "CAACAgIAAxkBAAELH8FnaStKYP0XDy5LL98x7I_Ej2SV3wAC1xQAAtzRCUn4G0gDnaqg-DYE".to_string()
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

impl Config {
    /// Load the TOML file at `path` (defaults when it does not exist), then apply
    /// environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config: Config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            warn!(
                "Config file {} not found, using defaults and environment",
                path.display()
            );
            Config::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());

        if config.telegram.bot_token.is_empty() {
            warn!("Telegram bot token is empty; set TELEGRAM_TOKEN or [telegram] bot_token");
        }
        if config.llm.api_key.is_empty() {
            warn!("LLM API key is empty; set OPENAI_TOKEN or [llm] api_key");
        }

        Ok(config)
    }

    /// Overlay values from the environment. `lookup` is `std::env::var` outside tests.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup("TELEGRAM_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Some(key) = lookup("OPENAI_TOKEN") {
            self.llm.api_key = key;
        }
        if let Some(username) = lookup("BOT_USERNAME") {
            self.telegram.bot_username = Some(username).filter(|u| !u.is_empty());
        }
        if let Some(addr) = lookup("LISTEN_ADDR") {
            self.server.listen_addr = addr;
        }
        if let Some(url) = lookup("WEBHOOK_URL") {
            self.server.webhook_url = Some(url).filter(|u| !u.is_empty());
        }
    }
}
