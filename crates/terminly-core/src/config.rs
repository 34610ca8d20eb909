use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, TerminError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub sms: SmsConfig,
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub booking: BookingConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

fn default_port() -> u16 {
    3000
}

fn default_static_dir() -> String {
    "static".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_bot_name")]
    pub name: String,
    /// Default reply language when the client does not send one.
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_bot_name() -> String {
    "Mia".to_string()
}

fn default_language() -> String {
    "English".to_string()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            language: default_language(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
}

fn default_llm_provider() -> String {
    "openai".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    #[serde(default)]
    pub account_sid: String,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default)]
    pub from_number: String,
    /// Prefix prepended to national numbers, e.g. "+49".
    #[serde(default = "default_country_code")]
    pub default_country_code: String,
}

fn default_country_code() -> String {
    "+49".to_string()
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: String::new(),
            default_country_code: default_country_code(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_callback_url")]
    pub callback_url: String,
    #[serde(default = "default_token_path")]
    pub token_path: String,
}

fn default_callback_url() -> String {
    "http://localhost:3000/auth/google/callback".to_string()
}

fn default_token_path() -> String {
    "google_token.json".to_string()
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            callback_url: default_callback_url(),
            token_path: default_token_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// UTC offset in hours applied to booked slots (e.g. 1 for CET).
    #[serde(default = "default_timezone_offset")]
    pub timezone_offset: i32,
    #[serde(default = "default_summary")]
    pub summary: String,
}

fn default_timezone_offset() -> i32 {
    1
}

fn default_summary() -> String {
    "Online consultation".to_string()
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            timezone_offset: default_timezone_offset(),
            summary: default_summary(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_capacity")]
    pub capacity: usize,
    #[serde(default = "default_session_ttl")]
    pub ttl_minutes: u64,
}

fn default_session_capacity() -> usize {
    1000
}

fn default_session_ttl() -> u64 {
    24 * 60
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capacity: default_session_capacity(),
            ttl_minutes: default_session_ttl(),
        }
    }
}

impl Config {
    /// Load config: defaults → terminly.toml → env vars (env wins).
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| TerminError::Config(format!("failed to read config: {e}")))?;
            toml::from_str(&content)
                .map_err(|e| TerminError::Config(format!("failed to parse config: {e}")))?
        } else {
            Self::default()
        };

        // Override with env vars
        if let Ok(v) = std::env::var("TERMINLY_PORT") {
            if let Ok(port) = v.parse() {
                config.server.port = port;
            }
        }
        if let Ok(v) = std::env::var("TERMINLY_BOT_NAME") {
            config.bot.name = v;
        }
        if let Ok(v) = std::env::var("TERMINLY_LLM_API_KEY") {
            config.llm.api_key = v;
        }
        if let Ok(v) = std::env::var("TERMINLY_TWILIO_ACCOUNT_SID") {
            config.sms.account_sid = v;
        }
        if let Ok(v) = std::env::var("TERMINLY_TWILIO_AUTH_TOKEN") {
            config.sms.auth_token = v;
        }
        if let Ok(v) = std::env::var("TERMINLY_TWILIO_FROM") {
            config.sms.from_number = v;
        }
        if let Ok(v) = std::env::var("TERMINLY_GOOGLE_CLIENT_ID") {
            config.google.client_id = v;
        }
        if let Ok(v) = std::env::var("TERMINLY_GOOGLE_CLIENT_SECRET") {
            config.google.client_secret = v;
        }

        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            bot: BotConfig::default(),
            llm: LlmConfig::default(),
            sms: SmsConfig::default(),
            google: GoogleConfig::default(),
            booking: BookingConfig::default(),
            session: SessionConfig::default(),
        }
    }
}
