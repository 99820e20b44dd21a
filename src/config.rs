use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Public site root used to build canonical article links.
    #[serde(default = "default_site_url")]
    pub site_url: String,

    pub gemini_api_key: Option<String>,

    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    #[serde(default = "default_gemini_api_base")]
    pub gemini_api_base: String,

    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,

    pub resend_api_key: Option<String>,

    #[serde(default = "default_resend_api_base")]
    pub resend_api_base: String,

    #[serde(default = "default_alert_from_email")]
    pub alert_from_email: String,

    #[serde(default = "default_max_items_per_source")]
    pub max_items_per_source: usize,

    #[serde(default = "default_rewrite_delay_ms")]
    pub rewrite_delay_ms: u64,

    #[serde(default = "default_stale_after_minutes")]
    pub stale_after_minutes: i64,

    #[serde(default = "default_auto_post")]
    pub auto_post_on_publish: bool,

    /// Allowed browser origins for the admin dashboard. Empty allows any.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("seithi");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("seithi.db").to_string_lossy().to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_site_url() -> String {
    "https://seithi.example.com".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_gemini_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_resend_api_base() -> String {
    "https://api.resend.com".to_string()
}

fn default_alert_from_email() -> String {
    "alerts@seithi.example.com".to_string()
}

fn default_max_items_per_source() -> usize {
    10
}

fn default_rewrite_delay_ms() -> u64 {
    1000
}

fn default_stale_after_minutes() -> i64 {
    30
}

fn default_auto_post() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            bind_addr: default_bind_addr(),
            site_url: default_site_url(),
            gemini_api_key: None,
            gemini_model: default_gemini_model(),
            gemini_api_base: default_gemini_api_base(),
            webhook_url: None,
            webhook_secret: None,
            resend_api_key: None,
            resend_api_base: default_resend_api_base(),
            alert_from_email: default_alert_from_email(),
            max_items_per_source: default_max_items_per_source(),
            rewrite_delay_ms: default_rewrite_delay_ms(),
            stale_after_minutes: default_stale_after_minutes(),
            auto_post_on_publish: default_auto_post(),
            cors_origins: Vec::new(),
        }
    }
}

impl Config {
    /// Load the config file (creating it with defaults on first run), then
    /// apply environment overrides. Secrets normally arrive via the environment.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("DATABASE_PATH") {
            self.db_path = v;
        }
        if let Some(v) = get("BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = get("SITE_URL") {
            self.site_url = v;
        }
        if let Some(v) = get("GEMINI_API_KEY") {
            self.gemini_api_key = Some(v);
        }
        if let Some(v) = get("GEMINI_MODEL") {
            self.gemini_model = v;
        }
        if let Some(v) = get("GEMINI_API_BASE") {
            self.gemini_api_base = v;
        }
        if let Some(v) = get("WEBHOOK_URL") {
            self.webhook_url = Some(v);
        }
        if let Some(v) = get("WEBHOOK_SECRET") {
            self.webhook_secret = Some(v);
        }
        if let Some(v) = get("RESEND_API_KEY") {
            self.resend_api_key = Some(v);
        }
        if let Some(v) = get("RESEND_API_BASE") {
            self.resend_api_base = v;
        }
        if let Some(v) = get("ALERT_FROM_EMAIL") {
            self.alert_from_email = v;
        }
        if let Some(v) = get("MAX_ITEMS_PER_SOURCE") {
            self.max_items_per_source = parse_number("MAX_ITEMS_PER_SOURCE", &v)?;
        }
        if let Some(v) = get("REWRITE_DELAY_MS") {
            self.rewrite_delay_ms = parse_number("REWRITE_DELAY_MS", &v)?;
        }
        if let Some(v) = get("STALE_AFTER_MINUTES") {
            self.stale_after_minutes = parse_number("STALE_AFTER_MINUTES", &v)?;
        }
        if let Some(v) = get("AUTO_POST_ON_PUBLISH") {
            self.auto_post_on_publish = matches!(v.trim(), "1" | "true" | "yes");
        }
        if let Some(v) = get("CORS_ORIGINS") {
            self.cors_origins = v
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        Ok(())
    }

    pub fn require_gemini_key(&self) -> Result<&str> {
        self.gemini_api_key
            .as_deref()
            .ok_or_else(|| AppError::not_configured("GEMINI_API_KEY"))
    }

    pub fn require_resend_key(&self) -> Result<&str> {
        self.resend_api_key
            .as_deref()
            .ok_or_else(|| AppError::not_configured("RESEND_API_KEY"))
    }

    /// Relay URL and shared secret, or `None` when either is missing.
    pub fn webhook(&self) -> Option<(&str, &str)> {
        match (self.webhook_url.as_deref(), self.webhook_secret.as_deref()) {
            (Some(url), Some(secret)) => Some((url, secret)),
            _ => None,
        }
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("seithi")
            .join("config.toml")
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{} must be a number, got {:?}", key, value)))
}
