use crate::types::{MonitorError, Result, ScrapeConfig};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use url::Url;

pub const VALID_LOG_LEVELS: [&str; 5] = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailProvider {
    Smtp,
    Webhook,
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub use_tls: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_max_tokens: u32,
    pub email_provider: EmailProvider,
    pub smtp: SmtpSettings,
    pub email_from: Option<String>,
    pub email_recipients: Vec<String>,
    pub webhook_url: Option<String>,
    pub scrape: ScrapeConfig,
    pub manual_sites_file: PathBuf,
    pub debug: bool,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub json_logging: bool,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub rate_limit_requests: u32,
    pub rate_limit_window_seconds: u64,
    pub local_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:media_monitoring.db".to_string(),
            gemini_api_key: None,
            gemini_model: "gemini-1.5-flash".to_string(),
            gemini_max_tokens: 8000,
            email_provider: EmailProvider::Smtp,
            smtp: SmtpSettings {
                host: None,
                port: 587,
                username: None,
                password: None,
                use_tls: true,
            },
            email_from: None,
            email_recipients: Vec::new(),
            webhook_url: None,
            scrape: ScrapeConfig::default(),
            manual_sites_file: PathBuf::from("manual_sites.txt"),
            debug: false,
            log_level: "INFO".to_string(),
            log_file: None,
            json_logging: false,
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_requests: 100,
            rate_limit_window_seconds: 3600,
            local_mode: false,
        }
    }
}

impl Config {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; unset or blank keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Config::default();

        if let Some(v) = get("DATABASE_URL") {
            config.database_url = v;
        }
        config.gemini_api_key = get("GEMINI_API_KEY");
        if let Some(v) = get("GEMINI_MODEL") {
            config.gemini_model = v;
        }
        if let Some(v) = get("GEMINI_MAX_TOKENS") {
            config.gemini_max_tokens = parse_number("GEMINI_MAX_TOKENS", &v)?;
        }

        if let Some(v) = get("EMAIL_PROVIDER") {
            config.email_provider = match v.to_lowercase().as_str() {
                "smtp" => EmailProvider::Smtp,
                "webhook" => EmailProvider::Webhook,
                other => return Err(MonitorError::Config(format!("Unknown EMAIL_PROVIDER '{}'", other))),
            };
        }
        config.smtp.host = get("SMTP_HOST");
        if let Some(v) = get("SMTP_PORT") {
            config.smtp.port = parse_number("SMTP_PORT", &v)?;
        }
        config.smtp.username = get("SMTP_USERNAME");
        config.smtp.password = get("SMTP_PASSWORD");
        if let Some(v) = get("SMTP_USE_TLS") {
            config.smtp.use_tls = parse_bool("SMTP_USE_TLS", &v)?;
        }
        config.email_from = get("EMAIL_FROM");
        if let Some(v) = get("EMAIL_RECIPIENTS") {
            config.email_recipients = split_list(&v);
        }
        config.webhook_url = get("N8N_WEBHOOK_URL");

        if let Some(v) = get("SCRAPING_TIMEOUT") {
            config.scrape.timeout_seconds = parse_number("SCRAPING_TIMEOUT", &v)?;
        }
        if let Some(v) = get("SCRAPING_MAX_RETRIES") {
            config.scrape.max_retries = parse_number("SCRAPING_MAX_RETRIES", &v)?;
        }
        if let Some(v) = get("SCRAPING_USER_AGENT") {
            config.scrape.user_agent = v;
        }
        if let Some(v) = get("MANUAL_SITES_FILE") {
            config.manual_sites_file = PathBuf::from(v);
        }

        if let Some(v) = get("DEBUG") {
            config.debug = parse_bool("DEBUG", &v)?;
        }
        if let Some(v) = get("LOG_LEVEL") {
            config.log_level = v.to_uppercase();
        }
        config.log_file = get("LOG_FILE").map(PathBuf::from);
        if let Some(v) = get("ENABLE_JSON_LOGGING") {
            config.json_logging = parse_bool("ENABLE_JSON_LOGGING", &v)?;
        }

        if let Some(v) = get("HOST") {
            config.host = v;
        }
        if let Some(v) = get("PORT") {
            config.port = parse_number("PORT", &v)?;
        }
        if let Some(v) = get("CORS_ORIGINS") {
            config.cors_origins = split_list(&v);
        }
        if let Some(v) = get("RATE_LIMIT_REQUESTS") {
            config.rate_limit_requests = parse_number("RATE_LIMIT_REQUESTS", &v)?;
        }
        if let Some(v) = get("RATE_LIMIT_WINDOW") {
            config.rate_limit_window_seconds = parse_number("RATE_LIMIT_WINDOW", &v)?;
        }
        if let Some(v) = get("LOCAL_MODE") {
            config.local_mode = parse_bool("LOCAL_MODE", &v)?;
        }

        Ok(config)
    }

    /// Reject settings the service cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(MonitorError::Config("PORT must be between 1 and 65535".to_string()));
        }
        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(MonitorError::Config(format!(
                "LOG_LEVEL must be one of {}",
                VALID_LOG_LEVELS.join(", ")
            )));
        }
        if self.rate_limit_requests == 0 || self.rate_limit_window_seconds == 0 {
            return Err(MonitorError::Config("Rate limit settings must be positive".to_string()));
        }
        if let Some(webhook) = &self.webhook_url {
            let parsed = Url::parse(webhook).map_err(|e| MonitorError::Config(format!("N8N_WEBHOOK_URL is invalid: {}", e)))?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(MonitorError::Config("N8N_WEBHOOK_URL must use http or https".to_string()));
            }
        }

        if self.local_mode {
            return Ok(());
        }

        if self.gemini_api_key.is_none() {
            return Err(MonitorError::Config("GEMINI_API_KEY is required unless LOCAL_MODE is enabled".to_string()));
        }
        match self.email_provider {
            EmailProvider::Webhook if self.webhook_url.is_none() => Err(MonitorError::Config(
                "EMAIL_PROVIDER=webhook requires N8N_WEBHOOK_URL".to_string(),
            )),
            EmailProvider::Smtp if self.webhook_url.is_none() && (self.smtp.host.is_none() || self.email_from.is_none()) => {
                Err(MonitorError::Config(
                    "Report delivery needs N8N_WEBHOOK_URL, or SMTP_HOST and EMAIL_FROM".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Settings safe to log or expose: secrets replaced with a marker.
    pub fn masked(&self) -> Value {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "***".to_string());
        json!({
            "database_url": self.database_url,
            "gemini_api_key": mask(&self.gemini_api_key),
            "gemini_model": self.gemini_model,
            "gemini_max_tokens": self.gemini_max_tokens,
            "email_provider": match self.email_provider {
                EmailProvider::Smtp => "smtp",
                EmailProvider::Webhook => "webhook",
            },
            "smtp_host": self.smtp.host,
            "smtp_port": self.smtp.port,
            "smtp_username": self.smtp.username,
            "smtp_password": mask(&self.smtp.password),
            "email_from": self.email_from,
            "email_recipients": self.email_recipients,
            "webhook_url": mask(&self.webhook_url),
            "scraping_timeout": self.scrape.timeout_seconds,
            "scraping_max_retries": self.scrape.max_retries,
            "debug": self.debug,
            "log_level": self.log_level,
            "json_logging": self.json_logging,
            "host": self.host,
            "port": self.port,
            "cors_origins": self.cors_origins,
            "rate_limit_requests": self.rate_limit_requests,
            "rate_limit_window": self.rate_limit_window_seconds,
            "local_mode": self.local_mode,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| MonitorError::Config(format!("{} must be a number, got '{}'", key, value)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(MonitorError::Config(format!("{} must be a boolean, got '{}'", key, value))),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lowercase a host and drop a leading `www.`.
pub fn normalize_domain(domain: &str) -> String {
    let lowered = domain.trim().to_lowercase();
    match lowered.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => lowered,
    }
}

pub fn parse_manual_sites(contents: &str) -> HashSet<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(normalize_domain)
        .collect()
}

/// Load the domains that always need manual handling. A missing file means none.
pub fn load_manual_sites(path: &Path) -> Result<HashSet<String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let sites = parse_manual_sites(&contents);
            info!("Loaded {} manual processing domains from {}", sites.len(), path.display());
            Ok(sites)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Manual sites file {} not found, no domains require manual processing", path.display());
            Ok(HashSet::new())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.scrape.max_retries, 3);
        assert_eq!(config.scrape.timeout_seconds, 30);
        assert_eq!(config.gemini_model, "gemini-1.5-flash");
        assert_eq!(config.cors_origins, vec!["*"]);
        assert!(!config.local_mode);
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "9000"),
            ("LOCAL_MODE", "true"),
            ("EMAIL_RECIPIENTS", "a@example.com, b@example.com"),
            ("LOG_LEVEL", "debug"),
            ("CORS_ORIGINS", "http://localhost:3000,https://app.example.com"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9000);
        assert!(config.local_mode);
        assert_eq!(config.email_recipients, vec!["a@example.com", "b@example.com"]);
        assert_eq!(config.log_level, "DEBUG");
        assert_eq!(config.cors_origins.len(), 2);
    }

    #[test]
    fn malformed_values_are_config_errors() {
        assert!(matches!(Config::from_lookup(lookup(&[("PORT", "http")])), Err(MonitorError::Config(_))));
        assert!(matches!(Config::from_lookup(lookup(&[("PORT", "70000")])), Err(MonitorError::Config(_))));
        assert!(matches!(Config::from_lookup(lookup(&[("DEBUG", "maybe")])), Err(MonitorError::Config(_))));
        assert!(matches!(Config::from_lookup(lookup(&[("EMAIL_PROVIDER", "pigeon")])), Err(MonitorError::Config(_))));
    }

    #[test]
    fn validation_requires_credentials_outside_local_mode() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let local = Config { local_mode: true, ..Config::default() };
        assert!(local.validate().is_ok());

        let live = Config {
            gemini_api_key: Some("key".to_string()),
            webhook_url: Some("https://relay.example.com/hook".to_string()),
            ..Config::default()
        };
        assert!(live.validate().is_ok());

        let bad_webhook = Config {
            webhook_url: Some("ftp://relay.example.com".to_string()),
            local_mode: true,
            ..Config::default()
        };
        assert!(bad_webhook.validate().is_err());

        let bad_level = Config { log_level: "LOUD".to_string(), local_mode: true, ..Config::default() };
        assert!(bad_level.validate().is_err());
    }

    #[test]
    fn masked_view_hides_secrets() {
        let config = Config {
            gemini_api_key: Some("super-secret".to_string()),
            ..Config::default()
        };
        let masked = config.masked().to_string();
        assert!(!masked.contains("super-secret"));
        assert!(masked.contains("***"));
    }

    #[test]
    fn manual_sites_are_normalized() {
        let sites = parse_manual_sites("# paywalled\nWWW.FT.com\n\n  thetimes.co.uk  \n# end\n");
        assert_eq!(sites.len(), 2);
        assert!(sites.contains("ft.com"));
        assert!(sites.contains("thetimes.co.uk"));
    }

    #[test]
    fn missing_manual_sites_file_is_empty() {
        let sites = load_manual_sites(Path::new("/definitely/not/here/manual_sites.txt")).unwrap();
        assert!(sites.is_empty());
    }
}
