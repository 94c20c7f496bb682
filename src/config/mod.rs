use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub booking: BookingConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
    #[serde(default)]
    pub cron: CronConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Base URL used when rendering links in outgoing emails
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
            public_url: default_public_url(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_public_url() -> String {
    "http://localhost:8080".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session lifetime in days
    #[serde(default = "default_session_days")]
    pub session_days: i64,
    /// Verification token lifetime in hours
    #[serde(default = "default_verification_hours")]
    pub verification_hours: i64,
    /// Password reset token lifetime in minutes
    #[serde(default = "default_reset_minutes")]
    pub reset_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_days: default_session_days(),
            verification_hours: default_verification_hours(),
            reset_minutes: default_reset_minutes(),
        }
    }
}

fn default_session_days() -> i64 {
    7
}

fn default_verification_hours() -> i64 {
    24
}

fn default_reset_minutes() -> i64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
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

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default = "default_smtp_tls")]
    pub smtp_tls: bool,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub from_address: Option<String>,
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_tls: default_smtp_tls(),
            smtp_username: None,
            smtp_password: None,
            from_address: None,
            from_name: default_from_name(),
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_tls() -> bool {
    true
}

fn default_from_name() -> String {
    "Rentr".to_string()
}

impl EmailConfig {
    /// Email sending requires at least a host and a from address
    pub fn is_configured(&self) -> bool {
        self.smtp_host.is_some() && self.from_address.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentConfig {
    /// Base URL of the payment gateway API
    pub base_url: Option<String>,
    /// Server key used for gateway basic auth and webhook signatures (HMAC-SHA512)
    pub server_key: Option<String>,
}

impl PaymentConfig {
    pub fn is_configured(&self) -> bool {
        self.base_url.is_some() && self.server_key.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    /// Minutes a new booking may stay unpaid before auto-cancellation
    #[serde(default = "default_payment_deadline_minutes")]
    pub payment_deadline_minutes: i64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            payment_deadline_minutes: default_payment_deadline_minutes(),
        }
    }
}

fn default_payment_deadline_minutes() -> i64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Max payment-proof size in bytes
    #[serde(default = "default_proof_max_bytes")]
    pub proof_max_bytes: usize,
    /// Max listing-image size in bytes
    #[serde(default = "default_image_max_bytes")]
    pub image_max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            proof_max_bytes: default_proof_max_bytes(),
            image_max_bytes: default_image_max_bytes(),
        }
    }
}

fn default_proof_max_bytes() -> usize {
    1024 * 1024
}

fn default_image_max_bytes() -> usize {
    2 * 1024 * 1024
}

#[derive(Debug, Clone, Deserialize)]
pub struct CronConfig {
    /// Shared secret expected in the X-Cron-Secret header
    #[serde(default = "default_cron_secret")]
    pub secret: String,
}

impl Default for CronConfig {
    fn default() -> Self {
        Self {
            secret: default_cron_secret(),
        }
    }
}

fn default_cron_secret() -> String {
    // Generate a random secret if not provided
    uuid::Uuid::new_v4().to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| "Failed to parse configuration file")?;
            Ok(config)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }

    pub fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            logging: LoggingConfig::default(),
            email: EmailConfig::default(),
            payment: PaymentConfig::default(),
            booking: BookingConfig::default(),
            uploads: UploadConfig::default(),
            cron: CronConfig::default(),
        }
    }
}
