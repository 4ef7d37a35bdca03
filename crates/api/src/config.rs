use domain::detection::{AlertRule, ObjectExtractor, RuleTable, DEFAULT_DISTANCE_WINDOW};
use domain::error::ConfigurationError;
use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    /// Email service configuration
    #[serde(default)]
    pub email: EmailConfig,
    /// Vision model (Ollama) configuration
    #[serde(default)]
    pub vision: VisionConfig,
    /// Alert detection tables
    #[serde(default)]
    pub detection: DetectionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound for a whole request, including the vision model call.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Camera frames arrive base64 encoded in the JSON body.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn pool_config(&self) -> persistence::db::DatabaseConfig {
        persistence::db::DatabaseConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            connect_timeout_secs: self.connect_timeout_secs,
            idle_timeout_secs: self.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Analysis requests allowed per user per minute. 0 disables the limit.
    #[serde(default = "default_analyze_rate_limit")]
    pub analyze_rate_limit_per_minute: u32,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    90
}
fn default_max_body_size() -> usize {
    10 * 1024 * 1024
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_analyze_rate_limit() -> u32 {
    10
}

/// Email service configuration for alert notifications.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Whether email sending is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Email provider: sendgrid, or console (for development)
    #[serde(default = "default_email_provider")]
    pub provider: String,

    /// SendGrid API key (for sendgrid provider)
    #[serde(default)]
    pub sendgrid_api_key: String,

    /// SendGrid API base URL
    #[serde(default = "default_sendgrid_url")]
    pub sendgrid_url: String,

    /// Sender email address (From header)
    #[serde(default = "default_sender_email")]
    pub sender_email: String,

    /// Sender name (From header)
    #[serde(default = "default_sender_name")]
    pub sender_name: String,

    /// Base URL for the dashboard link in alert emails
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Email template style: html or plain
    #[serde(default = "default_template_style")]
    pub template_style: String,

    /// Per-email HTTP timeout
    #[serde(default = "default_email_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_email_provider(),
            sendgrid_api_key: String::new(),
            sendgrid_url: default_sendgrid_url(),
            sender_email: default_sender_email(),
            sender_name: default_sender_name(),
            base_url: default_base_url(),
            template_style: default_template_style(),
            timeout_secs: default_email_timeout(),
        }
    }
}

fn default_email_provider() -> String {
    "console".to_string()
}

fn default_sendgrid_url() -> String {
    "https://api.sendgrid.com".to_string()
}

fn default_sender_email() -> String {
    "alerts@drishti.app".to_string()
}

fn default_sender_name() -> String {
    "Drishti Alerts".to_string()
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_template_style() -> String {
    "html".to_string()
}

fn default_email_timeout() -> u64 {
    10
}

/// Vision model configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct VisionConfig {
    /// Ollama base URL
    #[serde(default = "default_vision_url")]
    pub url: String,

    /// Model name, e.g. llava:7b
    #[serde(default = "default_vision_model")]
    pub model: String,

    #[serde(default = "default_vision_timeout")]
    pub timeout_secs: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            url: default_vision_url(),
            model: default_vision_model(),
            timeout_secs: default_vision_timeout(),
        }
    }
}

fn default_vision_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_vision_model() -> String {
    "llava:7b".to_string()
}

fn default_vision_timeout() -> u64 {
    60
}

/// Alert detection configuration.
///
/// An empty `rules` list selects the built-in critical/high/medium table.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    #[serde(default = "default_distance_window")]
    pub distance_window: usize,

    #[serde(default)]
    pub rules: Vec<AlertRule>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            distance_window: default_distance_window(),
            rules: Vec::new(),
        }
    }
}

fn default_distance_window() -> usize {
    DEFAULT_DISTANCE_WINDOW
}

impl DetectionConfig {
    /// Builds the validated rule table.
    pub fn rule_table(&self) -> Result<RuleTable, ConfigurationError> {
        if self.rules.is_empty() {
            return Ok(RuleTable::standard());
        }
        RuleTable::new(self.rules.clone())
    }

    /// Compiles the object extractor.
    pub fn object_extractor(&self) -> Result<ObjectExtractor, ConfigurationError> {
        ObjectExtractor::new(self.distance_window)
    }
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Invalid detection configuration: {0}")]
    Detection(#[from] ConfigurationError),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with DRISHTI__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("DRISHTI").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Built entirely from embedded defaults and overrides, without config files.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 90
            max_body_size = 10485760

            [database]
            url = ""
            max_connections = 20
            min_connections = 5
            connect_timeout_secs = 10
            idle_timeout_secs = 600

            [logging]
            level = "info"
            format = "json"

            [security]
            cors_origins = []
            analyze_rate_limit_per_minute = 10

            [email]
            enabled = false
            provider = "console"
            sender_email = "test@example.com"
            sender_name = "Test"

            [vision]
            url = "http://localhost:11434"
            model = "llava:7b"
            timeout_secs = 60

            [detection]
            distance_window = 200
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        // Skip validation in tests to allow partial configs
        Ok(cfg)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "DRISHTI__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.vision.url.trim().is_empty() || self.vision.model.trim().is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "vision.url and vision.model must be set".to_string(),
            ));
        }

        if self.email.enabled
            && self.email.provider == "sendgrid"
            && self.email.sendgrid_api_key.is_empty()
        {
            return Err(ConfigValidationError::MissingRequired(
                "email.sendgrid_api_key is required for the sendgrid provider".to_string(),
            ));
        }

        self.detection.rule_table()?;
        self.detection.object_extractor()?;

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
