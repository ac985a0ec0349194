use serde::Deserialize;
use std::net::SocketAddr;

use domain::services::record_store::CollectionRef;
use shared::dates::BoundaryFormat;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    pub auth: AuthConfig,
    pub store: StoreConfig,
    pub email: EmailConfig,
    pub exports: ExportsConfig,
    #[serde(default)]
    pub retirement: RetirementConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
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
}

/// Internal service credential checked on the sensitive endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Expected value of the `X-API-Key` header. Empty means the
    /// sensitive endpoints refuse to operate.
    #[serde(default)]
    pub service_key: String,
}

/// Upstream record-store API: one application holding several
/// collections, bearer-token authenticated.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub base_url: String,

    /// Application-wide bearer credential.
    pub api_key: String,

    /// Separate credential for the users collection. Empty means the
    /// application-wide one is used.
    #[serde(default)]
    pub users_api_key: String,

    #[serde(default = "default_users_collection")]
    pub users_collection: String,

    #[serde(default = "default_transactions_collection")]
    pub transactions_collection: String,

    #[serde(default = "default_coupons_collection")]
    pub coupons_collection: String,

    #[serde(default = "default_statistics_collection")]
    pub statistics_collection: String,

    /// Page size for collection reads. Zero disables paging: one
    /// unpaginated GET per fetch.
    #[serde(default)]
    pub page_size: usize,

    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

impl StoreConfig {
    pub fn users(&self) -> CollectionRef {
        if self.users_api_key.is_empty() {
            CollectionRef::new(&self.users_collection)
        } else {
            CollectionRef::with_key(&self.users_collection, &self.users_api_key)
        }
    }

    pub fn transactions(&self) -> CollectionRef {
        CollectionRef::new(&self.transactions_collection)
    }

    pub fn coupons(&self) -> CollectionRef {
        CollectionRef::new(&self.coupons_collection)
    }

    pub fn statistics(&self) -> CollectionRef {
        CollectionRef::new(&self.statistics_collection)
    }
}

/// Transactional-email API used for bulk sends.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub api_url: String,

    #[serde(default)]
    pub api_key: String,

    /// Maximum recipients per send call.
    #[serde(default = "default_email_batch_size")]
    pub batch_size: usize,
}

/// Spreadsheet export behavior.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportsConfig {
    /// Directory export files are written to before streaming. They are
    /// deleted after the response is sent.
    #[serde(default = "default_exports_dir")]
    pub dir: String,

    /// Boundary format accepted by the transaction export. Endpoint
    /// revisions used different formats; this is explicit configuration,
    /// never auto-detected.
    #[serde(default = "default_transactions_boundary_format")]
    pub transactions_boundary_format: BoundaryFormat,

    /// Boundary format accepted by the user export.
    #[serde(default = "default_users_boundary_format")]
    pub users_boundary_format: BoundaryFormat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetirementConfig {
    /// Retain the original on any transaction-update failure, instead of
    /// the historical rule that a total authorization-class failure
    /// still deletes.
    #[serde(default)]
    pub strict: bool,

    /// Minimum age in days of a deletion intent before the sweep acts.
    #[serde(default = "default_deletion_intent_min_days")]
    pub deletion_intent_min_days: i64,
}

impl Default for RetirementConfig {
    fn default() -> Self {
        Self {
            strict: false,
            deletion_intent_min_days: default_deletion_intent_min_days(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_users_collection() -> String {
    "users".to_string()
}
fn default_transactions_collection() -> String {
    "transactions".to_string()
}
fn default_coupons_collection() -> String {
    "coupons".to_string()
}
fn default_statistics_collection() -> String {
    "statistics".to_string()
}
fn default_store_timeout() -> u64 {
    30
}
fn default_email_batch_size() -> usize {
    500
}
fn default_exports_dir() -> String {
    "exports".to_string()
}
fn default_transactions_boundary_format() -> BoundaryFormat {
    BoundaryFormat::DayMonthYear
}
fn default_users_boundary_format() -> BoundaryFormat {
    BoundaryFormat::Iso
}
fn default_deletion_intent_min_days() -> i64 {
    30
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with LR__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("LR").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Creates a config entirely from embedded defaults and overrides,
    /// without relying on config files (which may not be accessible
    /// during tests). Validation is skipped so partial configs work.
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "127.0.0.1"
            port = 0
            request_timeout_secs = 30

            [logging]
            level = "info"
            format = "text"

            [security]
            cors_origins = []

            [auth]
            service_key = "test-service-key"

            [store]
            base_url = "http://store.test"
            api_key = "test-store-key"
            users_collection = "users"
            transactions_collection = "transactions"
            coupons_collection = "coupons"
            statistics_collection = "statistics"
            page_size = 0
            timeout_secs = 5

            [email]
            api_url = "http://mail.test"
            api_key = "test-mail-key"
            batch_size = 500

            [exports]
            dir = "exports"
            transactions_boundary_format = "day-month-year"
            users_boundary_format = "iso"

            [retirement]
            strict = false
            deletion_intent_min_days = 30
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.store.base_url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "LR__STORE__BASE_URL environment variable must be set".to_string(),
            ));
        }
        if self.store.api_key.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "LR__STORE__API_KEY environment variable must be set".to_string(),
            ));
        }
        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }
        if self.email.batch_size == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "email.batch_size cannot be 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigValidationError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|_| {
                ConfigValidationError::InvalidValue(format!(
                    "Invalid listen address {}:{}",
                    self.server.host, self.server.port
                ))
            })
    }
}
