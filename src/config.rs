//! Configuration types for the Code Quest server.

use codequest_search::{FailurePolicy, SearchConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the TOML config file.
pub const CONFIG_PATH_ENV: &str = "CODEQUEST_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Upstream search settings.
    pub search: SearchConfig,
    /// Digest email settings.
    pub mail: MailConfig,
    /// Log filter and optional log file.
    pub logging: LoggingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5000,
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Digest email configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// `From` address for digests. Sending fails while this is unset.
    pub default_sender: Option<String>,
    /// Pickup directory the outbox transport writes `.eml` files into.
    pub outbox_dir: PathBuf,
    /// Subject prefix placed before the quoted query.
    pub subject_prefix: String,
    /// SMTP relay. When unset, digests go to the outbox directory.
    pub smtp: Option<SmtpConfig>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            default_sender: None,
            outbox_dir: PathBuf::from("outbox"),
            subject_prefix: "Code Quest Search Results for".into(),
            smtp: None,
        }
    }
}

/// SMTP relay settings.
///
/// `use_ssl` selects implicit TLS (usually port 465) and wins over
/// `use_tls`, which selects STARTTLS. With neither, the connection is
/// plaintext.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub use_tls: bool,
    pub use_ssl: bool,
    pub username: Option<String>,
    /// Never written back by [`AppConfig::save_to_file`].
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            server: "smtp.gmail.com".into(),
            port: 587,
            use_tls: true,
            use_ssl: false,
            username: None,
            password: None,
            timeout_seconds: 30,
        }
    }
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("use_tls", &self.use_tls)
            .field("use_ssl", &self.use_ssl)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive; `RUST_LOG` takes precedence.
    pub filter: String,
    /// Also append logs to this file. An empty path turns file logging off.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "codequest=info,codequest_search=info".into(),
            file: Some(PathBuf::from("app.log")),
        }
    }
}

impl LoggingConfig {
    /// The log file, if file logging is on.
    pub fn file_path(&self) -> Option<&Path> {
        self.file
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }
}

/// Load `.env` from the working directory or its ancestors into the process
/// environment, returning the file that was read.
///
/// Call before [`AppConfig::load`]; the result is returned rather than
/// logged because logging is configured from the loaded config.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

impl AppConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::AppError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load the file named by `CODEQUEST_CONFIG` (if any), then apply
    /// environment overrides, then validate. See [`load_dotenv`] for `.env`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded, an override has
    /// an unparsable value, or the result fails validation.
    pub fn load() -> crate::error::Result<Self> {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.search.validate()?;
        Ok(config)
    }

    /// Apply the recognised environment variables through `lookup`.
    ///
    /// Empty values are ignored. `MAIL_USERNAME` is used as the sender when
    /// `MAIL_DEFAULT_SENDER` is absent.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::AppError::Config`] for an unparsable port or
    /// failure policy.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> crate::error::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("STACKOVERFLOW_KEY") {
            self.search.stackoverflow.api_key = Some(key);
        }
        if let Some(identity) = get("REDDIT_USERNAME") {
            self.search.reddit.identity = identity;
        }
        if let Some(sender) = get("MAIL_DEFAULT_SENDER").or_else(|| get("MAIL_USERNAME")) {
            self.mail.default_sender = Some(sender);
        }
        if let Some(server) = get("MAIL_SERVER") {
            self.mail.smtp.get_or_insert_with(SmtpConfig::default).server = server;
        }
        if let Some(smtp) = self.mail.smtp.as_mut() {
            if let Some(port) = get("MAIL_PORT") {
                smtp.port = port.trim().parse().map_err(|e| {
                    crate::error::AppError::Config(format!("MAIL_PORT {port:?}: {e}"))
                })?;
            }
            if let Some(flag) = get("MAIL_USE_TLS") {
                smtp.use_tls = parse_flag("MAIL_USE_TLS", &flag)?;
            }
            if let Some(flag) = get("MAIL_USE_SSL") {
                smtp.use_ssl = parse_flag("MAIL_USE_SSL", &flag)?;
            }
            if let Some(username) = get("MAIL_USERNAME") {
                smtp.username = Some(username);
            }
            if let Some(password) = get("MAIL_PASSWORD") {
                smtp.password = Some(password);
            }
        }
        if let Some(dir) = get("CODEQUEST_OUTBOX_DIR") {
            self.mail.outbox_dir = PathBuf::from(dir);
        }
        if let Some(host) = get("CODEQUEST_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("CODEQUEST_PORT") {
            self.server.port = port.trim().parse().map_err(|e| {
                crate::error::AppError::Config(format!("CODEQUEST_PORT {port:?}: {e}"))
            })?;
        }
        if let Some(file) = get("CODEQUEST_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(file));
        }
        if let Some(policy) = get("CODEQUEST_FAILURE_POLICY") {
            self.search.failure_policy = parse_failure_policy(&policy)?;
        }
        Ok(())
    }
}

fn parse_flag(key: &str, value: &str) -> crate::error::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(crate::error::AppError::Config(format!(
            "{key} {other:?}: expected True or False"
        ))),
    }
}

fn parse_failure_policy(value: &str) -> crate::error::Result<FailurePolicy> {
    match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "all_or_nothing" => Ok(FailurePolicy::AllOrNothing),
        "partial" => Ok(FailurePolicy::Partial),
        other => Err(crate::error::AppError::Config(format!(
            "unknown failure policy {other:?} (expected all_or_nothing or partial)"
        ))),
    }
}
