//! Application configuration.
//!
//! Built once at start-up from defaults, an optional TOML file,
//! `FEEDBACK__SECTION__KEY` environment variables and the plain secret
//! variables (`GEMINI_API_KEY`, `DB_HOST`, ...), then handed to whatever
//! needs it. Nothing reads the environment after this point.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Result;

const DEFAULT_CONFIG_FILE: &str = "feedback";

/// Plain environment variables mapped onto config keys.
const SECRET_VARS: [(&str, &str); 6] = [
    ("GEMINI_API_KEY", "gemini.api_key"),
    ("DB_HOST", "database.host"),
    ("DB_PORT", "database.port"),
    ("DB_USER", "database.user"),
    ("DB_PASSWORD", "database.password"),
    ("DB_NAME", "database.name"),
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub gemini: GeminiConfig,
    pub form: FormPolicy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Csv,
    Sqlite,
    Mysql,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub csv_path: PathBuf,
    pub sqlite_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Csv,
            csv_path: PathBuf::from("feedback.csv"),
            sqlite_url: "sqlite://feedback.db".to_string(),
        }
    }
}

/// MySQL connection settings, used when `storage.backend = "mysql"`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: String::new(),
            name: "feedback_db".to_string(),
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .finish()
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            timeout_secs: 60,
        }
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Which submission fields must be non-blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FormPolicy {
    pub require_name: bool,
    pub require_comments: bool,
}

impl Default for FormPolicy {
    fn default() -> Self {
        Self {
            require_name: false,
            require_comments: true,
        }
    }
}

impl AppConfig {
    /// Loads configuration from `path` (or `feedback.toml` if present) and the
    /// process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        builder = match path {
            Some(path) => builder.add_source(File::from(path)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };
        builder = builder.add_source(Environment::with_prefix("FEEDBACK").separator("__"));

        for (var, key) in SECRET_VARS {
            builder = builder.set_override_option(key, std::env::var(var).ok())?;
        }

        Self::build(builder)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(source: &str) -> AppConfig {
        let builder = Config::builder().add_source(File::from_str(source, FileFormat::Toml));
        AppConfig::build(builder).expect("config should parse")
    }

    #[test]
    fn empty_source_uses_defaults() {
        let config = from_toml("");

        assert_eq!(config.bind_address(), ("127.0.0.1".to_string(), 8080));
        assert_eq!(config.storage.backend, StorageBackend::Csv);
        assert_eq!(config.storage.csv_path, PathBuf::from("feedback.csv"));
        assert_eq!(config.database.port, 3306);
        assert_eq!(config.gemini.model, "gemini-2.5-flash");
        assert!(config.gemini.api_key.is_none());
        assert_eq!(config.form, FormPolicy::default());
    }

    #[test]
    fn toml_sections_override_defaults() {
        let config = from_toml(
            r#"
            [server]
            port = 9000

            [storage]
            backend = "mysql"

            [database]
            host = "db.internal"
            name = "school"

            [gemini]
            api_key = "secret-key"

            [form]
            require_name = true
            require_comments = false
            "#,
        );

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.storage.backend, StorageBackend::Mysql);
        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.name, "school");
        assert_eq!(config.database.user, "root");
        assert_eq!(config.gemini.api_key.as_deref(), Some("secret-key"));
        assert!(config.form.require_name);
        assert!(!config.form.require_comments);
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = from_toml(
            r#"
            [database]
            password = "hunter2"

            [gemini]
            api_key = "secret-key"
            "#,
        );

        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let builder = Config::builder()
            .add_source(File::from_str("[storage]\nbackend = \"postgres\"", FileFormat::Toml));
        assert!(AppConfig::build(builder).is_err());
    }
}
