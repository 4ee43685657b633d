use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_SETTINGS_PATH, DEFAULT_SOURCE_PATH};
use crate::error::{IngestError, Result};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Postgres connection parameters, read from the environment (or `.env`).
#[derive(Clone, PartialEq)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl DbConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` uses the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| IngestError::Config(format!("{key} environment variable not set")))
        };

        let port_raw = require("DB_PORT")?;
        let port = port_raw.trim().parse::<u16>().map_err(|e| {
            IngestError::Config(format!("DB_PORT '{port_raw}' is not a valid port: {e}"))
        })?;

        Ok(Self {
            host: require("DB_HOST")?,
            port,
            database: require("DB_NAME")?,
            user: require("DB_USER")?,
            password: lookup("DB_PASSWORD").unwrap_or_default(),
        })
    }

    pub fn to_pg_config(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.database)
            .user(&self.user)
            .application_name("sales_ingest");
        if !self.password.is_empty() {
            config.password(&self.password);
        }
        config
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"********")
            .finish()
    }
}

/// Where cleaned rows are written
#[derive(Debug, Clone, PartialEq)]
pub enum DestinationConfig {
    Postgres(DbConfig),
    /// Local SQLite file with the same table contract
    Sqlite(PathBuf),
}

impl DestinationConfig {
    pub fn describe(&self) -> String {
        match self {
            DestinationConfig::Postgres(db) => {
                format!("postgres://{}@{}:{}/{}", db.user, db.host, db.port, db.database)
            }
            DestinationConfig::Sqlite(path) => format!("sqlite://{}", path.display()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    source: SourceSection,
    #[serde(default)]
    load: LoadSection,
    #[serde(default)]
    report: ReportSection,
}

#[derive(Debug, Default, Deserialize)]
struct SourceSection {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoadSection {
    batch_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ReportSection {
    dir: Option<PathBuf>,
}

/// Run settings: source file, batch size and optional report directory.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestSettings {
    pub source_path: PathBuf,
    pub batch_size: usize,
    pub report_dir: Option<PathBuf>,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from(DEFAULT_SOURCE_PATH),
            batch_size: DEFAULT_BATCH_SIZE,
            report_dir: None,
        }
    }
}

impl IngestSettings {
    /// Load settings from `path`, or from `ingest.toml` when present.
    /// An explicitly named file must exist; the default one is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (settings_path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_SETTINGS_PATH), false),
        };

        if !settings_path.exists() {
            if required {
                return Err(IngestError::Config(format!(
                    "Settings file '{}' not found",
                    settings_path.display()
                )));
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&settings_path).map_err(|e| {
            IngestError::Config(format!(
                "Failed to read settings file '{}': {}",
                settings_path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: SettingsFile = toml::from_str(content)?;
        let defaults = Self::default();
        let settings = Self {
            source_path: file.source.path.unwrap_or(defaults.source_path),
            batch_size: file.load.batch_size.unwrap_or(defaults.batch_size),
            report_dir: file.report.dir,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(IngestError::Config("batch_size must be at least 1".to_string()));
        }
        Ok(())
    }
}
