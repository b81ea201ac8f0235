use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::ConfigError;

pub const CURRENT_CONFIG_VERSION: &str = "v1";

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_database_file() -> String {
    "db.sqlite".to_string()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(default)]
pub struct Config {
    #[serde(alias = "configVersion")]
    pub config_version: String,
    pub host: String,
    /// `0` asks the OS for a free port.
    pub port: u16,
    /// File name inside the asset dir. Ignored when `DATABASE_URL` is set.
    #[serde(alias = "databaseFile")]
    pub database_file: String,
    /// Origins allowed by CORS. Empty allows any origin.
    #[serde(alias = "corsOrigins")]
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_raw(raw_config: &str) -> Self {
        match serde_json::from_str::<Config>(raw_config) {
            Ok(config) => config.normalized(),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse config (line {}, column {}): {}, using default",
                    e.line(),
                    e.column(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn normalized(mut self) -> Self {
        self.config_version = CURRENT_CONFIG_VERSION.to_string();

        let host = self.host.trim();
        self.host = if host.is_empty() {
            default_host()
        } else {
            host.to_string()
        };

        if self.database_file.trim().is_empty() {
            self.database_file = default_database_file();
        }

        let mut origins: Vec<String> = Vec::with_capacity(self.cors_origins.len());
        for origin in &self.cors_origins {
            let origin = origin.trim().trim_end_matches('/');
            if !origin.is_empty() && !origins.iter().any(|seen| seen == origin) {
                origins.push(origin.to_string());
            }
        }
        self.cors_origins = origins;

        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_file.contains(['/', '\\']) || self.database_file.contains("..") {
            return Err(ConfigError::ValidationError(format!(
                "database_file must be a bare file name, got '{}'",
                self.database_file
            )));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_version: CURRENT_CONFIG_VERSION.to_string(),
            host: default_host(),
            port: 0,
            database_file: default_database_file(),
            cors_origins: Vec::new(),
        }
    }
}
