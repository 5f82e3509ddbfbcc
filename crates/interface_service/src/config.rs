//! Service configuration

use std::time::Duration;

use serde::Deserialize;

use core_kernel::CoreError;
use domain_claims::WorkflowConfig;
use infra_db::DatabaseConfig;

/// Environment variable prefix, e.g. `CLAIMS_DATABASE_URL`
pub const ENV_PREFIX: &str = "CLAIMS";

/// Service configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// PostgreSQL connection string
    pub database_url: String,
    /// Upper bound of the connection pool
    pub db_max_connections: u32,
    /// Connections kept open while the service is idle
    pub db_min_connections: u32,
    /// Seconds an operation waits for a pooled connection
    pub db_connect_timeout_secs: u64,
    pub db_idle_timeout_secs: u64,
    pub db_max_lifetime_secs: u64,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones
    pub log_json: bool,
    /// Seconds between pending-approval reminder sweeps
    pub reminder_interval_secs: u64,
    /// Sender address on outbound mail
    pub mail_from: String,
    /// Maximum remark length in characters
    pub remark_max_len: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/claims".to_string(),
            db_max_connections: DatabaseConfig::DEFAULT_MAX_CONNECTIONS,
            db_min_connections: DatabaseConfig::DEFAULT_MIN_CONNECTIONS,
            db_connect_timeout_secs: DatabaseConfig::DEFAULT_CONNECT_TIMEOUT.as_secs(),
            db_idle_timeout_secs: DatabaseConfig::DEFAULT_IDLE_TIMEOUT.as_secs(),
            db_max_lifetime_secs: DatabaseConfig::DEFAULT_MAX_LIFETIME.as_secs(),
            log_level: "info".to_string(),
            log_json: false,
            reminder_interval_secs: 24 * 60 * 60,
            mail_from: "claims@localhost".to_string(),
            remark_max_len: WorkflowConfig::default().remark_max_len,
        }
    }
}

impl ServiceConfig {
    /// Loads configuration from `CLAIMS_*` environment variables
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(config::Environment::with_prefix(ENV_PREFIX))
    }

    fn from_environment(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(environment.try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Rejects values the service cannot run with
    pub fn validate(&self) -> Result<(), CoreError> {
        self.database()
            .validate()
            .map_err(|e| CoreError::configuration(e.to_string()))?;
        if self.reminder_interval_secs == 0 {
            return Err(CoreError::configuration("reminder_interval_secs must be at least 1"));
        }
        if !self.mail_from.contains('@') {
            return Err(CoreError::configuration(format!(
                "mail_from {:?} is not an address",
                self.mail_from
            )));
        }
        if self.remark_max_len == 0 {
            return Err(CoreError::configuration("remark_max_len must be at least 1"));
        }
        Ok(())
    }

    /// Pool settings from the `CLAIMS_DB_*` variables
    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig::new(&self.database_url)
            .max_connections(self.db_max_connections)
            .min_connections(self.db_min_connections)
            .connect_timeout(Duration::from_secs(self.db_connect_timeout_secs))
            .idle_timeout(Duration::from_secs(self.db_idle_timeout_secs))
            .max_lifetime(Duration::from_secs(self.db_max_lifetime_secs))
    }

    pub fn reminder_interval(&self) -> Duration {
        Duration::from_secs(self.reminder_interval_secs)
    }

    pub fn workflow(&self) -> WorkflowConfig {
        WorkflowConfig {
            remark_max_len: self.remark_max_len,
        }
    }
}
