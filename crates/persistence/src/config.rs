//! Connection and retry configuration.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CLOUDANT_URL` | http://localhost:5984 | Service URL |
//! | `CLOUDANT_USERNAME` | admin | Basic auth user |
//! | `CLOUDANT_PASSWORD` | pass | Basic auth password |
//! | `CLOUDANT_AUTH_TYPE` | COUCHDB_SESSION | `COUCHDB_SESSION`, `BASIC` or `IAM` |
//! | `ADMIN_PARTY` | false | Send no credentials (`true`, `yes`, `on`, `1`, any case) |
//! | `BINDING_CLOUDANT` | unset | JSON service binding overriding URL and credentials |
//! | `RECORDS_DATABASE` | pets | Database holding the records |
//! | `RETRY_COUNT` | 10 | Attempts per store call |
//! | `RETRY_DELAY` | 1s | Delay before the first retry; a bare number is seconds |
//! | `RETRY_BACKOFF` | 2 | Delay multiplier |
//! | `REQUEST_TIMEOUT` | 30s | Per-request timeout; a bare number is seconds |
//! | `LOG_LEVEL` | info | Log level |
//!
//! # Example
//!
//! ```rust
//! use recordstore_persistence::config::StoreConfig;
//!
//! let config = StoreConfig {
//!     database: "inventory".to_string(),
//!     retry_count: 3,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! assert_eq!(config.retry_policy().max_attempts, 3);
//! ```

use std::sync::LazyLock;
use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, ValueEnum};
use regex::Regex;
use serde::Deserialize;

use crate::error::ValidationError;
use crate::retry::RetryPolicy;

/// CouchDB database names: a lower-case letter, then lower-case letters,
/// digits or any of `_$()+-/`.
static DATABASE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z][a-z0-9_$()+/-]*$").expect("database name pattern is valid")
});

/// Parses a humantime duration such as `250ms` or `2m`. A bare integer is a
/// number of seconds.
fn parse_duration(value: &str) -> Result<Duration, humantime::DurationError> {
    match value.trim().parse::<u64>() {
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => humantime::parse_duration(value),
    }
}

/// How the client authenticates against the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[value(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthType {
    /// CouchDB user name and password.
    #[default]
    CouchdbSession,
    /// HTTP basic authentication.
    Basic,
    /// IBM Cloud IAM API key. Not supported.
    Iam,
}

/// Service credentials as published in a `BINDING_CLOUDANT` binding.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceBinding {
    /// Service URL.
    pub url: String,
    /// User name, if the binding carries one.
    #[serde(default)]
    pub username: Option<String>,
    /// Password, if the binding carries one.
    #[serde(default)]
    pub password: Option<String>,
    /// IAM API key. Parsed for completeness; IAM is not supported.
    #[serde(default)]
    pub apikey: Option<String>,
}

/// Store connection settings.
///
/// Built from environment variables with [`StoreConfig::from_env`], from
/// command-line arguments via [`clap::Parser`], or programmatically.
#[derive(Debug, Clone, Parser)]
#[command(name = "recordstore")]
pub struct StoreConfig {
    /// Service URL.
    #[arg(long, env = "CLOUDANT_URL", default_value = "http://localhost:5984")]
    pub url: String,

    /// User name for basic authentication.
    #[arg(long, env = "CLOUDANT_USERNAME", default_value = "admin")]
    pub username: String,

    /// Password for basic authentication.
    #[arg(long, env = "CLOUDANT_PASSWORD", default_value = "pass", hide_env_values = true)]
    pub password: String,

    /// Authentication scheme.
    #[arg(long, env = "CLOUDANT_AUTH_TYPE", value_enum, default_value = "COUCHDB_SESSION")]
    pub auth_type: AuthType,

    /// Connect without credentials.
    #[arg(
        long,
        env = "ADMIN_PARTY",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub admin_party: bool,

    /// JSON service binding; overrides the URL and credentials above.
    #[arg(long, env = "BINDING_CLOUDANT", hide_env_values = true)]
    pub binding: Option<String>,

    /// Database holding the records.
    #[arg(long, env = "RECORDS_DATABASE", default_value = "pets")]
    pub database: String,

    /// Attempts per store call, including the first.
    #[arg(long, env = "RETRY_COUNT", default_value = "10")]
    pub retry_count: u32,

    /// Delay before the first retry.
    #[arg(long, env = "RETRY_DELAY", default_value = "1s", value_parser = parse_duration)]
    pub retry_delay: Duration,

    /// Multiplier applied to the delay after each retry.
    #[arg(long, env = "RETRY_BACKOFF", default_value = "2")]
    pub retry_backoff: f64,

    /// Per-request timeout.
    #[arg(long, env = "REQUEST_TIMEOUT", default_value = "30s", value_parser = parse_duration)]
    pub request_timeout: Duration,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5984".to_string(),
            username: "admin".to_string(),
            password: "pass".to_string(),
            auth_type: AuthType::CouchdbSession,
            admin_party: false,
            binding: None,
            database: "pets".to_string(),
            retry_count: 10,
            retry_delay: Duration::from_secs(1),
            retry_backoff: 2.0,
            request_timeout: Duration::from_secs(30),
            log_level: "info".to_string(),
        }
    }
}

impl StoreConfig {
    /// Reads the configuration from environment variables only. Unset
    /// variables take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidConfiguration` naming the variable if
    /// any set variable does not parse.
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::try_parse_from(["recordstore"]).map_err(|err| {
            ValidationError::InvalidConfiguration {
                message: err.to_string().trim().to_string(),
            }
        })
    }

    /// Validates the configuration and returns every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let binding = match self.service_binding() {
            Ok(binding) => binding,
            Err(err) => {
                errors.push(err.to_string());
                None
            }
        };
        let url = binding.as_ref().map_or(self.url.as_str(), |b| b.url.as_str());
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(format!("Service URL must be http(s), got '{url}'"));
        }

        if self.auth_type == AuthType::Iam {
            errors.push("IAM authentication is not supported".to_string());
        }

        if !self.admin_party && self.username.trim().is_empty() && binding.is_none() {
            errors.push("Username cannot be empty unless ADMIN_PARTY is set".to_string());
        }

        if !DATABASE_NAME.is_match(&self.database) {
            errors.push(format!("Invalid database name '{}'", self.database));
        }

        if let Err(err) = self.retry_policy().validate() {
            errors.push(err.to_string());
        }

        if self.request_timeout.is_zero() {
            errors.push("Request timeout cannot be 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// The retry policy described by `RETRY_COUNT`, `RETRY_DELAY` and `RETRY_BACKOFF`.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_count, self.retry_delay, self.retry_backoff)
    }

    /// Parses `BINDING_CLOUDANT`, if set. A blank or empty-object binding
    /// counts as unset.
    pub fn service_binding(&self) -> Result<Option<ServiceBinding>, ValidationError> {
        let Some(raw) = self.binding.as_deref().map(str::trim) else {
            return Ok(None);
        };
        if raw.is_empty() || raw == "{}" {
            return Ok(None);
        }
        serde_json::from_str(raw)
            .map(Some)
            .map_err(|e| ValidationError::InvalidConfiguration {
                message: format!("BINDING_CLOUDANT is not a valid service binding: {e}"),
            })
    }

    /// Resolves URL and credentials into a CouchDB client configuration.
    #[cfg(feature = "couchdb")]
    pub fn couchdb_config(
        &self,
    ) -> Result<crate::backends::couchdb::CouchDbConfig, ValidationError> {
        use crate::backends::couchdb::{CouchDbAuth, CouchDbConfig};

        if self.auth_type == AuthType::Iam {
            return Err(ValidationError::InvalidConfiguration {
                message: "IAM authentication is not supported".to_string(),
            });
        }

        let binding = self.service_binding()?;
        let url = binding
            .as_ref()
            .map_or_else(|| self.url.clone(), |b| b.url.clone());

        let auth = if self.admin_party {
            CouchDbAuth::None
        } else {
            let username = binding
                .as_ref()
                .and_then(|b| b.username.clone())
                .unwrap_or_else(|| self.username.clone());
            let password = binding
                .as_ref()
                .and_then(|b| b.password.clone())
                .unwrap_or_else(|| self.password.clone());
            CouchDbAuth::Basic { username, password }
        };

        Ok(CouchDbConfig {
            url,
            auth,
            request_timeout: self.request_timeout,
            ..Default::default()
        })
    }

    /// Configuration suited to tests: no retry delay and a short timeout.
    pub fn for_testing() -> Self {
        Self {
            database: "test".to_string(),
            retry_count: 3,
            retry_delay: Duration::ZERO,
            request_timeout: Duration::from_secs(5),
            log_level: "debug".to_string(),
            ..Default::default()
        }
    }
}
