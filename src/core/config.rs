use config::Config;
use serde::Deserialize;

use crate::core::error::ConfigError;

pub(crate) const MIN_BCRYPT_COST: u32 = 4;
pub(crate) const MAX_BCRYPT_COST: u32 = 31;

/// How failures reach the client.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Every response is `200 OK`; the envelope's `success` flag carries the outcome.
    #[default]
    Envelope,
    /// Failures keep their conventional 4xx/5xx status codes.
    Status,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Args {
    pub database_url: String,
    pub max_connections: u32,
    pub port: u16,
    pub log_level: String,
    pub secret: String,
    pub issuer: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub error_policy: ErrorPolicy,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Args {
    /// Reads `socialqr.toml` (optional) and `SOCIALQR_*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("database_url", "sqlite://socialqr.db?mode=rwc")?
            .set_default("max_connections", 5)?
            .set_default("port", 8000)?
            .set_default("log_level", "info")?
            .set_default("issuer", "socialqr")?
            .set_default("token_ttl_hours", 24)?
            .set_default("bcrypt_cost", i64::from(bcrypt::DEFAULT_COST))?
            .set_default("error_policy", "envelope")?
            .add_source(config::File::with_name("socialqr").required(false))
            .add_source(config::Environment::with_prefix("SOCIALQR"))
            .build()?;

        let args = config.try_deserialize::<Args>()?;

        args.validate()?;

        Ok(args)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.trim().is_empty() {
            return Err(ConfigError::Invalid("secret must not be empty".into()));
        }

        if self.token_ttl_hours <= 0 {
            return Err(ConfigError::Invalid(
                "token_ttl_hours must be positive".into(),
            ));
        }

        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.bcrypt_cost) {
            return Err(ConfigError::Invalid(format!(
                "bcrypt_cost must be between {MIN_BCRYPT_COST} and {MAX_BCRYPT_COST}"
            )));
        }

        if self.admin_username.is_some() != self.admin_password.is_some() {
            return Err(ConfigError::Invalid(
                "admin_username and admin_password must be set together".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_args() -> Args {
    Args {
        database_url: "sqlite::memory:".into(),
        max_connections: 1,
        port: 0,
        log_level: "debug".into(),
        secret: "test-secret".into(),
        issuer: "socialqr-test".into(),
        token_ttl_hours: 24,
        bcrypt_cost: MIN_BCRYPT_COST,
        error_policy: ErrorPolicy::Status,
        admin_username: None,
        admin_password: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_secret() {
        let mut args = test_args();
        args.secret = "  ".into();

        assert!(matches!(args.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_half_configured_admin() {
        let mut args = test_args();
        args.admin_username = Some("root".into());

        assert!(matches!(args.validate(), Err(ConfigError::Invalid(_))));

        args.admin_password = Some("hunter2".into());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_cost() {
        let mut args = test_args();
        args.bcrypt_cost = 2;
        assert!(args.validate().is_err());

        args.bcrypt_cost = MAX_BCRYPT_COST + 1;
        assert!(args.validate().is_err());

        args.bcrypt_cost = MIN_BCRYPT_COST;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn parses_error_policy() {
        let policy: ErrorPolicy = serde_json::from_str("\"status\"").unwrap();
        assert_eq!(policy, ErrorPolicy::Status);

        assert_eq!(ErrorPolicy::default(), ErrorPolicy::Envelope);
    }
}
