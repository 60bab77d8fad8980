//! Process configuration read from the environment.
//!
//! - `JWT_KEY`: token signing key (required)
//! - `TOKEN_LIFETIME_SECS`: token lifetime in seconds (default: one day, at most ten years)
//! - `BIND_ADDR`: listen address (default: `127.0.0.1:4000`)
//! - `SEED_ADMIN_EMAIL` / `SEED_ADMIN_PASSWORD`: initial Adm account, created
//!   at startup when both are set

use std::{net::SocketAddr, time::Duration};

use crate::auth::{DEFAULT_TOKEN_LIFETIME, MAX_TOKEN_LIFETIME};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:4000";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingEnvVar(&'static str),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: &'static str, message: String },
}

#[derive(Clone)]
pub struct SeedAdmin {
    pub email: String,
    pub password: String,
}

#[derive(Clone)]
pub struct Settings {
    pub signing_key: String,
    pub token_lifetime: Duration,
    pub bind_addr: SocketAddr,
    pub seed_admin: Option<SeedAdmin>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from any variable source; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let signing_key = lookup("JWT_KEY")
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingEnvVar("JWT_KEY"))?;

        let token_lifetime = match lookup("TOKEN_LIFETIME_SECS") {
            Some(value) => {
                let secs = value
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| (1..=MAX_TOKEN_LIFETIME.as_secs()).contains(secs))
                    .ok_or_else(|| ConfigError::InvalidValue {
                        name: "TOKEN_LIFETIME_SECS",
                        message: format!(
                            "expected between 1 and {} seconds, got {value:?}",
                            MAX_TOKEN_LIFETIME.as_secs()
                        ),
                    })?;
                Duration::from_secs(secs)
            }
            None => DEFAULT_TOKEN_LIFETIME,
        };

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|err| ConfigError::InvalidValue {
                name: "BIND_ADDR",
                message: err.to_string(),
            })?;

        let seed_admin = match (lookup("SEED_ADMIN_EMAIL"), lookup("SEED_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some(SeedAdmin { email, password })
            }
            _ => None,
        };

        Ok(Self {
            signing_key,
            token_lifetime,
            bind_addr,
            seed_admin,
        })
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("token_lifetime", &self.token_lifetime)
            .field("bind_addr", &self.bind_addr)
            .field("seed_admin", &self.seed_admin.as_ref().map(|seed| &seed.email))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn signing_key_is_required() {
        assert_eq!(
            settings(&[]).unwrap_err(),
            ConfigError::MissingEnvVar("JWT_KEY")
        );
        assert_eq!(
            settings(&[("JWT_KEY", "")]).unwrap_err(),
            ConfigError::MissingEnvVar("JWT_KEY")
        );
    }

    #[test]
    fn defaults_apply() {
        let settings = settings(&[("JWT_KEY", "secret")]).unwrap();

        assert_eq!(settings.token_lifetime, DEFAULT_TOKEN_LIFETIME);
        assert_eq!(settings.bind_addr, DEFAULT_BIND_ADDR.parse::<SocketAddr>().unwrap());
        assert!(settings.seed_admin.is_none());
    }

    #[test]
    fn rejects_bad_lifetime() {
        let too_long = (MAX_TOKEN_LIFETIME.as_secs() + 1).to_string();
        for value in ["0", "-5", "a day", "18446744073709551615", too_long.as_str()] {
            assert!(matches!(
                settings(&[("JWT_KEY", "secret"), ("TOKEN_LIFETIME_SECS", value)]),
                Err(ConfigError::InvalidValue { name: "TOKEN_LIFETIME_SECS", .. })
            ));
        }
    }

    #[test]
    fn accepts_longest_lifetime() {
        let max = MAX_TOKEN_LIFETIME.as_secs().to_string();
        let settings = settings(&[("JWT_KEY", "secret"), ("TOKEN_LIFETIME_SECS", max.as_str())]).unwrap();

        assert_eq!(settings.token_lifetime, MAX_TOKEN_LIFETIME);
    }

    #[test]
    fn seed_admin_needs_both_values() {
        let partial = settings(&[("JWT_KEY", "secret"), ("SEED_ADMIN_EMAIL", "adm@test.com")]).unwrap();
        assert!(partial.seed_admin.is_none());

        let full = settings(&[
            ("JWT_KEY", "secret"),
            ("SEED_ADMIN_EMAIL", "adm@test.com"),
            ("SEED_ADMIN_PASSWORD", "123456"),
        ])
        .unwrap();
        assert_eq!(full.seed_admin.unwrap().email, "adm@test.com");
    }

    #[test]
    fn debug_output_hides_secrets() {
        let settings = settings(&[
            ("JWT_KEY", "super secret"),
            ("SEED_ADMIN_EMAIL", "adm@test.com"),
            ("SEED_ADMIN_PASSWORD", "123456"),
        ])
        .unwrap();
        let debug = format!("{settings:?}");

        assert!(!debug.contains("super secret"));
        assert!(!debug.contains("123456"));
    }
}
