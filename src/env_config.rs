use std::{env, str::FromStr, time::Duration};

use anyhow::{Context, Error};
use dotenv::dotenv;
use paste::paste;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

use crate::store::PoolSettings;

const CONFIG_PATH_ENV: &str = "CONFIG_PATH";
const DATABASE_URL_ENV: &str = "DATABASE_URL";
const POOL_MAX_SIZE_ENV: &str = "POOL_MAX_SIZE";
const CONNECTION_TIMEOUT_SECS_ENV: &str = "CONNECTION_TIMEOUT_SECS";
const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

#[derive(Debug, Deserialize)]
pub struct SecretString(Secret<String>);

impl SecretString {
    pub fn new(value: String) -> Self {
        SecretString(Secret::new(value))
    }

    pub fn expose_secret(&self) -> &String {
        self.0.expose_secret()
    }
}

impl Default for SecretString {
    fn default() -> Self {
        SecretString(Secret::new("".to_string()))
    }
}

#[derive(Deserialize, Debug)]
pub struct Config {
    /// Connection URI of the profile database: `memory`, a SQLite file path or a
    /// `postgres://` URL. May be overridden on the command line.
    #[serde(default)]
    pub database_url: Option<SecretString>,

    /// Maximum number of pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,

    /// How long a call may wait for a pooled connection before failing.
    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Config {
    /// Parses a TOML document into a `Config`.
    pub fn from_toml_str(contents: &str) -> Result<Self, Error> {
        toml::from_str(contents).context("invalid TOML configuration")
    }

    /// Builds a `Config` from variables returned by `lookup`, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            database_url: lookup(DATABASE_URL_ENV).map(SecretString::new),
            pool_max_size: parse_or(&lookup, POOL_MAX_SIZE_ENV, default_pool_max_size)?,
            connection_timeout_secs: parse_or(
                &lookup,
                CONNECTION_TIMEOUT_SECS_ENV,
                default_connection_timeout_secs,
            )?,
            log_level: lookup(LOG_LEVEL_ENV).unwrap_or_else(default_log_level),
        })
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_size: self.pool_max_size,
            connection_timeout: Duration::from_secs(self.connection_timeout_secs),
        }
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: fn() -> T) -> Result<T, Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .parse()
            .with_context(|| format!("{key} has an invalid value: {value:?}")),
        None => Ok(default()),
    }
}

/// Loads `.env`, then reads the TOML file named by `CONFIG_PATH` if it is set, or the process
/// environment otherwise.
pub fn read_config() -> Result<Config, Error> {
    dotenv().ok();
    match env::var(CONFIG_PATH_ENV) {
        Ok(config_path) => {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("failed to read config file {config_path}"))?;
            Config::from_toml_str(&contents)
        }
        Err(_) => Config::from_lookup(|key| env::var(key).ok()),
    }
}

macro_rules! define_defaults {
    ($ty_name:ident { $($name:ident: $ty:ty = $default:expr,)* }) => {
        define_defaults! { $($name: $ty = $default,)* }
        paste! {
            impl Default for $ty_name {
                fn default() -> Self {
                    Self {
                        $($name: [<default_ $name>](),)*
                    }
                }
            }
        }
    };
    ($($name:ident: $ty:ty = $default:expr,)*) => {
        paste! {
            $(
                fn [<default_ $name>]() -> $ty {
                    $default
                }
            )*
        }
    };
}

define_defaults!(Config {
    database_url: Option<SecretString> = None,
    pool_max_size: u32 = 10,
    connection_timeout_secs: u64 = 30,
    log_level: String = "info".to_owned(),
});

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn toml_fills_in_defaults() {
        let config = Config::from_toml_str(r#"database_url = "postgres://db/profiles""#)
            .expect("Unable to parse config");

        assert_eq!(
            config.database_url.as_ref().map(|url| url.expose_secret().as_str()),
            Some("postgres://db/profiles")
        );
        assert_eq!(config.pool_max_size, 10);
        assert_eq!(config.connection_timeout_secs, 30);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn database_url_is_not_printed() {
        let config = Config::from_toml_str(r#"database_url = "postgres://user:hunter2@db/p""#)
            .expect("Unable to parse config");

        assert!(!format!("{:?}", config).contains("hunter2"));
    }

    #[test]
    fn lookup_overrides_defaults() {
        let vars: HashMap<&str, &str> = [
            (DATABASE_URL_ENV, "profiles.db"),
            (POOL_MAX_SIZE_ENV, "4"),
            (CONNECTION_TIMEOUT_SECS_ENV, "5"),
        ]
        .into_iter()
        .collect();

        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
            .expect("Unable to build config");

        assert_eq!(config.pool_max_size, 4);
        assert_eq!(
            config.pool_settings().connection_timeout,
            Duration::from_secs(5)
        );
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn invalid_number_is_rejected() {
        let err = Config::from_lookup(|key| {
            (key == POOL_MAX_SIZE_ENV).then(|| "lots".to_string())
        })
        .expect_err("Invalid pool size was accepted");

        assert!(err.to_string().contains(POOL_MAX_SIZE_ENV));
    }

    #[test]
    fn default_config_has_no_url() {
        let config = Config::default();
        assert!(config.database_url.is_none());
        assert_eq!(config.pool_settings(), PoolSettings::default());
    }
}
