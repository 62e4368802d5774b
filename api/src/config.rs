use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value `{value}`: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// Pooled SQLite database at the given path.
    Sqlite { database_url: String },
    /// In-process tables, optionally mirrored to a JSON snapshot.
    Memory { snapshot: Option<PathBuf> },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub cors_origin: String,
    pub jwt_secret: String,
    pub backend: Backend,
    pub seed_demo: bool,
}

fn parse<T>(name: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        reason: e.to_string(),
        value,
    })
}

impl Config {
    /// Reads `.env` if present, then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a config from any variable source; unset variables take their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let backend = match get("STORE", "sqlite").as_str() {
            "sqlite" => Backend::Sqlite {
                database_url: get("DATABASE_URL", "marketplace.db"),
            },
            "memory" => Backend::Memory {
                snapshot: lookup("SNAPSHOT_PATH")
                    .filter(|p| !p.is_empty())
                    .map(PathBuf::from),
            },
            other => {
                return Err(ConfigError::Invalid {
                    name: "STORE",
                    value: other.to_string(),
                    reason: "expected `sqlite` or `memory`".to_string(),
                })
            }
        };

        Ok(Config {
            bind_addr: parse("BIND_ADDR", get("BIND_ADDR", "0.0.0.0:8080"))?,
            cors_origin: get("CORS_ORIGIN", "http://localhost:3000"),
            jwt_secret: get("JWT_SECRET", "dev-secret-change-me"),
            backend,
            seed_demo: parse("SEED_DEMO", get("SEED_DEMO", "false"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_use_sqlite() {
        let config = config(&[]).unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(
            config.backend,
            Backend::Sqlite {
                database_url: "marketplace.db".into()
            }
        );
        assert!(!config.seed_demo);
    }

    #[test]
    fn memory_backend_takes_a_snapshot_path() {
        let config = config(&[
            ("STORE", "memory"),
            ("SNAPSHOT_PATH", "/tmp/market.json"),
            ("SEED_DEMO", "true"),
        ])
        .unwrap();
        assert_eq!(
            config.backend,
            Backend::Memory {
                snapshot: Some(PathBuf::from("/tmp/market.json"))
            }
        );
        assert!(config.seed_demo);
    }

    #[test]
    fn bad_values_are_reported_by_name() {
        let err = config(&[("BIND_ADDR", "localhost")]).unwrap_err();
        assert!(err.to_string().starts_with("BIND_ADDR"));
        assert!(config(&[("STORE", "postgres")]).is_err());
        assert!(config(&[("SEED_DEMO", "yes please")]).is_err());
    }
}
