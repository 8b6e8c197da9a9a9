use std::path::PathBuf;

use url::Url;

use crate::auth::jwt::JwtConfig;
use crate::auth::mailer::EmailConfig;

/// Default largest accepted upload: 10 MiB.
const DEFAULT_UPLOAD_MAX_BYTES: usize = 10 * 1024 * 1024;

/// Default idle lifetime of a server-held wizard draft.
const DEFAULT_DRAFT_TTL_MINS: i64 = 120;

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Which collaborators back the service.
#[derive(Debug, Clone)]
pub enum BackendConfig {
    /// Process-local stores and self-issued tokens (development, tests).
    Memory,
    /// Self-hosted PostgreSQL for offers and identities.
    Postgres { database_url: String },
    /// Managed backend-as-a-service for auth, offers and storage.
    Hosted { url: Url, anon_key: String },
}

impl BackendConfig {
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Postgres { .. } => "postgres",
            Self::Hosted { .. } => "hosted",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development except the
/// secrets required by the chosen backend.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Origin the emailed sign-in links point back to.
    pub public_origin: Url,
    pub backend: BackendConfig,
    /// Token signing for the self-hosted identity provider (memory and postgres modes).
    pub jwt: Option<JwtConfig>,
    /// SMTP delivery for sign-in links; links are logged when absent.
    pub email: Option<EmailConfig>,
    /// Directory for locally stored uploads, served under `/uploads`.
    pub upload_dir: PathBuf,
    pub upload_max_bytes: usize,
    pub draft_ttl_mins: i64,
    pub log_format: LogFormat,
}

pub(crate) fn parse_var<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match get(var) {
        None => Ok(default),
        Some(value) => {
            let parsed = value.trim().parse::<T>();
            parsed.map_err(|e| ConfigError::Invalid {
                var,
                reason: e.to_string(),
                value,
            })
        }
    }
}

fn parse_url(var: &'static str, value: String) -> Result<Url, ConfigError> {
    Url::parse(&value).map_err(|e| ConfigError::Invalid {
        var,
        reason: e.to_string(),
        value,
    })
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `PUBLIC_ORIGIN`        | `http://localhost:3000`    |
    /// | `BACKEND_MODE`         | `memory`                   |
    /// | `UPLOAD_DIR`           | `./uploads`                |
    /// | `UPLOAD_MAX_BYTES`     | `10485760`                 |
    /// | `DRAFT_TTL_MINS`       | `120`                      |
    /// | `LOG_FORMAT`           | `text`                     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = get("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse_var(&get, "PORT", 3000)?;

        let cors_raw = get("CORS_ORIGINS").unwrap_or_else(|| "http://localhost:5173".into());
        let cors_origins: Vec<String> = cors_raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        for origin in &cors_origins {
            if origin.parse::<axum::http::HeaderValue>().is_err() {
                return Err(ConfigError::Invalid {
                    var: "CORS_ORIGINS",
                    value: origin.clone(),
                    reason: "not a valid header value".into(),
                });
            }
        }

        let request_timeout_secs: u64 = parse_var(&get, "REQUEST_TIMEOUT_SECS", 30)?;

        let public_origin = parse_url(
            "PUBLIC_ORIGIN",
            get("PUBLIC_ORIGIN").unwrap_or_else(|| "http://localhost:3000".into()),
        )?;

        let mode = get("BACKEND_MODE").unwrap_or_else(|| "memory".into());
        let backend = match mode.trim() {
            "memory" => BackendConfig::Memory,
            "postgres" => BackendConfig::Postgres {
                database_url: get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            },
            "hosted" => BackendConfig::Hosted {
                url: parse_url(
                    "BACKEND_URL",
                    get("BACKEND_URL").ok_or(ConfigError::Missing("BACKEND_URL"))?,
                )?,
                anon_key: get("BACKEND_ANON_KEY")
                    .filter(|k| !k.is_empty())
                    .ok_or(ConfigError::Missing("BACKEND_ANON_KEY"))?,
            },
            other => {
                return Err(ConfigError::Invalid {
                    var: "BACKEND_MODE",
                    value: other.to_string(),
                    reason: "expected one of: memory, postgres, hosted".into(),
                })
            }
        };

        let jwt = match backend {
            BackendConfig::Hosted { .. } => None,
            _ => Some(JwtConfig::from_lookup(&get)?),
        };

        let log_format = match get("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "LOG_FORMAT",
                    value: other.to_string(),
                    reason: "expected text or json".into(),
                })
            }
        };

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            public_origin,
            backend,
            jwt,
            email: EmailConfig::from_lookup(&get),
            upload_dir: get("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./uploads")),
            upload_max_bytes: parse_var(&get, "UPLOAD_MAX_BYTES", DEFAULT_UPLOAD_MAX_BYTES)?,
            draft_ttl_mins: parse_var(&get, "DRAFT_TTL_MINS", DEFAULT_DRAFT_TTL_MINS)?,
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn memory_mode_defaults() {
        let cfg = config(&[("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.backend.mode(), "memory");
        assert_eq!(cfg.public_origin.as_str(), "http://localhost:3000/");
        assert_eq!(cfg.upload_max_bytes, 10_485_760);
        assert_eq!(cfg.draft_ttl_mins, 120);
        assert_eq!(cfg.log_format, LogFormat::Text);
        assert!(cfg.email.is_none());
        assert_eq!(cfg.jwt.unwrap().access_token_expiry_mins, 15);
    }

    #[test]
    fn local_modes_require_jwt_secret() {
        assert_matches!(config(&[]), Err(ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn hosted_mode_requires_url_and_key() {
        assert_matches!(
            config(&[("BACKEND_MODE", "hosted")]),
            Err(ConfigError::Missing("BACKEND_URL"))
        );
        let cfg = config(&[
            ("BACKEND_MODE", "hosted"),
            ("BACKEND_URL", "https://proj.example"),
            ("BACKEND_ANON_KEY", "anon"),
        ])
        .unwrap();
        assert!(cfg.jwt.is_none());
        assert_matches!(cfg.backend, BackendConfig::Hosted { .. });
    }

    #[test]
    fn invalid_values_are_reported() {
        assert_matches!(
            config(&[("JWT_SECRET", "x"), ("PORT", "http")]),
            Err(ConfigError::Invalid { var: "PORT", .. })
        );
        assert_matches!(
            config(&[("JWT_SECRET", "x"), ("BACKEND_MODE", "sqlite")]),
            Err(ConfigError::Invalid { var: "BACKEND_MODE", .. })
        );
    }
}
