use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use tracing::{info, warn};
use warp::http::Uri;

use crate::error::ConfigError;

/// Settings for the HTTP server that hosts the auth routes.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Origins allowed by the CORS policy. Requests without an `Origin` header are not affected.
    pub allowed_origins: Vec<String>,
    /// Directory served under `/upload`.
    pub upload_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            allowed_origins: vec!["http://localhost:3000".to_string()],
            upload_dir: PathBuf::from("upload"),
        }
    }
}

impl ServerConfig {
    /// Reads `PORT`, `ALLOWED_ORIGINS` and `UPLOAD_DIR`, falling back to the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let allowed_origins = match var("ALLOWED_ORIGINS") {
            Some(raw) => parse_origins(&raw)?,
            None => defaults.allowed_origins,
        };

        Ok(Self {
            port: parse_or("PORT", defaults.port)?,
            allowed_origins,
            upload_dir: var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
        })
    }
}

/// Settings for the signup client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API, e.g. `http://localhost:3001/api`.
    pub base_url: String,
    /// Quiet period after the last submit before the request is sent.
    pub debounce_window: Duration,
    /// How long the success notification stays up before moving to sign-in.
    pub redirect_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001/api".to_string(),
            debounce_window: Duration::from_secs(3),
            redirect_delay: Duration::from_secs(3),
        }
    }
}

pub(crate) fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

pub(crate) fn required(key: &'static str) -> Result<String, ConfigError> {
    var(key).ok_or(ConfigError::Missing { key })
}

pub(crate) fn parse_or<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match var(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key,
                reason: e.to_string(),
            }
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

fn parse_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| {
            let uri = origin
                .parse::<Uri>()
                .map_err(|e| ConfigError::Invalid {
                    key: "ALLOWED_ORIGINS",
                    reason: e.to_string(),
                })?;

            // an origin is scheme and authority only
            if uri.scheme().is_none() || uri.authority().is_none() || uri.path().len() > 1 {
                return Err(ConfigError::Invalid {
                    key: "ALLOWED_ORIGINS",
                    reason: format!("{origin} is not an origin"),
                });
            }

            Ok(origin.trim_end_matches('/').to_string())
        })
        .collect()
}
