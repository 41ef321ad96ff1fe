use std::{env, net::SocketAddr};

use url::Url;

use crate::error::AppError;

pub const DEFAULT_MAPBOX_API_URL: &str = "https://api.mapbox.com";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub mapbox_token: Option<String>,
    pub mapbox_api_url: Url,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://co_planet.db".to_string());
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:5000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let mapbox_token = resolve_mapbox_token(
            env::var("MAPBOX_ACCESS_TOKEN").ok(),
            env::var("MAPBOX_TOKEN").ok(),
        );

        let mapbox_api_url: Url = env::var("MAPBOX_API_URL")
            .unwrap_or_else(|_| DEFAULT_MAPBOX_API_URL.to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid MAPBOX_API_URL: {err}")))?;

        Ok(Self {
            database_url,
            listen_addr,
            mapbox_token,
            mapbox_api_url,
        })
    }
}

/// First non-blank token wins.
pub fn resolve_mapbox_token(primary: Option<String>, fallback: Option<String>) -> Option<String> {
    [primary, fallback]
        .into_iter()
        .flatten()
        .map(|token| token.trim().to_string())
        .find(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_token_wins() {
        let token = resolve_mapbox_token(Some("pk.primary".into()), Some("pk.fallback".into()));
        assert_eq!(token.as_deref(), Some("pk.primary"));
    }

    #[test]
    fn blank_primary_falls_back() {
        let token = resolve_mapbox_token(Some("  ".into()), Some("pk.fallback".into()));
        assert_eq!(token.as_deref(), Some("pk.fallback"));
    }

    #[test]
    fn no_token_configured() {
        assert_eq!(resolve_mapbox_token(None, None), None);
        assert_eq!(resolve_mapbox_token(None, Some(String::new())), None);
    }
}
