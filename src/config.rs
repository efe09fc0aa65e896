use std::{env, path::PathBuf};

use anyhow::Context;
use axum::http::HeaderValue;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mongodb_uri: String,
    pub mongodb_database: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub cors_allow_origin: HeaderValue,
    /// Public asset root; profile images live under `<upload_dir>/profile-images`.
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let mongodb_uri = env::var("MONGODB_URI").context("MONGODB_URI is not set")?;
        let mongodb_database =
            env::var("MONGODB_DATABASE").unwrap_or_else(|_| "wad-01".to_string());
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let jwt_ttl_hours = env::var("JWT_TTL_HOURS")
            .ok()
            .and_then(|h| h.parse::<i64>().ok())
            .unwrap_or(24);
        let origin = env::var("CORS_ALLOW_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        let cors_allow_origin = parse_cors_origin(&origin)?;
        let upload_dir = env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("public"));
        let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|b| b.parse::<usize>().ok())
            .unwrap_or(5 * 1024 * 1024);

        Ok(Self {
            mongodb_uri,
            mongodb_database,
            host,
            port,
            jwt_secret,
            jwt_ttl_hours,
            cors_allow_origin,
            upload_dir,
            max_upload_bytes,
        })
    }
}

/// Responses carry credentials, which browsers refuse alongside a wildcard
/// origin, so `*` is rejected up front.
fn parse_cors_origin(origin: &str) -> anyhow::Result<HeaderValue> {
    if origin.trim() == "*" {
        anyhow::bail!("CORS_ALLOW_ORIGIN must name a single origin, `*` cannot be used with credentials");
    }
    HeaderValue::from_str(origin)
        .with_context(|| format!("CORS_ALLOW_ORIGIN is not a valid header value: {origin}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_origin_accepts_a_single_origin() {
        let origin = parse_cors_origin("http://localhost:3000").unwrap();
        assert_eq!(origin, "http://localhost:3000");
    }

    #[test]
    fn cors_origin_rejects_wildcard() {
        let err = parse_cors_origin("*").unwrap_err();
        assert!(err.to_string().contains("CORS_ALLOW_ORIGIN"));
        assert!(parse_cors_origin(" * ").is_err());
    }

    #[test]
    fn cors_origin_rejects_invalid_header_values() {
        assert!(parse_cors_origin("http://bad\norigin").is_err());
    }
}
