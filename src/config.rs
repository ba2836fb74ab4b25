use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

/// One year. Longer token lifetimes are refused at startup.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub public_base_url: String,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// `None` selects the in-process store.
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub uploads: UploadConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source, applying defaults.
    pub fn from_lookup<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = var("APP_PORT")
            .unwrap_or_else(|| "8080".into())
            .parse::<u16>()
            .context("APP_PORT must be a port number")?;

        let ttl_minutes = match var("JWT_TTL_MINUTES") {
            Some(v) => v
                .parse::<i64>()
                .context("JWT_TTL_MINUTES must be a whole number of minutes")?,
            None => 60 * 24 * 30,
        };
        anyhow::ensure!(
            (1..=MAX_TTL_MINUTES).contains(&ttl_minutes),
            "JWT_TTL_MINUTES must be between 1 and {}",
            MAX_TTL_MINUTES
        );

        let max_body_bytes = match var("MAX_BODY_BYTES") {
            Some(v) => v
                .parse::<usize>()
                .context("MAX_BODY_BYTES must be a byte count")?,
            None => 50 * 1024 * 1024,
        };

        let secret = var("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .context("JWT_SECRET must be set")?;
        let jwt = JwtConfig {
            secret,
            issuer: var("JWT_ISSUER").unwrap_or_else(|| "returns-desk".into()),
            audience: var("JWT_AUDIENCE").unwrap_or_else(|| "returns-desk-users".into()),
            ttl_minutes,
        };

        let uploads = UploadConfig {
            dir: var("UPLOAD_DIR").unwrap_or_else(|| "./uploads".into()).into(),
            public_base_url: var("PUBLIC_BASE_URL")
                .unwrap_or_else(|| format!("http://localhost:{}", port)),
            max_body_bytes,
        };

        Ok(Self {
            host: var("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            database_url: var("DATABASE_URL").filter(|v| !v.is_empty()),
            jwt,
            uploads,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
