use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use leafcare_api::ai::{DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub upload_dir: PathBuf,
    pub public_url: String,
    pub ai_api_key: Option<String>,
    pub ai_model: String,
    pub ai_base_url: String,
    pub classifier_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = get("LEAFCARE_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("LEAFCARE_JWT_SECRET is unset or still a placeholder");
        }

        let host = get("LEAFCARE_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("LEAFCARE_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("LEAFCARE_PORT must be a port number")?;
        let addr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        Ok(Self {
            addr,
            db_path: get("LEAFCARE_DB_PATH").unwrap_or_else(|| "leafcare.db".into()).into(),
            jwt_secret,
            upload_dir: get("LEAFCARE_UPLOAD_DIR").unwrap_or_else(|| "./uploads".into()).into(),
            public_url: get("LEAFCARE_PUBLIC_URL").unwrap_or_else(|| "http://localhost:3000".into()),
            ai_api_key: get("GOOGLE_GENERATIVE_AI_API_KEY"),
            ai_model: get("LEAFCARE_AI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
            ai_base_url: get("LEAFCARE_AI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            classifier_url: get("LEAFCARE_CLASSIFIER_URL"),
        })
    }
}
