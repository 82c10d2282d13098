use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub asset_dir: PathBuf,
    pub page_size: u32,
    pub secure_cookie: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = get("QUILL_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("QUILL_JWT_SECRET is unset or still a placeholder");
        }

        let host = get("QUILL_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("QUILL_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("QUILL_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .context("QUILL_HOST must be an IP address")?;

        let page_size: u32 = get("QUILL_PAGE_SIZE")
            .unwrap_or_else(|| "3".into())
            .parse()
            .context("QUILL_PAGE_SIZE must be a positive integer")?;
        if page_size == 0 {
            bail!("QUILL_PAGE_SIZE must be at least 1");
        }

        let secure_cookie = match get("QUILL_SECURE_COOKIE").as_deref() {
            None | Some("") | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(other) => bail!("QUILL_SECURE_COOKIE must be true or false, got '{}'", other),
        };

        Ok(Self {
            jwt_secret,
            db_path: get("QUILL_DB_PATH").unwrap_or_else(|| "quill.db".into()).into(),
            addr,
            asset_dir: get("QUILL_ASSET_DIR").unwrap_or_else(|| "./public/img".into()).into(),
            page_size,
            secure_cookie,
        })
    }
}
