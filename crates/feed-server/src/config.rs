use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub jwt_secret: String,
}

impl Config {
    /// Read `FEED_*` variables from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("FEED_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("FEED_JWT_SECRET is unset or still a placeholder; set it in your .env file");
        }

        let host = lookup("FEED_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = lookup("FEED_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("FEED_PORT must be a port number")?;
        let db_path: PathBuf = lookup("FEED_DB_PATH").unwrap_or_else(|| "feed.db".into()).into();
        let upload_dir: PathBuf = lookup("FEED_UPLOAD_DIR").unwrap_or_else(|| "./uploads".into()).into();

        Ok(Self {
            host,
            port,
            db_path,
            upload_dir,
            jwt_secret,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_the_secret_is_set() {
        let config = Config::from_lookup(lookup(&[("FEED_JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.db_path, PathBuf::from("feed.db"));
        assert_eq!(config.upload_dir, PathBuf::from("./uploads"));
        assert_eq!(config.addr().unwrap().to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn placeholder_secrets_are_refused() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
        assert!(Config::from_lookup(lookup(&[("FEED_JWT_SECRET", "dev-secret-change-me")])).is_err());
    }

    #[test]
    fn bad_port_is_an_error() {
        let vars = [("FEED_JWT_SECRET", "s3cret"), ("FEED_PORT", "http")];
        assert!(Config::from_lookup(lookup(&vars)).is_err());
    }
}
