use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

use still_api::Environment;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub environment: Environment,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys fall back to defaults, malformed
    /// values are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("STILL_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = lookup("STILL_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("STILL_PORT must be a port number")?;
        let db_path: PathBuf = lookup("STILL_DB_PATH").unwrap_or_else(|| "still.db".into()).into();
        let environment = match lookup("STILL_ENV") {
            Some(raw) => raw.parse().context("STILL_ENV")?,
            None => Environment::default(),
        };

        Ok(Self {
            host,
            port,
            db_path,
            environment,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
