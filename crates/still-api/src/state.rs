use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::error;

use still_db::Database;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub environment: Environment,
}

impl AppStateInner {
    pub fn new(db: Database, environment: Environment) -> AppState {
        Arc::new(Self { db, environment })
    }

    /// Log an unexpected failure and turn it into a 500. Details only leave
    /// the process in development.
    pub fn internal(&self, err: anyhow::Error) -> ApiError {
        error!("Request failed: {:#}", err);
        let message = match self.environment {
            Environment::Development => format!("{:#}", err),
            Environment::Production => "Something went wrong".to_string(),
        };
        ApiError::Internal(message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(anyhow::anyhow!("unknown environment '{}'", other)),
        }
    }
}

/// Run blocking DB work off the async runtime.
pub(crate) async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = state.clone();
    tokio::task::spawn_blocking(move || f(&db.db))
        .await
        .map_err(|e| state.internal(anyhow::anyhow!("spawn_blocking join error: {}", e)))?
        .map_err(|e| state.internal(e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parses_aliases() {
        assert_eq!("production".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!(" Dev ".parse::<Environment>().unwrap(), Environment::Development);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn internal_hides_details_in_production() {
        let db = Database::open_in_memory().unwrap();
        let state = AppStateInner::new(db, Environment::Production);
        let err = state.internal(anyhow::anyhow!("disk on fire"));
        assert_eq!(err.to_string(), "Something went wrong");

        let db = Database::open_in_memory().unwrap();
        let state = AppStateInner::new(db, Environment::Development);
        let err = state.internal(anyhow::anyhow!("disk on fire"));
        assert_eq!(err.to_string(), "disk on fire");
    }
}
