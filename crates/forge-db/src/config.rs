use std::env;

/// Database configuration.
///
/// Reads from the `FORGE_DATABASE_URL` environment variable, falling back to
/// `postgresql://localhost:5432/forge` when unset.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Full PostgreSQL connection URL.
    pub database_url: String,
}

impl DbConfig {
    /// The default connection URL used when no environment variable is set.
    pub const DEFAULT_URL: &str = "postgresql://localhost:5432/forge";

    /// Name of the environment variable holding the connection URL.
    pub const ENV_VAR: &str = "FORGE_DATABASE_URL";

    /// Build a config from the environment, then the compile-time default.
    pub fn from_env() -> Self {
        let database_url =
            env::var(Self::ENV_VAR).unwrap_or_else(|_| Self::DEFAULT_URL.to_owned());
        Self { database_url }
    }

    /// Build a config from an explicit URL.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    /// Extract the database name from the URL, ignoring any query string.
    pub fn database_name(&self) -> Option<&str> {
        let without_query = self
            .database_url
            .split_once('?')
            .map_or(self.database_url.as_str(), |(head, _)| head);
        without_query
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty() && !s.contains(':') && !s.contains('@'))
    }

    /// URL of the `postgres` maintenance database on the same server, used
    /// to issue `CREATE DATABASE`.
    pub fn maintenance_url(&self) -> String {
        match self.database_url.rfind('/') {
            Some(pos) => {
                let mut url = self.database_url[..pos].to_owned();
                url.push_str("/postgres");
                url
            }
            None => self.database_url.clone(),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
