//! Configuration file management for forge.
//!
//! Provides a TOML-based config file at `~/.config/forge/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use forge_db::config::DbConfig;

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

/// Return the forge config directory: `$XDG_CONFIG_HOME/forge` or
/// `~/.config/forge`, on every platform.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("forge");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("forge")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))
}

/// Write the config file, creating parent dirs as needed. The file is
/// readable by its owner only, since the URL may carry a password.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

/// Fully resolved configuration.
#[derive(Debug)]
pub struct ForgeConfig {
    pub db_config: DbConfig,
}

impl ForgeConfig {
    /// DB URL: `cli_db_url` > `FORGE_DATABASE_URL` > `database.url` from the
    /// config file > [`DbConfig::DEFAULT_URL`].
    ///
    /// A config file that exists but does not parse is an error rather than
    /// being silently skipped.
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        let db_url = if let Some(url) = cli_db_url {
            url.to_owned()
        } else if let Ok(url) = std::env::var(DbConfig::ENV_VAR) {
            url
        } else if config_path().exists() {
            load_config()?.database.url
        } else {
            DbConfig::DEFAULT_URL.to_owned()
        };

        Ok(Self {
            db_config: DbConfig::new(db_url),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::test_util::lock_env;

    /// Point the config lookup at a fresh temp dir for the duration of `f`.
    fn with_config_home<T>(f: impl FnOnce(&std::path::Path) -> T) -> T {
        let tmp = tempfile::TempDir::new().unwrap();
        let orig_xdg = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe { std::env::set_var("XDG_CONFIG_HOME", tmp.path()) };

        let result = f(tmp.path());

        match orig_xdg {
            Some(x) => unsafe { std::env::set_var("XDG_CONFIG_HOME", x) },
            None => unsafe { std::env::remove_var("XDG_CONFIG_HOME") },
        }
        result
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        let path = config_path();
        assert!(
            path.ends_with("forge/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }

    #[test]
    fn save_and_load_roundtrip() {
        let _lock = lock_env();
        let loaded = with_config_home(|home| {
            save_config(&ConfigFile {
                database: DatabaseSection {
                    url: "postgresql://filehost:5432/filedb".to_owned(),
                },
            })
            .unwrap();
            assert!(home.join("forge").join("config.toml").exists());
            load_config().unwrap()
        });
        assert_eq!(loaded.database.url, "postgresql://filehost:5432/filedb");
    }

    #[cfg(unix)]
    #[test]
    fn save_config_sets_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let _lock = lock_env();
        let mode = with_config_home(|_| {
            save_config(&ConfigFile {
                database: DatabaseSection {
                    url: "postgresql://localhost/forge".to_owned(),
                },
            })
            .unwrap();
            std::fs::metadata(config_path()).unwrap().permissions().mode()
        });
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn cli_flag_overrides_everything() {
        let _lock = lock_env();
        unsafe { std::env::set_var(DbConfig::ENV_VAR, "postgresql://env:5432/envdb") };

        let config = ForgeConfig::resolve(Some("postgresql://cli:5432/clidb")).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://cli:5432/clidb");

        unsafe { std::env::remove_var(DbConfig::ENV_VAR) };
    }

    #[test]
    fn env_var_overrides_config_file() {
        let _lock = lock_env();
        let url = with_config_home(|_| {
            save_config(&ConfigFile {
                database: DatabaseSection {
                    url: "postgresql://file:5432/filedb".to_owned(),
                },
            })
            .unwrap();
            unsafe { std::env::set_var(DbConfig::ENV_VAR, "postgresql://env:5432/envdb") };
            let config = ForgeConfig::resolve(None);
            unsafe { std::env::remove_var(DbConfig::ENV_VAR) };
            config.unwrap().db_config.database_url
        });
        assert_eq!(url, "postgresql://env:5432/envdb");
    }

    #[test]
    fn config_file_used_when_no_flag_or_env() {
        let _lock = lock_env();
        unsafe { std::env::remove_var(DbConfig::ENV_VAR) };
        let url = with_config_home(|_| {
            save_config(&ConfigFile {
                database: DatabaseSection {
                    url: "postgresql://file:5432/filedb".to_owned(),
                },
            })
            .unwrap();
            ForgeConfig::resolve(None).unwrap().db_config.database_url
        });
        assert_eq!(url, "postgresql://file:5432/filedb");
    }

    #[test]
    fn defaults_when_nothing_set() {
        let _lock = lock_env();
        unsafe { std::env::remove_var(DbConfig::ENV_VAR) };
        let url = with_config_home(|_| ForgeConfig::resolve(None).unwrap().db_config.database_url);
        assert_eq!(url, DbConfig::DEFAULT_URL);
    }

    #[test]
    fn unparsable_config_file_is_an_error() {
        let _lock = lock_env();
        unsafe { std::env::remove_var(DbConfig::ENV_VAR) };
        let result = with_config_home(|home| {
            let dir = home.join("forge");
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("config.toml"), "database = 3").unwrap();
            ForgeConfig::resolve(None)
        });
        let msg = format!("{:#}", result.unwrap_err());
        assert!(msg.contains("failed to parse config file"), "unexpected error: {msg}");
    }
}
