use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::types::AppConfig;

/// Discover and load the app config.
///
/// Priority:
/// 1. `--config` flag (explicit path)
/// 2. `$ISSUE_FINDER_CONFIG` environment variable
/// 3. `$XDG_CONFIG_HOME/issue-finder/config.toml`
/// 4. `~/.config/issue-finder/config.toml`
///
/// Without any config file the built-in defaults are used. An explicit path
/// that does not exist is an error.
pub fn load_config(explicit_path: Option<&Path>) -> Result<AppConfig> {
    let path = match explicit_path {
        Some(path) => path.to_path_buf(),
        None => match find_config() {
            Some(path) => path,
            None => {
                tracing::debug!("no config file found, using defaults");
                return Ok(AppConfig::default());
            }
        },
    };
    load_file(&path)
}

fn load_file(path: &Path) -> Result<AppConfig> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config: AppConfig =
        toml::from_str(&contents).with_context(|| format!("parsing TOML from {}", path.display()))?;
    tracing::debug!("loaded config from {}", path.display());
    Ok(config)
}

fn find_config() -> Option<PathBuf> {
    // $ISSUE_FINDER_CONFIG
    if let Ok(path) = std::env::var("ISSUE_FINDER_CONFIG") {
        let p = PathBuf::from(&path);
        if p.is_file() {
            return Some(p);
        }
    }

    // $XDG_CONFIG_HOME/issue-finder/config.toml
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        let p = PathBuf::from(xdg).join("issue-finder/config.toml");
        if p.is_file() {
            return Some(p);
        }
    }

    // ~/.config/issue-finder/config.toml
    if let Some(home) = std::env::var("HOME").ok().map(PathBuf::from) {
        let p = home.join(".config/issue-finder/config.toml");
        if p.is_file() {
            return Some(p);
        }
    }

    None
}
