// lmctl - CLI for the LogicMonitor REST API
// Copyright (C) 2026 The lmctl contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub const DEFAULT_OUTPUT_DIR: &str = "output";

pub const ENV_ACCESS_KEY: &str = "ACCESS_KEY";
pub const ENV_ACCESS_ID: &str = "ACCESS_ID";
pub const ENV_COMPANY: &str = "COMPANY";
pub const ENV_BASE_URL: &str = "LM_BASE_URL";

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    pub company: Option<String>,
    pub access_id: Option<String>,
    pub access_key: Option<String>,
    pub base_url: Option<String>,
    pub output_dir: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Local,
    User,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not locate a writable config directory for the current user")]
    MissingConfigDir,
    #[error(
        "missing {0}; set it in the environment, a .env file, or with `lmctl configure`"
    )]
    MissingCredentials(String),
}

/// Account credentials, fixed for the lifetime of the process.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub company: String,
    pub access_id: String,
    pub access_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("company", &self.company)
            .field("access_id", &self.access_id)
            .field("access_key", &"*****")
            .finish()
    }
}

#[derive(Debug)]
pub struct EffectiveConfig {
    pub credentials: Credentials,
    pub base_url: String,
    pub output_dir: PathBuf,
}

pub fn base_url_for(company: &str) -> String {
    format!("https://{company}.logicmonitor.com/santaba/rest")
}

pub fn config_path(scope: Scope, cwd: &Path) -> Result<PathBuf> {
    match scope {
        Scope::Local => Ok(cwd.join(".lmctl.yaml")),
        Scope::User => {
            if let Ok(custom) = env::var("LMCTL_CONFIG_DIR") {
                return Ok(PathBuf::from(custom).join("config.yaml"));
            }
            let base = config_dir().ok_or(ConfigError::MissingConfigDir)?;
            Ok(base.join("lmctl").join("config.yaml"))
        }
    }
}

pub fn load(cwd: &Path) -> Result<Config> {
    let user = read_if_exists(&config_path(Scope::User, cwd)?)?.unwrap_or_default();
    let local = read_if_exists(&config_path(Scope::Local, cwd)?)?.unwrap_or_default();
    Ok(merge(user, local))
}

pub fn load_scope(scope: Scope, cwd: &Path) -> Result<Config> {
    Ok(read_if_exists(&config_path(scope, cwd)?)?.unwrap_or_default())
}

pub fn save(scope: Scope, config: &Config, cwd: &Path) -> Result<PathBuf> {
    let path = config_path(scope, cwd)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = serde_yaml::to_string(config).context("serializing config")?;
    fs::write(&path, serialized).with_context(|| format!("writing {:?}", path))?;
    Ok(path)
}

/// Values read from `ACCESS_KEY`, `ACCESS_ID`, `COMPANY` and `LM_BASE_URL`.
/// Empty variables count as unset.
pub fn from_env() -> Config {
    let var = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());
    Config {
        company: var(ENV_COMPANY),
        access_id: var(ENV_ACCESS_ID),
        access_key: var(ENV_ACCESS_KEY),
        base_url: var(ENV_BASE_URL),
        output_dir: None,
    }
}

/// Merge config files, environment and command-line overrides, in rising
/// precedence.
pub fn resolve(cwd: &Path, overrides: Config) -> Result<EffectiveConfig> {
    let merged = merge(merge(load(cwd)?, from_env()), overrides);

    let mut missing = Vec::new();
    if merged.company.is_none() {
        missing.push(ENV_COMPANY);
    }
    if merged.access_id.is_none() {
        missing.push(ENV_ACCESS_ID);
    }
    if merged.access_key.is_none() {
        missing.push(ENV_ACCESS_KEY);
    }
    if !missing.is_empty() {
        return Err(ConfigError::MissingCredentials(missing.join(", ")).into());
    }

    let credentials = Credentials {
        company: merged.company.unwrap_or_default().trim().to_string(),
        access_id: merged.access_id.unwrap_or_default().trim().to_string(),
        access_key: merged.access_key.unwrap_or_default().trim().to_string(),
    };
    let base_url = merged
        .base_url
        .unwrap_or_else(|| base_url_for(&credentials.company));
    let output_dir = PathBuf::from(
        merged
            .output_dir
            .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
    );

    Ok(EffectiveConfig {
        credentials,
        base_url,
        output_dir,
    })
}

fn read_if_exists(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let config = serde_yaml::from_str(&contents).with_context(|| format!("parsing {:?}", path))?;
    Ok(Some(config))
}

fn merge(lower: Config, upper: Config) -> Config {
    Config {
        company: upper.company.or(lower.company),
        access_id: upper.access_id.or(lower.access_id),
        access_key: upper.access_key.or(lower.access_key),
        base_url: upper.base_url.or(lower.base_url),
        output_dir: upper.output_dir.or(lower.output_dir),
    }
}
