// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_LOG_LEVEL: &str = "info";
const LOG_FILE_NAME: &str = "showcase.log";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub quota: Quota,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            storage: Storage::default(),
            quota: Quota::default(),
            ui: Ui::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
    pub downloads_dir: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaSource {
    /// Database file and sidecars against `budget_bytes`.
    Store,
    /// The filesystem holding the database.
    Disk,
    Off,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Quota {
    pub source: Option<QuotaSource>,
    pub budget_bytes: Option<u64>,
}

impl Default for Quota {
    fn default() -> Self {
        Self {
            source: Some(QuotaSource::Store),
            budget_bytes: Some(showcase_db::DEFAULT_QUOTA_BUDGET_BYTES),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub editable: Option<bool>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            editable: Some(false),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
            file: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("SHOWCASE_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set SHOWCASE_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(showcase_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version. Add `version = 1` at the top and keep values under [storage], [quota], [ui], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1. Regenerate it with `showcase --print-example-config`",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(db_path) = &self.storage.db_path {
            showcase_db::validate_db_path(db_path)?;
        }

        if let Some(dir) = &self.storage.downloads_dir
            && dir.trim().is_empty()
        {
            bail!(
                "storage.downloads_dir in {} is empty; remove it to use the default downloads folder",
                path.display()
            );
        }

        if self.quota.budget_bytes == Some(0) {
            bail!(
                "quota.budget_bytes in {} must be positive; remove it to use the {} byte default",
                path.display(),
                showcase_db::DEFAULT_QUOTA_BUDGET_BYTES
            );
        }

        if let Some(level) = &self.log.level
            && tracing::Level::from_str(level).is_err()
        {
            bail!(
                "log.level in {} must be one of trace, debug, info, warn, error; got {level:?}",
                path.display()
            );
        }

        Ok(())
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => showcase_db::default_db_path(),
        }
    }

    pub fn downloads_dir(&self) -> Result<PathBuf> {
        match &self.storage.downloads_dir {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => showcase_db::default_downloads_dir(),
        }
    }

    pub fn quota_source(&self) -> QuotaSource {
        self.quota.source.unwrap_or(QuotaSource::Store)
    }

    pub fn quota_budget_bytes(&self) -> u64 {
        self.quota
            .budget_bytes
            .unwrap_or(showcase_db::DEFAULT_QUOTA_BUDGET_BYTES)
    }

    pub fn editable(&self) -> bool {
        self.ui.editable.unwrap_or(false)
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_file(&self) -> Result<PathBuf> {
        if let Some(file) = &self.log.file {
            return Ok(PathBuf::from(file));
        }
        let root = dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .ok_or_else(|| {
                anyhow!("cannot resolve a directory for logs; set [log].file in the config")
            })?;
        Ok(root.join(showcase_db::APP_NAME).join(LOG_FILE_NAME))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# showcase config\n# Place this file at: {}\n\nversion = 1\n\n[storage]\n# Optional. Default is platform data dir (for example ~/.local/share/showcase/showcase.db)\n# db_path = \"/absolute/path/to/showcase.db\"\n# Optional. Default is the platform downloads folder\n# downloads_dir = \"/absolute/path/to/downloads\"\n\n[quota]\n# store: database size against budget_bytes; disk: the filesystem holding it; off\nsource = \"store\"\nbudget_bytes = {}\n\n[ui]\n# Start in edit mode\neditable = false\n\n[log]\n# SHOWCASE_LOG overrides this filter\nlevel = \"{}\"\n# file = \"/absolute/path/to/showcase.log\"\n",
            path.display(),
            showcase_db::DEFAULT_QUOTA_BUDGET_BYTES,
            DEFAULT_LOG_LEVEL,
        )
    }
}
