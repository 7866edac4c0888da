use crate::error::{AdvisorError, Result};
use agro_advisor_common::Lang;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const BACKEND_URL_ENV: &str = "AGRO_BACKEND_URL";
pub const IMAGE_BASE_URL_ENV: &str = "AGRO_IMAGE_BASE_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend_url: String,
    pub image_base_url: String,
    pub timeout_seconds: u64,
    pub language: Option<Lang>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:5000/api".into(),
            image_base_url: "http://localhost:5000".into(),
            timeout_seconds: 10,
            language: None,
        }
    }
}

impl Config {
    /// Config file merged with environment overrides
    pub fn load() -> Result<Self> {
        let config = Self::load_from(&Self::config_path()?)?;
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| AdvisorError::Config("config directory not found".into()))?;
        Ok(dir.join("agro-advisor").join("config.json"))
    }

    /// Environment values win over the file
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(BACKEND_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.backend_url = url;
        }
        if let Some(url) = lookup(IMAGE_BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.image_base_url = url;
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1))
    }

    /// `--lang`, then the saved choice, then the locale, then English
    pub fn resolve_lang(&self, cli: Option<Lang>, locale: Option<&str>) -> Lang {
        cli.or(self.language)
            .or_else(|| locale.and_then(Lang::from_locale))
            .unwrap_or_default()
    }

    /// Display URL of a server image path: `<image_base_url>/leaf/<file name>`
    pub fn image_url(&self, image_path: &str) -> String {
        let file_name = image_path.rsplit('/').next().unwrap_or(image_path);
        format!("{}/leaf/{}", self.image_base_url.trim_end_matches('/'), file_name)
    }
}
