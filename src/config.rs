use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::document::ExtractOptions;
use crate::document::builder::TextStyle;

/// Processing configuration for redliner
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub document: DocumentConfig,
    pub recovery: RecoveryConfig,
    pub io: IoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DocumentConfig {
    /// Font for paragraphs generated from plain text
    pub default_font: String,
    pub default_font_size: f32,
    /// Reported when a run names no font
    pub fallback_font: String,
    /// Highlight color name written on replaced runs
    pub highlight: String,
    pub max_images_per_paragraph: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecoveryConfig {
    pub conversion_timeout_secs: u64,
    pub tool_timeout_secs: u64,
    /// Extra office-suite executables tried before the built-in list
    pub office_paths: Vec<PathBuf>,
    /// Minimum characters a text extraction tool must produce
    pub min_tool_output: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IoConfig {
    /// Scratch area for recovered documents; system temp dir when unset
    pub temp_dir: Option<PathBuf>,
    pub max_upload_bytes: u64,
    pub fetch_timeout_secs: u64,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        DocumentConfig {
            default_font: "SimSun".to_string(),
            default_font_size: 12.0,
            fallback_font: "Times New Roman".to_string(),
            highlight: "yellow".to_string(),
            max_images_per_paragraph: 3,
        }
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        RecoveryConfig {
            conversion_timeout_secs: 60,
            tool_timeout_secs: 30,
            office_paths: Vec::new(),
            min_tool_output: 20,
        }
    }
}

impl Default for IoConfig {
    fn default() -> Self {
        IoConfig {
            temp_dir: None,
            max_upload_bytes: 50 * 1024 * 1024,
            fetch_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load config from file or create default
    pub fn load() -> Result<Self> {
        if let Some(config_path) = Self::get_config_path() {
            if config_path.exists() {
                return Self::from_path(&config_path);
            }
        }

        Ok(Config::default())
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        if let Some(config_path) = Self::get_config_path() {
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }

            let content = toml::to_string_pretty(self)?;
            fs::write(&config_path, content)?;
        }

        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("redliner").join("config.toml"))
    }

    /// Initialize default config file
    pub fn init_default() -> Result<()> {
        Config::default().save()
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.io
            .temp_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("redliner"))
    }

    pub fn text_style(&self) -> TextStyle {
        TextStyle {
            font: self.document.default_font.clone(),
            size: self.document.default_font_size,
        }
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            fallback_font: self.document.fallback_font.clone(),
            max_images_per_paragraph: self.document.max_images_per_paragraph,
        }
    }

    pub fn conversion_timeout(&self) -> Duration {
        Duration::from_secs(self.recovery.conversion_timeout_secs)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.recovery.tool_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.io.fetch_timeout_secs)
    }
}
