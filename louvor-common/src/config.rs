//! Configuration loading and root folder resolution
//!
//! Every module resolves one root folder that holds its database. The
//! resolution order, highest priority first:
//!
//! 1. Command-line argument (checked by the binary before calling here)
//! 2. Environment variable (`LOUVOR_ROOT_FOLDER`, then `LOUVOR_ROOT`)
//! 3. Per-module TOML config file under the platform config directory
//! 4. Compiled platform default
//!
//! Missing or unreadable config files never abort startup; they log a
//! warning and fall through to the next tier.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Compiled fallback configuration for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl CompiledDefaults {
    /// Defaults for the platform this binary was compiled for
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/louvor
        dirs::data_local_dir()
            .map(|dir| dir.join("louvor"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/louvor"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/louvor
        dirs::data_dir()
            .map(|dir| dir.join("louvor"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/louvor"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\louvor
        dirs::data_local_dir()
            .map(|dir| dir.join("louvor"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\louvor"))
    } else {
        PathBuf::from("./louvor_data")
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Logging section of a module config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Per-module TOML configuration file schema
///
/// All fields are optional; missing fields deserialize to defaults so
/// old config files keep working as the schema grows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub root_folder: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Days before a newly added song becomes eligible for sharing
    #[serde(default)]
    pub share_delay_days: Option<i64>,
}

/// Resolves the root folder for one module
///
/// Command-line arguments take priority over everything here; binaries
/// check their `--root-folder` flag before calling [`resolve`].
///
/// [`resolve`]: RootFolderResolver::resolve
pub struct RootFolderResolver {
    module_name: String,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
        }
    }

    /// Resolve the root folder through the environment, the module
    /// config file, and the compiled default, in that order
    pub fn resolve(&self) -> PathBuf {
        if let Ok(path) = std::env::var("LOUVOR_ROOT_FOLDER") {
            debug!("Root folder from LOUVOR_ROOT_FOLDER: {}", path);
            return PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("LOUVOR_ROOT") {
            debug!("Root folder from LOUVOR_ROOT: {}", path);
            return PathBuf::from(path);
        }

        if let Some(config) = self.toml_config() {
            if let Some(root_folder) = config.root_folder {
                debug!(
                    "Root folder from config file for module '{}'",
                    self.module_name
                );
                return root_folder;
            }
        }

        CompiledDefaults::for_current_platform().root_folder
    }

    /// Load this module's TOML config file, if one exists and parses
    pub fn toml_config(&self) -> Option<TomlConfig> {
        let path = self.config_file_path()?;
        if !path.exists() {
            return None;
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Could not read config file {}: {}", path.display(), e);
                return None;
            }
        };
        match toml::from_str(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("Could not parse config file {}: {}", path.display(), e);
                None
            }
        }
    }

    fn config_file_path(&self) -> Option<PathBuf> {
        // e.g. ~/.config/louvor/<module>.toml on Linux
        dirs::config_dir()
            .map(|dir| dir.join("louvor").join(format!("{}.toml", self.module_name)))
    }
}

/// Prepares a resolved root folder for use
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Path of the module database inside the root folder
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join("louvor.db")
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    /// Create the root folder (and parents) if missing
    ///
    /// Safe to call when the folder already exists.
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        Ok(())
    }
}
