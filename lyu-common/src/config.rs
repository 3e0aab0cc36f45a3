//! Configuration loading and lyrics root folder resolution
//!
//! Settings live in a small TOML file under the user's config directory. The
//! file is optional: when it is missing or unreadable a warning is logged and
//! built-in defaults apply.
//!
//! # Root folder priority
//!
//! 1. Command-line argument
//! 2. `LYRICUSER_ROOT_FOLDER` environment variable
//! 3. `last_opened_folder` from the TOML file
//! 4. `root_folder` from the TOML file
//! 5. Compiled default (`~/Documents/Lyrics`, else `./Lyrics`)

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, Result};

/// Environment variable overriding the lyrics root folder
pub const ROOT_FOLDER_ENV: &str = "LYRICUSER_ROOT_FOLDER";

const APP_DIR_NAME: &str = "lyricuser";
const CONFIG_FILE_NAME: &str = "config.toml";
const DEFAULT_LIBRARY_DIR: &str = "Lyrics";

/// Persistent user settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Lyrics library folder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_folder: Option<PathBuf>,

    /// Folder most recently opened; wins over `root_folder`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_opened_folder: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (logs to stderr if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
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

fn default_log_level() -> String {
    "info".to_string()
}

/// Built-in fallbacks used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = dirs::document_dir()
            .map(|d| d.join(DEFAULT_LIBRARY_DIR))
            .unwrap_or_else(|| PathBuf::from(".").join(DEFAULT_LIBRARY_DIR));

        Self {
            root_folder,
            log_level: default_log_level(),
        }
    }
}

/// Default location of the config file for this user
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
}

/// Load the config at `path`, or defaults if there is none.
///
/// Never fails: a missing file is expected on first run, and a broken one is
/// reported with a warning.
pub fn load_or_default(path: Option<&Path>) -> TomlConfig {
    let Some(path) = path else {
        warn!("Could not determine config directory, using default configuration");
        return TomlConfig::default();
    };

    if !path.exists() {
        debug!("No config file at {}, using defaults", path.display());
        return TomlConfig::default();
    }

    match load_toml_config(path) {
        Ok(config) => config,
        Err(e) => {
            warn!("{}; using default configuration", e);
            TomlConfig::default()
        }
    }
}

/// Write `config` to `path` through a temporary file and a rename, so the
/// target is either the old or the new content, never a partial write
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    fs::write(&temp_path, content).map_err(|e| Error::io(&temp_path, e))?;
    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::io(path, e));
    }

    debug!("Saved configuration to {}", path.display());
    Ok(())
}

/// Record `folder` as the last opened folder, keeping every other setting
pub fn remember_last_opened_folder(config_path: &Path, folder: &Path) -> Result<()> {
    let mut config = if config_path.exists() {
        load_toml_config(config_path)?
    } else {
        TomlConfig::default()
    };

    if config.last_opened_folder.as_deref() == Some(folder) {
        return Ok(());
    }

    config.last_opened_folder = Some(folder.to_path_buf());
    write_toml_config(&config, config_path)
}

/// Resolves the lyrics root folder from the configured sources
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    config: TomlConfig,
}

impl RootFolderResolver {
    pub fn new(config: TomlConfig) -> Self {
        Self {
            cli_arg: None,
            config,
        }
    }

    pub fn with_cli_arg(mut self, cli_arg: Option<PathBuf>) -> Self {
        self.cli_arg = cli_arg;
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Some(path) = std::env::var_os(ROOT_FOLDER_ENV).filter(|v| !v.is_empty()) {
            return PathBuf::from(path);
        }

        if let Some(path) = &self.config.last_opened_folder {
            return path.clone();
        }

        if let Some(path) = &self.config.root_folder {
            return path.clone();
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}
