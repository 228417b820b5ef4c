use crate::error::{QueryError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "qheal";
const CONFIG_FILE: &str = "config.json";

/// Sanitizer limits and defaults, stored in the app data directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizerConfig {
    /// Maximum number of lexer captures per query before giving up
    #[serde(default = "default_max_captures")]
    pub max_captures: usize,

    /// Maximum lex/sanitize/render rounds before the output must be stable
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Maximum rewrite cycles per scope
    #[serde(default = "default_max_scope_passes")]
    pub max_scope_passes: usize,

    /// Query returned when nothing usable is left
    #[serde(default = "default_fallback")]
    pub fallback: String,

    /// Number of sanitized queries memoized (0 disables the memo)
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_max_captures() -> usize {
    256
}

fn default_max_iterations() -> usize {
    32
}

fn default_max_scope_passes() -> usize {
    16
}

fn default_fallback() -> String {
    "*".to_string()
}

fn default_cache_capacity() -> usize {
    1024
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            max_captures: default_max_captures(),
            max_iterations: default_max_iterations(),
            max_scope_passes: default_max_scope_passes(),
            fallback: default_fallback(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl SanitizerConfig {
    /// Load config from the app data directory, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: SanitizerConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the app data directory, returning where it was written
    pub fn save(&self) -> Result<PathBuf> {
        let path = get_config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Reject limits that would make every query fail
    pub fn validate(&self) -> Result<()> {
        if self.max_captures == 0 {
            return Err(QueryError::Config("max_captures must be at least 1".into()));
        }
        if self.max_iterations == 0 {
            return Err(QueryError::Config("max_iterations must be at least 1".into()));
        }
        if self.max_scope_passes == 0 {
            return Err(QueryError::Config(
                "max_scope_passes must be at least 1".into(),
            ));
        }
        if self.fallback.trim().is_empty() {
            return Err(QueryError::Config("fallback must not be empty".into()));
        }
        Ok(())
    }
}

/// Get the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_app_data_dir()?.join(CONFIG_FILE))
}

/// Get the per-user application data directory
pub fn get_app_data_dir() -> Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir().map(|h| h.join("Library").join("Application Support"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
    } else {
        // Linux/Unix: XDG_DATA_HOME or ~/.local/share
        dirs::data_dir()
    };

    let base =
        base.ok_or_else(|| QueryError::Config("could not determine app data directory".into()))?;
    Ok(base.join(APP_NAME))
}
