//! Gateway configuration: the `gateway.toml` schema and where it lives
//!
//! The file is optional. `pc-gateway` falls back to built-in defaults when
//! it is absent, and command-line flags override whatever it contains.

mod gateway;
pub mod serde_utils;

pub use gateway::{GatewayConfig, ScanSettings, SshSettings, MIN_SCAN_PREFIX};

use crate::error::ConfigError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Directory holding `gateway.toml` (`~/.config/picontrol` on Linux).
///
/// Falls back to the working directory when the platform reports no
/// config directory, as on some headless images.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("picontrol")
}

/// Path `pc-gateway` reads when `--config` is not given
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("gateway.toml")
}

/// Read and parse a TOML file.
///
/// A missing file is reported as [`ConfigError::NotFound`] so callers can
/// tell "use defaults" apart from a file that is present but broken.
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ConfigError::NotFound(path.to_path_buf()))
        }
        Err(e) => {
            return Err(ConfigError::Invalid(format!(
                "cannot read {}: {}",
                path.display(),
                e
            )))
        }
    };

    Ok(toml::from_str(&content)?)
}

/// Write `config` as TOML, creating parent directories as needed
pub fn save_config<T: serde::Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    let rendered = toml::to_string_pretty(config)?;

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| {
            ConfigError::Invalid(format!("cannot create {}: {}", dir.display(), e))
        })?;
    }

    std::fs::write(path, rendered)
        .map_err(|e| ConfigError::Invalid(format!("cannot write {}: {}", path.display(), e)))
}
