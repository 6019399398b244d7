//! Platform-specific configuration paths.
//!
//! - **User config**: `~/.config/signet/` (Linux), `~/Library/Application Support/signet/` (macOS), `%APPDATA%\signet\` (Windows)
//!
//! # Example
//!
//! ```rust,no_run
//! use signet_config::paths;
//!
//! if let Some(path) = paths::find_config(None) {
//!     println!("Using config at: {:?}", path);
//! }
//! ```

use std::path::{Path, PathBuf};

/// Application name used for directory paths.
const APP_NAME: &str = "signet";

/// File name of the renderer configuration.
pub const CONFIG_FILE_NAME: &str = "signet.toml";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the default location of the renderer configuration file.
pub fn default_config_path() -> PathBuf {
    user_config_dir().join(CONFIG_FILE_NAME)
}

/// Locates the configuration file to use.
///
/// Searches in order:
/// 1. `explicit`, if given (returned only if it is a file)
/// 2. `signet.toml` in the current directory
/// 3. [`default_config_path`]
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.is_file().then(|| path.to_path_buf());
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    let user = default_config_path();
    user.is_file().then_some(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_lives_in_user_dir() {
        let path = default_config_path();
        assert!(path.starts_with(user_config_dir()));
        assert!(path.ends_with(CONFIG_FILE_NAME));
    }

    #[test]
    fn explicit_missing_file_is_not_found() {
        assert_eq!(find_config(Some(Path::new("/definitely/not/here.toml"))), None);
    }
}
