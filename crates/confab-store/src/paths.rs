//! Unified path management for confab configuration files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/confab/            # Config directory
//! ├── config.toml              # Application configuration
//! ├── secret.json              # API keys and secrets
//! └── conversations/           # Conversation records (dir backend)
//! ```

use std::path::PathBuf;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Unified path management for confab.
pub struct ConfabPaths;

impl ConfabPaths {
    /// Returns the confab configuration directory.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)`: Path to config directory (e.g., `~/.config/confab/`)
    /// - `Err(PathError::HomeDirNotFound)`: Could not determine directory
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join("confab"))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the path to the secrets file.
    ///
    /// # Security Note
    ///
    /// Ensure this file has appropriate permissions (e.g., 600) to prevent
    /// unauthorized access.
    pub fn secret_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("secret.json"))
    }

    /// Returns the path to the conversations directory used by the
    /// directory-backed store.
    pub fn conversations_dir() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("conversations"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir() {
        let config_dir = ConfabPaths::config_dir().unwrap();
        assert!(config_dir.ends_with("confab"));
    }

    #[test]
    fn test_config_file() {
        let config_file = ConfabPaths::config_file().unwrap();
        assert!(config_file.ends_with("config.toml"));
        let config_dir = ConfabPaths::config_dir().unwrap();
        assert!(config_file.starts_with(&config_dir));
    }

    #[test]
    fn test_secret_file() {
        let secret_file = ConfabPaths::secret_file().unwrap();
        assert!(secret_file.ends_with("secret.json"));
    }

    #[test]
    fn test_conversations_dir() {
        let conversations_dir = ConfabPaths::conversations_dir().unwrap();
        assert!(conversations_dir.ends_with("conversations"));
        let config_dir = ConfabPaths::config_dir().unwrap();
        assert!(conversations_dir.starts_with(&config_dir));
    }
}
