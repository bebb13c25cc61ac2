// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! XDG Base Directory compliant path resolution.

use std::path::{Path, PathBuf};

use crate::ConfigError;

/// Resolved paths for vaultkit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathsConfig {
	/// User config file: ~/.config/vaultkit/config.toml
	pub user_config_file: PathBuf,
}

impl PathsConfig {
	/// Paths under an explicit config home (`$XDG_CONFIG_HOME`).
	pub fn rooted(config_home: &Path) -> Self {
		Self {
			user_config_file: config_home.join("vaultkit/config.toml"),
		}
	}

	/// Get the config directory (parent of user_config_file)
	pub fn config_dir(&self) -> PathBuf {
		self
			.user_config_file
			.parent()
			.map(|p| p.to_path_buf())
			.unwrap_or_else(|| self.user_config_file.clone())
	}
}

/// Resolve paths according to the Base Directory Specification.
///
/// Uses `XDG_CONFIG_HOME` if set, otherwise `~/.config`.
pub fn resolve_xdg_paths() -> Result<PathsConfig, ConfigError> {
	let home = dirs::home_dir().ok_or(ConfigError::HomeDirNotFound)?;

	let config_home = std::env::var_os("XDG_CONFIG_HOME")
		.filter(|v| !v.is_empty())
		.map(PathBuf::from)
		.unwrap_or_else(|| home.join(".config"));

	tracing::debug!(config_home = %config_home.display(), "resolved XDG paths");

	Ok(PathsConfig::rooted(&config_home))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_rooted_paths() {
		let paths = PathsConfig::rooted(Path::new("/home/me/.config"));
		assert_eq!(
			paths.user_config_file,
			PathBuf::from("/home/me/.config/vaultkit/config.toml")
		);
		assert!(paths.config_dir().ends_with("vaultkit"));
	}

	#[test]
	fn test_resolve_xdg_paths_succeeds() {
		let paths = resolve_xdg_paths().unwrap();
		assert!(paths
			.user_config_file
			.to_string_lossy()
			.contains("vaultkit"));
	}
}
