// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: files, environment, CLI, defaults.

use std::path::PathBuf;

use tracing::{debug, trace, warn};

use crate::layer::ConfigLayer;
use crate::paths::PathsConfig;
use crate::ConfigError;

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	UserFile = 30,
	Environment = 50,
	Cli = 60,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	/// Name for logging
	fn name(&self) -> &'static str;

	/// Precedence level
	fn precedence(&self) -> Precedence;

	/// Load configuration layer from this source
	fn load(&self) -> Result<ConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		// Defaults are applied when the runtime config is built.
		Ok(ConfigLayer::default())
	}
}

/// File-based configuration source (TOML).
pub struct FileSource {
	path: PathBuf,
	precedence: Precedence,
	name: &'static str,
}

impl FileSource {
	/// User config: ~/.config/vaultkit/config.toml
	pub fn user(paths: &PathsConfig) -> Self {
		Self::custom(paths.user_config_file.clone(), Precedence::UserFile, "user-config")
	}

	/// Custom file path with specified precedence
	pub fn custom(path: PathBuf, precedence: Precedence, name: &'static str) -> Self {
		Self {
			path,
			precedence,
			name,
		}
	}
}

impl ConfigSource for FileSource {
	fn name(&self) -> &'static str {
		self.name
	}
	fn precedence(&self) -> Precedence {
		self.precedence
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), source = self.name, "config file not found, skipping");
			return Ok(ConfigLayer::default());
		}

		debug!(path = %self.path.display(), source = self.name, "loading config file");

		let content = std::fs::read_to_string(&self.path)?;
		let layer: ConfigLayer = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		trace!(source = self.name, "parsed config layer");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Recognised variables: `VAULTKIT_URL`, `VAULTKIT_ACCOUNT`,
/// `VAULTKIT_CREDENTIAL_STORE`, `VAULTKIT_NETRC_PATH`,
/// `VAULTKIT_HTTP_TIMEOUT_SECS`, `VAULTKIT_LOG_LEVEL`, `VAULTKIT_LOG_FORMAT`.
pub struct EnvSource {
	vars: Vec<(String, String)>,
}

impl EnvSource {
	/// Snapshot the process environment.
	pub fn from_process() -> Self {
		Self::from_vars(std::env::vars())
	}

	pub fn from_vars<I, K, V>(vars: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			vars: vars
				.into_iter()
				.map(|(k, v)| (k.into(), v.into()))
				.collect(),
		}
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		let mut layer = ConfigLayer::default();

		for (key, value) in &self.vars {
			if !key.starts_with("VAULTKIT_") {
				continue;
			}

			let value = value.trim().to_string();
			if value.is_empty() {
				continue;
			}

			trace!(key = %key, "processing env var");

			match key.as_str() {
				"VAULTKIT_URL" => layer.vault_mut().url = Some(value),
				"VAULTKIT_ACCOUNT" => layer.vault_mut().account = Some(value),
				"VAULTKIT_CREDENTIAL_STORE" => layer.credentials_mut().store = Some(value),
				"VAULTKIT_NETRC_PATH" => {
					layer.credentials_mut().netrc_path = Some(PathBuf::from(value))
				}
				"VAULTKIT_HTTP_TIMEOUT_SECS" => match value.parse() {
					Ok(v) => layer.http_mut().timeout_secs = Some(v),
					Err(_) => {
						return Err(ConfigError::invalid_value(
							key.as_str(),
							"must be a whole number of seconds",
						))
					}
				},
				"VAULTKIT_LOG_LEVEL" => layer.logging_mut().level = Some(value),
				"VAULTKIT_LOG_FORMAT" => layer.logging_mut().format = Some(value),
				_ => {
					warn!(key = %key, "ignoring unknown VAULTKIT_ environment variable");
				}
			}
		}

		Ok(layer)
	}
}

/// CLI override source.
pub struct CliSource {
	overrides: CliOverrides,
}

/// CLI argument overrides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
	pub url: Option<String>,
	pub account: Option<String>,
	pub credential_store: Option<String>,
	pub log_level: Option<String>,
	pub log_format: Option<String>,
	pub config_file: Option<PathBuf>,
}

impl CliSource {
	pub fn new(overrides: CliOverrides) -> Self {
		Self { overrides }
	}
}

impl ConfigSource for CliSource {
	fn name(&self) -> &'static str {
		"cli"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Cli
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading CLI overrides");
		let mut layer = ConfigLayer::default();
		let overrides = &self.overrides;

		if let Some(url) = &overrides.url {
			layer.vault_mut().url = Some(url.clone());
		}
		if let Some(account) = &overrides.account {
			layer.vault_mut().account = Some(account.clone());
		}
		if let Some(store) = &overrides.credential_store {
			layer.credentials_mut().store = Some(store.clone());
		}
		if let Some(level) = &overrides.log_level {
			layer.logging_mut().level = Some(level.clone());
		}
		if let Some(format) = &overrides.log_format {
			layer.logging_mut().format = Some(format.clone());
		}

		Ok(layer)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_precedence_ordering() {
		assert!(Precedence::Cli > Precedence::Environment);
		assert!(Precedence::Environment > Precedence::UserFile);
		assert!(Precedence::UserFile > Precedence::Defaults);
	}

	#[test]
	fn test_file_source_missing_file_returns_empty() {
		let source = FileSource::custom(
			PathBuf::from("/nonexistent/config.toml"),
			Precedence::UserFile,
			"test",
		);
		let layer = source.load().unwrap();
		assert!(layer.vault.is_none());
	}

	#[test]
	fn test_file_source_reports_parse_errors_with_path() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.toml");
		std::fs::write(&path, "[vault\nurl = 1").unwrap();

		let err = FileSource::custom(path.clone(), Precedence::UserFile, "test")
			.load()
			.unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { path: p, .. } if p == path));
	}

	#[test]
	fn test_env_source_maps_known_variables() {
		let source = EnvSource::from_vars([
			("VAULTKIT_URL", "https://vault.example.com"),
			("VAULTKIT_ACCOUNT", " myorg "),
			("VAULTKIT_CREDENTIAL_STORE", "file"),
			("VAULTKIT_NETRC_PATH", "/tmp/netrc"),
			("VAULTKIT_HTTP_TIMEOUT_SECS", "7"),
			("VAULTKIT_LOG_LEVEL", "debug"),
			("VAULTKIT_LOG_FORMAT", ""),
			("HOME", "/home/me"),
		]);

		let layer = source.load().unwrap();
		let vault = layer.vault.unwrap();
		assert_eq!(vault.url.as_deref(), Some("https://vault.example.com"));
		assert_eq!(vault.account.as_deref(), Some("myorg"));
		let credentials = layer.credentials.unwrap();
		assert_eq!(credentials.store.as_deref(), Some("file"));
		assert_eq!(credentials.netrc_path, Some(PathBuf::from("/tmp/netrc")));
		assert_eq!(layer.http.unwrap().timeout_secs, Some(7));
		let logging = layer.logging.unwrap();
		assert_eq!(logging.level.as_deref(), Some("debug"));
		assert!(logging.format.is_none());
	}

	#[test]
	fn test_env_source_rejects_bad_timeout() {
		let source = EnvSource::from_vars([("VAULTKIT_HTTP_TIMEOUT_SECS", "soon")]);
		assert!(matches!(
			source.load().unwrap_err(),
			ConfigError::InvalidValue { .. }
		));
	}

	#[test]
	fn test_cli_source_sets_only_given_fields() {
		let source = CliSource::new(CliOverrides {
			account: Some("cli-acct".to_string()),
			log_format: Some("json".to_string()),
			..Default::default()
		});

		let layer = source.load().unwrap();
		let vault = layer.vault.unwrap();
		assert!(vault.url.is_none());
		assert_eq!(vault.account.as_deref(), Some("cli-acct"));
		assert!(layer.credentials.is_none());
		assert_eq!(layer.logging.unwrap().format.as_deref(), Some("json"));
	}
}
