// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Runtime configuration types with resolved defaults.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::layer::*;
use crate::paths::PathsConfig;
use crate::ConfigError;

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// The final, validated configuration for vaultkit.
#[derive(Debug, Clone, Serialize)]
pub struct VaultkitConfig {
	pub vault: VaultConfig,
	pub credentials: CredentialsConfig,
	pub http: HttpConfig,
	pub logging: LoggingConfig,

	#[serde(skip)]
	pub paths: PathsConfig,
}

/// Where the vault lives. Both fields are optional at load time so that
/// commands which never talk to the vault still run without them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VaultConfig {
	pub url: Option<String>,
	pub account: Option<String>,
}

impl VaultConfig {
	pub fn require_url(&self) -> Result<&str, ConfigError> {
		self.url
			.as_deref()
			.ok_or_else(|| ConfigError::missing_field("vault.url"))
	}

	pub fn require_account(&self) -> Result<&str, ConfigError> {
		self.account
			.as_deref()
			.ok_or_else(|| ConfigError::missing_field("vault.account"))
	}
}

/// Which credential store to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreChoice {
	/// OS secret store if usable, netrc file otherwise.
	#[default]
	Auto,
	File,
	Keyring,
}

impl FromStr for StoreChoice {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"auto" => Ok(Self::Auto),
			"file" | "netrc" | "plaintext" => Ok(Self::File),
			"keyring" | "keychain" | "secure" => Ok(Self::Keyring),
			other => Err(ConfigError::invalid_value(
				"credentials.store",
				format!("unknown store '{other}' (expected auto, file or keyring)"),
			)),
		}
	}
}

impl fmt::Display for StoreChoice {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Auto => "auto",
			Self::File => "file",
			Self::Keyring => "keyring",
		})
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct CredentialsConfig {
	pub store: StoreChoice,
	/// `None` means the netrc in the home directory.
	pub netrc_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HttpConfig {
	pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	#[default]
	Compact,
	Pretty,
	Json,
}

impl FromStr for LogFormat {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"compact" | "text" => Ok(Self::Compact),
			"pretty" => Ok(Self::Pretty),
			"json" => Ok(Self::Json),
			other => Err(ConfigError::invalid_value(
				"logging.format",
				format!("unknown format '{other}' (expected compact, pretty or json)"),
			)),
		}
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct LoggingConfig {
	/// An `EnvFilter` directive, usually a bare level.
	pub level: String,
	pub format: LogFormat,
}

impl VaultkitConfig {
	/// Apply defaults to a merged layer.
	pub fn from_layer(layer: ConfigLayer, paths: PathsConfig) -> Result<Self, ConfigError> {
		let vault = layer.vault.unwrap_or_default();
		let credentials = layer.credentials.unwrap_or_default();
		let http = layer.http.unwrap_or_default();
		let logging = layer.logging.unwrap_or_default();

		let store = credentials
			.store
			.as_deref()
			.map(StoreChoice::from_str)
			.transpose()?
			.unwrap_or_default();

		let format = logging
			.format
			.as_deref()
			.map(LogFormat::from_str)
			.transpose()?
			.unwrap_or_default();

		Ok(Self {
			vault: VaultConfig {
				url: non_empty(vault.url).map(|u| u.trim_end_matches('/').to_string()),
				account: non_empty(vault.account),
			},
			credentials: CredentialsConfig {
				store,
				netrc_path: credentials.netrc_path,
			},
			http: HttpConfig {
				timeout: Duration::from_secs(http.timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS)),
			},
			logging: LoggingConfig {
				level: non_empty(logging.level).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
				format,
			},
			paths,
		})
	}
}

fn non_empty(value: Option<String>) -> Option<String> {
	value
		.map(|v| v.trim().to_string())
		.filter(|v| !v.is_empty())
}
