// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration layer for merging from multiple sources.

use serde::Deserialize;
use std::path::PathBuf;

/// Partial configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
	#[serde(default)]
	pub vault: Option<VaultLayer>,
	#[serde(default)]
	pub credentials: Option<CredentialsLayer>,
	#[serde(default)]
	pub http: Option<HttpLayer>,
	#[serde(default)]
	pub logging: Option<LoggingLayer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VaultLayer {
	#[serde(default)]
	pub url: Option<String>,
	#[serde(default)]
	pub account: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialsLayer {
	/// `auto`, `file` or `keyring`.
	#[serde(default)]
	pub store: Option<String>,
	#[serde(default)]
	pub netrc_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpLayer {
	#[serde(default)]
	pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingLayer {
	#[serde(default)]
	pub level: Option<String>,
	#[serde(default)]
	pub format: Option<String>,
}

impl ConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: ConfigLayer) {
		merge_option(&mut self.vault, other.vault, VaultLayer::merge);
		merge_option(&mut self.credentials, other.credentials, CredentialsLayer::merge);
		merge_option(&mut self.http, other.http, HttpLayer::merge);
		merge_option(&mut self.logging, other.logging, LoggingLayer::merge);
	}

	pub(crate) fn vault_mut(&mut self) -> &mut VaultLayer {
		self.vault.get_or_insert_with(VaultLayer::default)
	}

	pub(crate) fn credentials_mut(&mut self) -> &mut CredentialsLayer {
		self.credentials.get_or_insert_with(CredentialsLayer::default)
	}

	pub(crate) fn http_mut(&mut self) -> &mut HttpLayer {
		self.http.get_or_insert_with(HttpLayer::default)
	}

	pub(crate) fn logging_mut(&mut self) -> &mut LoggingLayer {
		self.logging.get_or_insert_with(LoggingLayer::default)
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}

fn merge_field<T>(target: &mut Option<T>, source: Option<T>) {
	if source.is_some() {
		*target = source;
	}
}

impl VaultLayer {
	fn merge(&mut self, other: VaultLayer) {
		merge_field(&mut self.url, other.url);
		merge_field(&mut self.account, other.account);
	}
}

impl CredentialsLayer {
	fn merge(&mut self, other: CredentialsLayer) {
		merge_field(&mut self.store, other.store);
		merge_field(&mut self.netrc_path, other.netrc_path);
	}
}

impl HttpLayer {
	fn merge(&mut self, other: HttpLayer) {
		merge_field(&mut self.timeout_secs, other.timeout_secs);
	}
}

impl LoggingLayer {
	fn merge(&mut self, other: LoggingLayer) {
		merge_field(&mut self.level, other.level);
		merge_field(&mut self.format, other.format);
	}
}
