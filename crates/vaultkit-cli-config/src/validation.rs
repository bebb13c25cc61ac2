// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration validation rules.

use tracing::warn;
use url::Url;

use crate::runtime::VaultkitConfig;
use crate::ConfigError;

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Validate the configuration.
///
/// Returns Ok(()) if valid, or ConfigError::InvalidValue with details.
pub fn validate_config(config: &VaultkitConfig) -> Result<(), ConfigError> {
	validate_vault(config)?;
	validate_http(config)?;
	validate_logging(config)?;

	Ok(())
}

fn validate_vault(config: &VaultkitConfig) -> Result<(), ConfigError> {
	let Some(raw) = config.vault.url.as_deref() else {
		return Ok(());
	};

	let url = Url::parse(raw)
		.map_err(|e| ConfigError::invalid_value("vault.url", format!("not a valid URL: {e}")))?;

	match url.scheme() {
		"https" => {}
		"http" => warn!(url = %raw, "vault URL is not using TLS"),
		other => {
			return Err(ConfigError::invalid_value(
				"vault.url",
				format!("unsupported scheme '{other}' (expected http or https)"),
			))
		}
	}

	if url.query().is_some() || url.fragment().is_some() {
		return Err(ConfigError::invalid_value(
			"vault.url",
			"must not contain a query or fragment",
		));
	}

	Ok(())
}

fn validate_http(config: &VaultkitConfig) -> Result<(), ConfigError> {
	if config.http.timeout.as_secs() == 0 {
		return Err(ConfigError::invalid_value(
			"http.timeout_secs",
			"must be greater than 0",
		));
	}

	Ok(())
}

fn validate_logging(config: &VaultkitConfig) -> Result<(), ConfigError> {
	let level = config.logging.level.to_ascii_lowercase();
	// Anything with a target or comma is a full filter directive; leave that to
	// the subscriber.
	if level.contains('=') || level.contains(',') {
		return Ok(());
	}

	if !LOG_LEVELS.contains(&level.as_str()) {
		return Err(ConfigError::invalid_value(
			"logging.level",
			format!("unknown level '{level}'"),
		));
	}

	Ok(())
}
