// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authentication error types.

use vaultkit_cli_config::ConfigError;
use vaultkit_cli_credentials::CredentialError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
	/// The vault rejected the credentials (401/403). Never retried.
	#[error("unauthorized")]
	Unauthorized,

	#[error("not found: {0}")]
	NotFound(String),

	/// Any other non-success status. The body is not kept; vault error
	/// bodies can quote the submitted key.
	#[error("vault returned HTTP {status}")]
	Http { status: u16, body_len: usize },

	#[error("request to vault failed: {0}")]
	Transport(#[source] reqwest::Error),

	#[error("unexpected response from vault: {0}")]
	InvalidResponse(String),

	#[error("invalid input: {0}")]
	InvalidInput(String),

	#[error(transparent)]
	Credential(#[from] CredentialError),

	#[error(transparent)]
	Config(#[from] ConfigError),
}

impl AuthError {
	pub fn is_not_logged_in(&self) -> bool {
		matches!(self, Self::Credential(e) if e.is_not_logged_in())
	}

	pub fn is_unauthorized(&self) -> bool {
		matches!(self, Self::Unauthorized)
	}
}
