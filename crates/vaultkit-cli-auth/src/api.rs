// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The vault operations authentication depends on.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use vaultkit_common_secret::SecretString;

use crate::error::AuthError;

/// Base URL plus organisation account: everything needed to address the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultEndpoint {
	url: String,
	account: String,
}

impl VaultEndpoint {
	pub fn new(url: &str, account: &str) -> Result<Self, AuthError> {
		let url = url.trim().trim_end_matches('/');
		let account = account.trim();
		if url.is_empty() {
			return Err(AuthError::InvalidInput("vault url must not be empty".to_string()));
		}
		if account.is_empty() {
			return Err(AuthError::InvalidInput("vault account must not be empty".to_string()));
		}
		Ok(Self {
			url: url.to_string(),
			account: account.to_string(),
		})
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	pub fn account(&self) -> &str {
		&self.account
	}

	/// Key under which credentials for this vault are stored.
	pub fn credential_host(&self) -> String {
		format!("{}/authn", self.url)
	}
}

/// Another principal, written `kind:id` (for example `host:ci/runner`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleId {
	pub kind: String,
	pub id: String,
}

impl FromStr for RoleId {
	type Err = AuthError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().split_once(':') {
			Some((kind, id)) if !kind.is_empty() && !id.is_empty() => Ok(Self {
				kind: kind.to_string(),
				id: id.to_string(),
			}),
			_ => Err(AuthError::InvalidInput(format!(
				"role '{s}' must have the form kind:id"
			))),
		}
	}
}

impl fmt::Display for RoleId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.kind, self.id)
	}
}

#[async_trait]
pub trait VaultApi: Send + Sync + fmt::Debug {
	/// Exchange a login password for the principal's API key.
	async fn login(
		&self,
		endpoint: &VaultEndpoint,
		login: &str,
		password: &SecretString,
	) -> Result<SecretString, AuthError>;

	/// Exchange an API key for a short-lived access token.
	async fn authenticate(
		&self,
		endpoint: &VaultEndpoint,
		login: &str,
		api_key: &SecretString,
	) -> Result<SecretString, AuthError>;

	/// Replace the caller's own API key, authenticating with the current one.
	async fn rotate_own_api_key(
		&self,
		endpoint: &VaultEndpoint,
		login: &str,
		api_key: &SecretString,
	) -> Result<SecretString, AuthError>;

	/// Replace another principal's API key, authorised by an access token.
	async fn rotate_api_key(
		&self,
		endpoint: &VaultEndpoint,
		role: &RoleId,
		token: &SecretString,
	) -> Result<SecretString, AuthError>;

	async fn whoami(
		&self,
		endpoint: &VaultEndpoint,
		token: &SecretString,
	) -> Result<serde_json::Value, AuthError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_endpoint_trims_and_builds_host() {
		let endpoint = VaultEndpoint::new("https://vault.example.com//", " myorg ").unwrap();
		assert_eq!(endpoint.url(), "https://vault.example.com");
		assert_eq!(endpoint.account(), "myorg");
		assert_eq!(
			endpoint.credential_host(),
			"https://vault.example.com/authn"
		);
	}

	#[test]
	fn test_endpoint_requires_both_fields() {
		assert!(VaultEndpoint::new("", "org").is_err());
		assert!(VaultEndpoint::new("https://v", "  ").is_err());
	}

	#[test]
	fn test_role_id_parsing() {
		let role: RoleId = "host:ci/runner:1".parse().unwrap();
		assert_eq!(role.kind, "host");
		assert_eq!(role.id, "ci/runner:1");
		assert_eq!(role.to_string(), "host:ci/runner:1");

		assert!("admin".parse::<RoleId>().is_err());
		assert!(":admin".parse::<RoleId>().is_err());
	}
}
