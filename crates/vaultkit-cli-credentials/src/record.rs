// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credential record and lookup result types.

use std::fmt;
use std::str::FromStr;

use vaultkit_common_secret::SecretString;

use crate::error::CredentialError;

/// One stored identity: which vault endpoint, which principal, which API key.
///
/// `host` is the primary key inside a store. The `Debug` output redacts the
/// secret, so records can be logged with `?record`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
	host: String,
	login: String,
	secret: SecretString,
}

impl CredentialRecord {
	/// Build a record, rejecting empty fields.
	pub fn new(
		host: impl Into<String>,
		login: impl Into<String>,
		secret: SecretString,
	) -> Result<Self, CredentialError> {
		let host = host.into();
		let login = login.into();

		if host.trim().is_empty() {
			return Err(CredentialError::InvalidInput("host must not be empty".to_string()));
		}
		if login.trim().is_empty() {
			return Err(CredentialError::InvalidInput("login must not be empty".to_string()));
		}
		if secret.is_blank() {
			return Err(CredentialError::InvalidInput(format!(
				"secret for {login} must not be empty"
			)));
		}

		Ok(Self {
			host,
			login,
			secret,
		})
	}

	pub fn host(&self) -> &str {
		&self.host
	}

	pub fn login(&self) -> &str {
		&self.login
	}

	pub fn secret(&self) -> &SecretString {
		&self.secret
	}

	/// Same host, new login/secret tuple. Used by key rotation.
	pub fn rotated(&self, login: &str, secret: SecretString) -> Result<Self, CredentialError> {
		Self::new(self.host.clone(), login, secret)
	}
}

/// Outcome of looking a host up in a store.
///
/// "Not logged in" is an ordinary answer here rather than an error; callers
/// that need a hard failure go through [`Lookup::into_record`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
	Found(CredentialRecord),
	NotFound,
	Malformed(String),
}

impl Lookup {
	pub fn is_found(&self) -> bool {
		matches!(self, Lookup::Found(_))
	}

	pub fn into_record(self, host: &str, location: &str) -> Result<CredentialRecord, CredentialError> {
		match self {
			Lookup::Found(record) => Ok(record),
			Lookup::NotFound => Err(CredentialError::not_logged_in(host)),
			Lookup::Malformed(detail) => Err(CredentialError::Malformed {
				location: location.to_string(),
				detail,
			}),
		}
	}
}

/// The two kinds of backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
	/// netrc-format file in the home directory.
	Plaintext,
	/// OS-native secret store.
	Secure,
}

impl fmt::Display for StoreKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			StoreKind::Plaintext => f.write_str("file"),
			StoreKind::Secure => f.write_str("keyring"),
		}
	}
}

impl FromStr for StoreKind {
	type Err = CredentialError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"file" | "plaintext" | "netrc" => Ok(StoreKind::Plaintext),
			"keyring" | "secure" | "keychain" => Ok(StoreKind::Secure),
			other => Err(CredentialError::InvalidInput(format!(
				"unknown credential store '{other}', expected 'file' or 'keyring'"
			))),
		}
	}
}
