// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credential error types.
//!
//! No variant ever carries a secret. Hosts, logins and file paths are the only
//! identifying details that reach a message.

use std::path::PathBuf;

use crate::backend::BackendError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur during credential operations.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
	/// No usable record is stored for the host.
	#[error("not logged in: no credentials stored for {host}")]
	NotLoggedIn { host: String },

	/// The credential file exists but cannot be parsed.
	#[error("credential file {location} is malformed: {detail}")]
	Malformed { location: String, detail: String },

	/// A write or delete against the backing store failed part way.
	#[error("failed to {operation} credentials for {host}")]
	NotCompleted {
		operation: &'static str,
		host: String,
		#[source]
		source: BoxError,
	},

	#[error("secret store error: {0}")]
	Backend(#[from] BackendError),

	#[error("IO error on {}: {source}", .path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("invalid credential: {0}")]
	InvalidInput(String),

	#[error("secret store task failed: {0}")]
	Task(String),
}

impl CredentialError {
	pub(crate) fn not_completed(
		operation: &'static str,
		host: &str,
		source: impl Into<BoxError>,
	) -> Self {
		Self::NotCompleted {
			operation,
			host: host.to_string(),
			source: source.into(),
		}
	}

	pub(crate) fn not_logged_in(host: &str) -> Self {
		Self::NotLoggedIn {
			host: host.to_string(),
		}
	}

	/// True for the conditions a user should fix by running `login`.
	pub fn is_not_logged_in(&self) -> bool {
		matches!(self, Self::NotLoggedIn { .. })
	}
}

impl From<tokio::task::JoinError> for CredentialError {
	fn from(err: tokio::task::JoinError) -> Self {
		CredentialError::Task(err.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_not_completed_keeps_the_cause() {
		let err = CredentialError::not_completed(
			"save",
			"https://v/authn",
			BackendError::Inaccessible("keychain locked".to_string()),
		);

		assert_eq!(err.to_string(), "failed to save credentials for https://v/authn");
		let source = std::error::Error::source(&err).unwrap();
		assert!(source.to_string().contains("keychain locked"));
	}

	#[test]
	fn test_not_logged_in_names_the_host() {
		let err = CredentialError::not_logged_in("https://v/authn");
		assert!(err.is_not_logged_in());
		assert!(err.to_string().contains("https://v/authn"));
	}
}
