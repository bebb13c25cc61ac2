// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The credential store interface shared by both backends.

use async_trait::async_trait;
use vaultkit_common_secret::SecretString;

use crate::error::CredentialError;
use crate::record::{CredentialRecord, Lookup, StoreKind};

/// Storage for long-lived vault credentials, keyed by host.
///
/// Both implementations share namespaces with other tools (the netrc file, the
/// OS keychain), so every operation touches only the entries for the host it
/// was given.
#[async_trait]
pub trait CredentialStore: Send + Sync + std::fmt::Debug {
	fn kind(&self) -> StoreKind;

	/// Human-readable location for diagnostics: a file path or a named OS store.
	fn describe_location(&self) -> String;

	/// Look up the record for `host` without treating absence as an error.
	async fn lookup(&self, host: &str) -> Result<Lookup, CredentialError>;

	/// Insert or replace the record for `record.host()`.
	async fn save(&self, record: &CredentialRecord) -> Result<(), CredentialError>;

	/// Replace the login/secret tuple stored for `old.host()`.
	async fn update_secret(
		&self,
		new_login: &str,
		old: &CredentialRecord,
		new_secret: &SecretString,
	) -> Result<(), CredentialError>;

	/// Remove the record for `host`.
	async fn remove(&self, host: &str) -> Result<(), CredentialError>;

	/// Repair a partially written record by deleting whatever pieces of it exist.
	async fn cleanup_if_present(&self, _host: &str) -> Result<(), CredentialError> {
		Ok(())
	}

	/// Load the record for `host`, failing with `NotLoggedIn` when absent.
	async fn load(&self, host: &str) -> Result<CredentialRecord, CredentialError> {
		self.lookup(host)
			.await?
			.into_record(host, &self.describe_location())
	}

	async fn is_present(&self, host: &str) -> Result<bool, CredentialError> {
		Ok(self.lookup(host).await?.is_found())
	}
}
