// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secure credential store backed by an OS secret store.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use vaultkit_common_secret::SecretString;

use crate::backend::{BackendError, SecretBackend};
use crate::error::CredentialError;
use crate::record::{CredentialRecord, Lookup, StoreKind};
use crate::store::CredentialStore;

pub const SLOT_MACHINE: &str = "machine";
pub const SLOT_LOGIN: &str = "login";
pub const SLOT_PASSWORD: &str = "password";
const SLOTS: [&str; 3] = [SLOT_MACHINE, SLOT_LOGIN, SLOT_PASSWORD];

const PROBE_SERVICE: &str = "vaultkit-access-probe";
const PROBE_SLOT: &str = "probe";
const PROBE_VALUE: &str = "ok";

/// Credential store that writes one record as three `(host, slot)` entries.
///
/// Slot writes are independent and never rolled back, so a failed save can
/// leave one or two slots behind. Such a record reads as absent and
/// [`CredentialStore::cleanup_if_present`] removes the leftovers.
#[derive(Debug, Clone)]
pub struct SecureCredentialStore {
	backend: Arc<dyn SecretBackend>,
}

impl SecureCredentialStore {
	pub fn new(backend: Arc<dyn SecretBackend>) -> Self {
		Self { backend }
	}

	pub fn backend_name(&self) -> &str {
		self.backend.name()
	}

	/// Write, read back and delete a throwaway slot. Any failure, including a
	/// read-back that does not match, means the store is not usable.
	pub async fn is_accessible(&self) -> bool {
		let result = self
			.run(|backend| {
				backend.set(PROBE_SERVICE, PROBE_SLOT, PROBE_VALUE)?;
				let read_back = backend.get(PROBE_SERVICE, PROBE_SLOT)?;
				if let Err(e) = backend.delete(PROBE_SERVICE, PROBE_SLOT) {
					debug!(error = %e, "failed to delete secret store probe slot");
				}
				Ok(read_back.is_some_and(|v| v.expose() == PROBE_VALUE))
			})
			.await;

		match result {
			Ok(accessible) => {
				debug!(backend = %self.backend.name(), accessible, "probed secret store");
				accessible
			}
			Err(e) => {
				debug!(backend = %self.backend.name(), error = %e, "secret store is not accessible");
				false
			}
		}
	}

	/// Run a blocking backend call on the blocking pool.
	async fn run<T, F>(&self, f: F) -> Result<T, CredentialError>
	where
		T: Send + 'static,
		F: FnOnce(&dyn SecretBackend) -> Result<T, CredentialError> + Send + 'static,
	{
		let backend = self.backend.clone();
		tokio::task::spawn_blocking(move || f(backend.as_ref())).await?
	}
}

fn delete_slots(backend: &dyn SecretBackend, host: &str, only_existing: bool) {
	for slot in SLOTS {
		if only_existing {
			match backend.get(host, slot) {
				Ok(Some(_)) => {}
				Ok(None) => continue,
				Err(e) => {
					warn!(host = %host, slot, error = %e, "failed to read credential slot during cleanup");
					continue;
				}
			}
		}

		match backend.delete(host, slot) {
			Ok(()) => debug!(host = %host, slot, "deleted credential slot"),
			Err(BackendError::NoEntry) => debug!(host = %host, slot, "credential slot already absent"),
			Err(e) => warn!(host = %host, slot, error = %e, "failed to delete credential slot"),
		}
	}
}

#[async_trait]
impl CredentialStore for SecureCredentialStore {
	fn kind(&self) -> StoreKind {
		StoreKind::Secure
	}

	fn describe_location(&self) -> String {
		format!("OS secret store ({})", self.backend.name())
	}

	async fn lookup(&self, host: &str) -> Result<Lookup, CredentialError> {
		let host = host.to_string();
		self.run(move |backend| {
			let machine = backend.get(&host, SLOT_MACHINE)?;
			let login = backend.get(&host, SLOT_LOGIN)?;
			let password = backend.get(&host, SLOT_PASSWORD)?;

			match (machine, login, password) {
				(Some(machine), Some(login), Some(password)) => Ok(Lookup::Found(CredentialRecord::new(
					machine.expose().clone(),
					login.expose().clone(),
					password,
				)?)),
				(None, None, None) => Ok(Lookup::NotFound),
				_ => {
					debug!(host = %host, "credential record is only partially written");
					Ok(Lookup::NotFound)
				}
			}
		})
		.await
	}

	async fn save(&self, record: &CredentialRecord) -> Result<(), CredentialError> {
		let record = record.clone();
		self.run(move |backend| {
			let host = record.host();
			let values = [
				(SLOT_MACHINE, host),
				(SLOT_LOGIN, record.login()),
				(SLOT_PASSWORD, record.secret().expose().as_str()),
			];
			for (slot, value) in values {
				backend
					.set(host, slot, value)
					.map_err(|e| CredentialError::not_completed("save", host, e))?;
			}
			debug!(host = %host, login = %record.login(), "credentials saved to secret store");
			Ok(())
		})
		.await
	}

	async fn update_secret(
		&self,
		new_login: &str,
		old: &CredentialRecord,
		new_secret: &SecretString,
	) -> Result<(), CredentialError> {
		let updated = old.rotated(new_login, new_secret.clone())?;
		self.run(move |backend| {
			let host = updated.host();
			backend
				.set(host, SLOT_LOGIN, updated.login())
				.and_then(|()| backend.set(host, SLOT_PASSWORD, updated.secret().expose()))
				.map_err(|e| CredentialError::not_completed("update", host, e))
		})
		.await
	}

	async fn remove(&self, host: &str) -> Result<(), CredentialError> {
		let host = host.to_string();
		self.run(move |backend| {
			delete_slots(backend, &host, false);
			Ok(())
		})
		.await
	}

	async fn cleanup_if_present(&self, host: &str) -> Result<(), CredentialError> {
		let host = host.to_string();
		self.run(move |backend| {
			delete_slots(backend, &host, true);
			Ok(())
		})
		.await
	}
}
