// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Key/value secret backends addressed by `(service, slot)`.
//!
//! [`KeyringBackend`] talks to the platform store through the `keyring`
//! crate. [`MemoryBackend`] keeps slots in a map and can be told to fail, which
//! is how the secure store's partial-write handling is tested.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use vaultkit_common_secret::SecretString;

/// Name reported by the OS backend on this platform.
#[cfg(target_os = "macos")]
pub const PLATFORM_BACKEND: &str = "macos-keychain";
#[cfg(target_os = "windows")]
pub const PLATFORM_BACKEND: &str = "windows-credential-manager";
/// keyutils in front of the secret service; keyutils alone is lost on reboot.
#[cfg(target_os = "linux")]
pub const PLATFORM_BACKEND: &str = "linux-secret-service";
#[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
pub const PLATFORM_BACKEND: &str = "unsupported";

/// Backends the selector will use as the primary store on this platform.
pub fn supported_backends() -> &'static [&'static str] {
	#[cfg(any(target_os = "macos", target_os = "windows", target_os = "linux"))]
	{
		&[PLATFORM_BACKEND]
	}
	#[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
	{
		&[]
	}
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
	#[error("no such entry")]
	NoEntry,

	#[error("secret store is locked or inaccessible: {0}")]
	Inaccessible(String),

	#[error("secret store failure: {0}")]
	Platform(String),
}

/// A synchronous secret store. Calls may block (D-Bus, keychain prompts), so
/// async callers run them on the blocking pool.
pub trait SecretBackend: Send + Sync + std::fmt::Debug {
	fn name(&self) -> &str;

	/// `Ok(None)` when the slot does not exist.
	fn get(&self, service: &str, slot: &str) -> Result<Option<SecretString>, BackendError>;

	fn set(&self, service: &str, slot: &str, value: &str) -> Result<(), BackendError>;

	/// `Err(BackendError::NoEntry)` when the slot does not exist.
	fn delete(&self, service: &str, slot: &str) -> Result<(), BackendError>;
}

#[cfg(feature = "keyring")]
pub use os::KeyringBackend;

#[cfg(feature = "keyring")]
mod os {
	use super::*;

	/// The macOS keychain, Windows credential manager or Linux secret service.
	#[derive(Debug, Clone, Copy, Default)]
	pub struct KeyringBackend;

	fn map_err(err: keyring::Error) -> BackendError {
		match err {
			keyring::Error::NoEntry => BackendError::NoEntry,
			keyring::Error::NoStorageAccess(inner) => BackendError::Inaccessible(inner.to_string()),
			other => BackendError::Platform(other.to_string()),
		}
	}

	impl SecretBackend for KeyringBackend {
		fn name(&self) -> &str {
			PLATFORM_BACKEND
		}

		fn get(&self, service: &str, slot: &str) -> Result<Option<SecretString>, BackendError> {
			let entry = keyring::Entry::new(service, slot).map_err(map_err)?;
			match entry.get_password() {
				Ok(value) => Ok(Some(SecretString::new(value))),
				Err(keyring::Error::NoEntry) => Ok(None),
				Err(e) => Err(map_err(e)),
			}
		}

		fn set(&self, service: &str, slot: &str, value: &str) -> Result<(), BackendError> {
			keyring::Entry::new(service, slot)
				.and_then(|entry| entry.set_password(value))
				.map_err(map_err)
		}

		fn delete(&self, service: &str, slot: &str) -> Result<(), BackendError> {
			keyring::Entry::new(service, slot)
				.and_then(|entry| entry.delete_credential())
				.map_err(map_err)
		}
	}
}

/// In-process backend for tests and for running without an OS store.
#[derive(Debug)]
pub struct MemoryBackend {
	name: String,
	slots: Mutex<HashMap<(String, String), String>>,
	failing_slots: Mutex<HashSet<String>>,
	locked: Mutex<bool>,
}

impl MemoryBackend {
	pub fn new() -> Self {
		Self::with_name("memory")
	}

	pub fn with_name(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			slots: Mutex::new(HashMap::new()),
			failing_slots: Mutex::new(HashSet::new()),
			locked: Mutex::new(false),
		}
	}

	/// Make every write and delete of `slot` fail.
	pub fn fail_slot(&self, slot: &str) {
		self.failing_slots
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.insert(slot.to_string());
	}

	/// Simulate a locked store: every call fails.
	pub fn set_locked(&self, locked: bool) {
		*self.locked.lock().unwrap_or_else(PoisonError::into_inner) = locked;
	}

	/// Number of slots currently stored for `service`.
	pub fn slot_count(&self, service: &str) -> usize {
		self.slots
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.keys()
			.filter(|(s, _)| s == service)
			.count()
	}

	fn check(&self, slot: Option<&str>) -> Result<(), BackendError> {
		if *self.locked.lock().unwrap_or_else(PoisonError::into_inner) {
			return Err(BackendError::Inaccessible("memory backend is locked".to_string()));
		}
		if let Some(slot) = slot {
			if self.failing_slots.lock().unwrap_or_else(PoisonError::into_inner).contains(slot) {
				return Err(BackendError::Platform(format!("write to slot '{slot}' rejected")));
			}
		}
		Ok(())
	}
}

impl Default for MemoryBackend {
	fn default() -> Self {
		Self::new()
	}
}

impl SecretBackend for MemoryBackend {
	fn name(&self) -> &str {
		&self.name
	}

	fn get(&self, service: &str, slot: &str) -> Result<Option<SecretString>, BackendError> {
		self.check(None)?;
		let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
		Ok(slots
			.get(&(service.to_string(), slot.to_string()))
			.cloned()
			.map(SecretString::new))
	}

	fn set(&self, service: &str, slot: &str, value: &str) -> Result<(), BackendError> {
		self.check(Some(slot))?;
		self.slots
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.insert((service.to_string(), slot.to_string()), value.to_string());
		Ok(())
	}

	fn delete(&self, service: &str, slot: &str) -> Result<(), BackendError> {
		self.check(Some(slot))?;
		self.slots
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.remove(&(service.to_string(), slot.to_string()))
			.map(|_| ())
			.ok_or(BackendError::NoEntry)
	}
}
