// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Chooses which store backs credential operations.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::backend::{supported_backends, SecretBackend};
use crate::record::StoreKind;
use crate::store::CredentialStore;
use crate::store_keyring::SecureCredentialStore;
use crate::store_netrc::PlaintextCredentialStore;

/// The store picked by [`CredentialStoreSelector::select`].
#[derive(Debug, Clone)]
pub struct Selection {
	pub store: Arc<dyn CredentialStore>,
	/// File path or named OS store, for diagnostics.
	pub location: String,
}

impl Selection {
	pub fn kind(&self) -> StoreKind {
		self.store.kind()
	}
}

/// Picks the secure store when the platform backend is supported and
/// accessible, the netrc file otherwise, unless an override forces one.
///
/// The decision is made once and cached until [`set_override`] is called.
/// The first time the plaintext store is picked a warning is logged; later
/// picks by the same selector are silent.
///
/// [`set_override`]: CredentialStoreSelector::set_override
#[derive(Debug)]
pub struct CredentialStoreSelector {
	netrc_path: PathBuf,
	backend: Arc<dyn SecretBackend>,
	supported: Vec<String>,
	store_override: Option<StoreKind>,
	selected: Mutex<Option<Selection>>,
	warned_plaintext: AtomicBool,
}

impl CredentialStoreSelector {
	pub fn new(netrc_path: impl Into<PathBuf>, backend: Arc<dyn SecretBackend>) -> Self {
		Self {
			netrc_path: netrc_path.into(),
			backend,
			supported: supported_backends().iter().map(|s| s.to_string()).collect(),
			store_override: None,
			selected: Mutex::new(None),
			warned_plaintext: AtomicBool::new(false),
		}
	}

	pub fn with_override(mut self, store_override: Option<StoreKind>) -> Self {
		self.set_override(store_override);
		self
	}

	/// Replace the platform's supported backend names.
	pub fn with_supported_backends<I, S>(mut self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.supported = names.into_iter().map(Into::into).collect();
		self
	}

	/// Force a store (or clear the override) and forget the cached decision.
	pub fn set_override(&mut self, store_override: Option<StoreKind>) {
		self.store_override = store_override;
		*self.selected.get_mut() = None;
	}

	pub fn netrc_path(&self) -> &Path {
		&self.netrc_path
	}

	pub async fn select(&self) -> Selection {
		let mut selected = self.selected.lock().await;
		if let Some(selection) = selected.as_ref() {
			return selection.clone();
		}

		let selection = self.resolve().await;
		info!(store = %selection.kind(), location = %selection.location, "selected credential store");
		*selected = Some(selection.clone());
		selection
	}

	async fn resolve(&self) -> Selection {
		match self.store_override {
			Some(StoreKind::Plaintext) => return self.plaintext(),
			Some(StoreKind::Secure) => return self.secure(),
			None => {}
		}

		let name = self.backend.name();
		if !self.supported.iter().any(|s| s == name) {
			debug!(backend = %name, "secret store backend not supported on this platform");
			return self.plaintext();
		}

		let secure = SecureCredentialStore::new(self.backend.clone());
		if secure.is_accessible().await {
			return self.secure();
		}

		debug!(backend = %name, "secret store is not accessible, falling back to file");
		self.plaintext()
	}

	fn secure(&self) -> Selection {
		let store = SecureCredentialStore::new(self.backend.clone());
		Selection {
			location: store.describe_location(),
			store: Arc::new(store),
		}
	}

	fn plaintext(&self) -> Selection {
		let store = PlaintextCredentialStore::new(&self.netrc_path);
		self.warn_plaintext_once();
		Selection {
			location: store.describe_location(),
			store: Arc::new(store),
		}
	}

	/// Returns true if this call logged the warning.
	fn warn_plaintext_once(&self) -> bool {
		if self.warned_plaintext.swap(true, Ordering::SeqCst) {
			return false;
		}
		warn!(
			path = %self.netrc_path.display(),
			"no usable OS secret store; credentials will be stored unencrypted in {}",
			self.netrc_path.display()
		);
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::backend::MemoryBackend;

	fn build(backend: Arc<MemoryBackend>) -> (tempfile::TempDir, CredentialStoreSelector) {
		let dir = tempfile::tempdir().unwrap();
		let selector = CredentialStoreSelector::new(dir.path().join(".netrc"), backend)
			.with_supported_backends(["memory"]);
		(dir, selector)
	}

	#[tokio::test]
	async fn test_accessible_supported_backend_is_secure() {
		let (_dir, selector) = build(Arc::new(MemoryBackend::new()));
		let selection = selector.select().await;
		assert_eq!(selection.kind(), StoreKind::Secure);
		assert_eq!(selection.location, "OS secret store (memory)");
	}

	#[tokio::test]
	async fn test_locked_backend_falls_back_to_plaintext() {
		let backend = Arc::new(MemoryBackend::new());
		backend.set_locked(true);
		let (dir, selector) = build(backend);

		let selection = selector.select().await;
		assert_eq!(selection.kind(), StoreKind::Plaintext);
		assert_eq!(selection.location, dir.path().join(".netrc").display().to_string());
	}

	#[tokio::test]
	async fn test_unsupported_backend_falls_back_to_plaintext() {
		let backend = Arc::new(MemoryBackend::with_name("gnome-keyring-legacy"));
		let (_dir, selector) = build(backend);
		assert_eq!(selector.select().await.kind(), StoreKind::Plaintext);
	}

	#[tokio::test]
	async fn test_override_wins_regardless_of_accessibility() {
		let locked = Arc::new(MemoryBackend::new());
		locked.set_locked(true);
		let (_dir, selector) = build(locked);
		let selector = selector.with_override(Some(StoreKind::Secure));
		assert_eq!(selector.select().await.kind(), StoreKind::Secure);

		let (_dir, selector) = build(Arc::new(MemoryBackend::new()));
		let selector = selector.with_override(Some(StoreKind::Plaintext));
		for _ in 0..3 {
			assert_eq!(selector.select().await.kind(), StoreKind::Plaintext);
		}
	}

	#[tokio::test]
	async fn test_decision_is_cached_until_override_changes() {
		let backend = Arc::new(MemoryBackend::new());
		let (_dir, mut selector) = build(backend.clone());

		assert_eq!(selector.select().await.kind(), StoreKind::Secure);
		backend.set_locked(true);
		assert_eq!(selector.select().await.kind(), StoreKind::Secure);

		selector.set_override(None);
		assert_eq!(selector.select().await.kind(), StoreKind::Plaintext);
	}

	#[tokio::test]
	async fn test_plaintext_warning_is_emitted_once() {
		let (_dir, mut selector) = build(Arc::new(MemoryBackend::new()));
		selector.set_override(Some(StoreKind::Plaintext));
		selector.select().await;

		assert!(!selector.warn_plaintext_once());
		selector.set_override(Some(StoreKind::Plaintext));
		selector.select().await;
		assert!(!selector.warn_plaintext_once());
	}

	#[tokio::test]
	async fn test_secure_selection_does_not_warn() {
		let (_dir, selector) = build(Arc::new(MemoryBackend::new()));
		selector.select().await;
		assert!(selector.warn_plaintext_once());
	}
}
