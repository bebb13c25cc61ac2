// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ties the credential store, the vault API and the token cache together.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use vaultkit_cli_credentials::{
	CredentialError, CredentialRecord, CredentialStoreSelector, Selection, StoreKind,
};
use vaultkit_common_secret::SecretString;

use crate::api::{RoleId, VaultApi, VaultEndpoint};
use crate::clock::{Clock, SystemClock};
use crate::error::AuthError;
use crate::token::TokenCache;

/// What the user proved their identity with at login.
#[derive(Debug, Clone)]
pub enum LoginSecret {
	/// Stored as-is after it authenticates.
	ApiKey(SecretString),
	/// Exchanged for the principal's API key; never stored.
	Password(SecretString),
}

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedIn {
	pub login: String,
	pub store: StoreKind,
	pub location: String,
}

#[derive(Debug)]
pub struct AuthenticationCoordinator {
	endpoint: VaultEndpoint,
	selector: CredentialStoreSelector,
	api: Arc<dyn VaultApi>,
	clock: Arc<dyn Clock>,
	cache: Mutex<TokenCache>,
}

impl AuthenticationCoordinator {
	pub fn new(
		endpoint: VaultEndpoint,
		selector: CredentialStoreSelector,
		api: Arc<dyn VaultApi>,
	) -> Self {
		Self {
			endpoint,
			selector,
			api,
			clock: Arc::new(SystemClock),
			cache: Mutex::new(TokenCache::new()),
		}
	}

	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;
		self
	}

	pub fn endpoint(&self) -> &VaultEndpoint {
		&self.endpoint
	}

	pub fn selector(&self) -> &CredentialStoreSelector {
		&self.selector
	}

	/// The credential store key for this vault.
	pub fn host(&self) -> String {
		self.endpoint.credential_host()
	}

	pub async fn selected_store(&self) -> Selection {
		self.selector.select().await
	}

	/// A valid access token, authenticating with the stored API key when the
	/// cached one is absent or expired.
	#[instrument(skip_all, fields(host = %self.endpoint.credential_host()))]
	pub async fn token(&self) -> Result<SecretString, AuthError> {
		let mut cache = self.cache.lock().await;
		if let Some(token) = cache.fresh(self.clock.now()) {
			debug!(expires_at = %token.expires_at(), "reusing cached access token");
			return Ok(token.value().clone());
		}

		let record = self.load_record().await?;
		let value = self
			.api
			.authenticate(&self.endpoint, record.login(), record.secret())
			.await?;

		let token = cache.store(value, self.clock.now());
		debug!(login = %record.login(), expires_at = %token.expires_at(), "authenticated");
		Ok(token.value().clone())
	}

	/// Verify the credentials against the vault and persist the API key.
	#[instrument(skip_all, fields(host = %self.endpoint.credential_host(), login = %login))]
	pub async fn login(&self, login: &str, secret: LoginSecret) -> Result<LoggedIn, AuthError> {
		let login = login.trim();
		if login.is_empty() {
			return Err(AuthError::InvalidInput("login must not be empty".to_string()));
		}

		let api_key = match secret {
			LoginSecret::ApiKey(key) => key,
			LoginSecret::Password(password) => {
				if password.is_blank() {
					return Err(AuthError::InvalidInput("password must not be empty".to_string()));
				}
				self.api.login(&self.endpoint, login, &password).await?
			}
		};
		if api_key.is_blank() {
			return Err(AuthError::InvalidInput("API key must not be empty".to_string()));
		}

		self.api
			.authenticate(&self.endpoint, login, &api_key)
			.await?;

		let host = self.host();
		let record = CredentialRecord::new(host.as_str(), login, api_key)?;
		let selection = self.selector.select().await;
		selection.store.cleanup_if_present(&host).await?;
		selection.store.save(&record).await?;

		self.cache.lock().await.reset();
		info!(store = %selection.kind(), location = %selection.location, "logged in");

		Ok(LoggedIn {
			login: login.to_string(),
			store: selection.kind(),
			location: selection.location,
		})
	}

	/// Remove the stored credentials for this vault. The cached token is left
	/// to expire on its own.
	#[instrument(skip_all, fields(host = %self.endpoint.credential_host()))]
	pub async fn logout(&self) -> Result<(), AuthError> {
		let host = self.host();
		let selection = self.selector.select().await;

		if !selection.store.is_present(&host).await? {
			selection.store.cleanup_if_present(&host).await?;
			return Err(CredentialError::NotLoggedIn { host }.into());
		}

		selection.store.remove(&host).await?;
		info!(location = %selection.location, "logged out");
		Ok(())
	}

	/// Rotate an API key and return the new one.
	///
	/// With no role the caller's own key is rotated and the stored record is
	/// updated to match. With a role the other principal's key is rotated
	/// using the access token and nothing is stored.
	#[instrument(skip_all, fields(host = %self.endpoint.credential_host(), role = ?role.map(ToString::to_string)))]
	pub async fn rotate_api_key(&self, role: Option<&RoleId>) -> Result<SecretString, AuthError> {
		if let Some(role) = role {
			let token = self.token().await?;
			let key = self.api.rotate_api_key(&self.endpoint, role, &token).await?;
			info!("rotated API key for another principal");
			return Ok(key);
		}

		let selection = self.selector.select().await;
		let record = selection.store.load(&self.host()).await?;
		let key = self
			.api
			.rotate_own_api_key(&self.endpoint, record.login(), record.secret())
			.await?;
		selection
			.store
			.update_secret(record.login(), &record, &key)
			.await?;

		info!(login = %record.login(), "rotated own API key");
		Ok(key)
	}

	#[instrument(skip_all, fields(host = %self.endpoint.credential_host()))]
	pub async fn whoami(&self) -> Result<serde_json::Value, AuthError> {
		let token = self.token().await?;
		self.api.whoami(&self.endpoint, &token).await
	}

	async fn load_record(&self) -> Result<CredentialRecord, AuthError> {
		let selection = self.selector.select().await;
		Ok(selection.store.load(&self.host()).await?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::clock::ManualClock;
	use async_trait::async_trait;
	use chrono::{Duration, Utc};
	use std::sync::Mutex as StdMutex;
	use vaultkit_cli_credentials::{MemoryBackend, SecretBackend};

	/// Records calls and hands out numbered tokens and keys.
	#[derive(Debug, Default)]
	struct FakeVault {
		calls: StdMutex<Vec<String>>,
		valid_key: StdMutex<Option<String>>,
		password: Option<String>,
		next: StdMutex<u32>,
	}

	impl FakeVault {
		fn accepting(key: &str) -> Self {
			Self {
				valid_key: StdMutex::new(Some(key.to_string())),
				..Default::default()
			}
		}

		fn with_password(mut self, password: &str) -> Self {
			self.password = Some(password.to_string());
			self
		}

		fn calls(&self) -> Vec<String> {
			self.calls.lock().unwrap().clone()
		}

		fn count(&self, name: &str) -> usize {
			self.calls().iter().filter(|c| c.starts_with(name)).count()
		}

		fn bump(&self) -> u32 {
			let mut next = self.next.lock().unwrap();
			*next += 1;
			*next
		}

		fn check_key(&self, key: &SecretString) -> Result<(), AuthError> {
			match self.valid_key.lock().unwrap().as_deref() {
				Some(valid) if valid == key.expose() => Ok(()),
				_ => Err(AuthError::Unauthorized),
			}
		}
	}

	#[async_trait]
	impl VaultApi for FakeVault {
		async fn login(
			&self,
			_endpoint: &VaultEndpoint,
			login: &str,
			password: &SecretString,
		) -> Result<SecretString, AuthError> {
			self.calls.lock().unwrap().push(format!("login:{login}"));
			if self.password.as_deref() != Some(password.expose().as_str()) {
				return Err(AuthError::Unauthorized);
			}
			let key = self.valid_key.lock().unwrap().clone().unwrap_or_default();
			Ok(SecretString::new(key))
		}

		async fn authenticate(
			&self,
			_endpoint: &VaultEndpoint,
			login: &str,
			api_key: &SecretString,
		) -> Result<SecretString, AuthError> {
			self.calls.lock().unwrap().push(format!("authenticate:{login}"));
			self.check_key(api_key)?;
			Ok(SecretString::new(format!("token-{}", self.bump())))
		}

		async fn rotate_own_api_key(
			&self,
			_endpoint: &VaultEndpoint,
			login: &str,
			api_key: &SecretString,
		) -> Result<SecretString, AuthError> {
			self.calls.lock().unwrap().push(format!("rotate_own:{login}"));
			self.check_key(api_key)?;
			let key = format!("key-{}", self.bump());
			*self.valid_key.lock().unwrap() = Some(key.clone());
			Ok(SecretString::new(key))
		}

		async fn rotate_api_key(
			&self,
			_endpoint: &VaultEndpoint,
			role: &RoleId,
			token: &SecretString,
		) -> Result<SecretString, AuthError> {
			self.calls
				.lock()
				.unwrap()
				.push(format!("rotate_other:{role}:{}", token.expose()));
			Ok(SecretString::new(format!("other-key-{}", self.bump())))
		}

		async fn whoami(
			&self,
			endpoint: &VaultEndpoint,
			_token: &SecretString,
		) -> Result<serde_json::Value, AuthError> {
			self.calls.lock().unwrap().push("whoami".to_string());
			Ok(serde_json::json!({ "account": endpoint.account() }))
		}
	}

	struct Harness {
		_dir: tempfile::TempDir,
		backend: Arc<MemoryBackend>,
		vault: Arc<FakeVault>,
		clock: ManualClock,
		coordinator: AuthenticationCoordinator,
	}

	fn harness(vault: FakeVault, store: StoreKind) -> Harness {
		let dir = tempfile::tempdir().unwrap();
		let backend = Arc::new(MemoryBackend::new());
		let selector = CredentialStoreSelector::new(dir.path().join(".netrc"), backend.clone())
			.with_supported_backends(["memory"])
			.with_override(Some(store));
		let vault = Arc::new(vault);
		let clock = ManualClock::new(Utc::now());
		let coordinator = AuthenticationCoordinator::new(
			VaultEndpoint::new("https://v", "myorg").unwrap(),
			selector,
			vault.clone(),
		)
		.with_clock(Arc::new(clock.clone()));

		Harness {
			_dir: dir,
			backend,
			vault,
			clock,
			coordinator,
		}
	}

	async fn logged_in(store: StoreKind) -> Harness {
		let h = harness(FakeVault::accepting("k1"), store);
		h.coordinator
			.login("admin", LoginSecret::ApiKey(SecretString::from("k1")))
			.await
			.unwrap();
		h
	}

	#[tokio::test]
	async fn test_token_is_reused_until_expiry_then_refreshed_once() {
		let h = logged_in(StoreKind::Plaintext).await;
		let after_login = h.vault.count("authenticate");

		let first = h.coordinator.token().await.unwrap();
		h.clock.advance(Duration::seconds(4 * 60 + 59));
		let reused = h.coordinator.token().await.unwrap();
		assert_eq!(first.expose(), reused.expose());
		assert_eq!(h.vault.count("authenticate"), after_login + 1);

		h.clock.advance(Duration::seconds(2));
		let refreshed = h.coordinator.token().await.unwrap();
		let again = h.coordinator.token().await.unwrap();
		assert_ne!(first.expose(), refreshed.expose());
		assert_eq!(refreshed.expose(), again.expose());
		assert_eq!(h.vault.count("authenticate"), after_login + 2);
	}

	#[tokio::test]
	async fn test_token_without_stored_credentials_is_not_logged_in() {
		let h = harness(FakeVault::accepting("k1"), StoreKind::Secure);
		let err = h.coordinator.token().await.unwrap_err();
		assert!(err.is_not_logged_in());
		assert_eq!(h.vault.count("authenticate"), 0);
	}

	#[tokio::test]
	async fn test_login_with_api_key_verifies_then_persists() {
		let h = logged_in(StoreKind::Secure).await;

		assert_eq!(h.vault.calls(), vec!["authenticate:admin".to_string()]);
		let record = h
			.coordinator
			.selected_store()
			.await
			.store
			.load("https://v/authn")
			.await
			.unwrap();
		assert_eq!(record.login(), "admin");
		assert_eq!(record.secret().expose(), "k1");
		assert_eq!(h.backend.slot_count("https://v/authn"), 3);
	}

	#[tokio::test]
	async fn test_login_with_password_exchanges_it_and_never_stores_it() {
		let h = harness(
			FakeVault::accepting("k1").with_password("hunter2"),
			StoreKind::Plaintext,
		);

		let outcome = h
			.coordinator
			.login("admin", LoginSecret::Password(SecretString::from("hunter2")))
			.await
			.unwrap();
		assert_eq!(outcome.store, StoreKind::Plaintext);
		assert_eq!(
			h.vault.calls(),
			vec!["login:admin".to_string(), "authenticate:admin".to_string()]
		);

		let netrc = std::fs::read_to_string(h._dir.path().join(".netrc")).unwrap();
		assert_eq!(netrc, "machine https://v/authn\nlogin admin\npassword k1\n");
	}

	#[tokio::test]
	async fn test_rejected_login_stores_nothing() {
		let h = harness(FakeVault::accepting("k1"), StoreKind::Secure);

		let err = h
			.coordinator
			.login("admin", LoginSecret::ApiKey(SecretString::from("wrong")))
			.await
			.unwrap_err();
		assert!(err.is_unauthorized());
		assert_eq!(h.backend.slot_count("https://v/authn"), 0);

		let err = h
			.coordinator
			.login("  ", LoginSecret::ApiKey(SecretString::from("k1")))
			.await
			.unwrap_err();
		assert!(matches!(err, AuthError::InvalidInput(_)));
	}

	#[tokio::test]
	async fn test_login_resets_the_token_cache() {
		let h = logged_in(StoreKind::Secure).await;
		let before = h.coordinator.token().await.unwrap();

		h.coordinator
			.login("admin", LoginSecret::ApiKey(SecretString::from("k1")))
			.await
			.unwrap();
		let after = h.coordinator.token().await.unwrap();
		assert_ne!(before.expose(), after.expose());
	}

	#[tokio::test]
	async fn test_login_repairs_partial_secure_record() {
		let h = harness(FakeVault::accepting("k1"), StoreKind::Secure);
		h.backend
			.set("https://v/authn", "login", "stale")
			.unwrap();

		h.coordinator
			.login("admin", LoginSecret::ApiKey(SecretString::from("k1")))
			.await
			.unwrap();
		assert_eq!(
			h.backend
				.get("https://v/authn", "login")
				.unwrap()
				.unwrap()
				.expose(),
			"admin"
		);
	}

	#[tokio::test]
	async fn test_logout_removes_record_but_keeps_cached_token() {
		let h = logged_in(StoreKind::Plaintext).await;
		let token = h.coordinator.token().await.unwrap();

		h.coordinator.logout().await.unwrap();
		assert!(!h
			.coordinator
			.selected_store()
			.await
			.store
			.is_present("https://v/authn")
			.await
			.unwrap());

		let cached = h.coordinator.token().await.unwrap();
		assert_eq!(token.expose(), cached.expose());

		assert!(h.coordinator.logout().await.unwrap_err().is_not_logged_in());
	}

	#[tokio::test]
	async fn test_rotate_own_key_updates_store() {
		let h = logged_in(StoreKind::Plaintext).await;

		let key = h.coordinator.rotate_api_key(None).await.unwrap();
		let stored = h
			.coordinator
			.selected_store()
			.await
			.store
			.load("https://v/authn")
			.await
			.unwrap();
		assert_eq!(stored.secret().expose(), key.expose());
		assert_eq!(stored.login(), "admin");

		h.clock.advance(Duration::minutes(6));
		assert!(h.coordinator.token().await.is_ok());
	}

	#[tokio::test]
	async fn test_rotate_other_key_uses_token_and_leaves_store_alone() {
		let h = logged_in(StoreKind::Secure).await;
		let role: RoleId = "host:ci/runner".parse().unwrap();

		let key = h.coordinator.rotate_api_key(Some(&role)).await.unwrap();
		assert!(key.expose().starts_with("other-key-"));
		assert!(h
			.vault
			.calls()
			.iter()
			.any(|c| c.starts_with("rotate_other:host:ci/runner:token-")));

		let stored = h
			.coordinator
			.selected_store()
			.await
			.store
			.load("https://v/authn")
			.await
			.unwrap();
		assert_eq!(stored.secret().expose(), "k1");
	}

	#[tokio::test]
	async fn test_whoami_authenticates_first() {
		let h = logged_in(StoreKind::Secure).await;
		let body = h.coordinator.whoami().await.unwrap();
		assert_eq!(body["account"], "myorg");
		assert_eq!(h.vault.calls().last().map(String::as_str), Some("whoami"));
	}
}
