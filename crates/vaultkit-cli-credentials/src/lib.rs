// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Long-lived credential storage for the vaultkit CLI.
//!
//! A credential record is a `(host, login, secret)` triple keyed by the
//! vault's authentication endpoint (`{url}/authn`).
//!
//! # Features
//!
//! - **PlaintextCredentialStore**: netrc file with owner-only permissions
//! - **SecureCredentialStore**: OS secret store, one slot per field
//! - **CredentialStoreSelector**: picks one of the two per process
//!
//! # Example
//!
//! ```rust,no_run
//! use vaultkit_cli_credentials::{CredentialRecord, CredentialStore, PlaintextCredentialStore};
//! use vaultkit_common_secret::SecretString;
//!
//! # tokio_test::block_on(async {
//! let store = PlaintextCredentialStore::new("/home/me/.netrc");
//! let record = CredentialRecord::new(
//!     "https://vault.example.com/authn",
//!     "admin",
//!     SecretString::from("3xq..."),
//! )
//! .unwrap();
//! store.save(&record).await.unwrap();
//! let loaded = store.load("https://vault.example.com/authn").await.unwrap();
//! # });
//! ```

mod backend;
mod error;
pub mod netrc;
mod record;
mod selector;
mod store;
mod store_keyring;
mod store_netrc;

#[cfg(feature = "keyring")]
pub use backend::KeyringBackend;
pub use backend::{supported_backends, BackendError, MemoryBackend, SecretBackend, PLATFORM_BACKEND};
pub use error::CredentialError;
pub use record::{CredentialRecord, Lookup, StoreKind};
pub use selector::{CredentialStoreSelector, Selection};
pub use store::CredentialStore;
pub use store_keyring::{SecureCredentialStore, SLOT_LOGIN, SLOT_MACHINE, SLOT_PASSWORD};
pub use store_netrc::{default_netrc_path, PlaintextCredentialStore, NETRC_FILE_NAME};
