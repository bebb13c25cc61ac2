// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Plaintext credential store backed by a netrc file.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};
use vaultkit_common_secret::SecretString;

use crate::error::CredentialError;
use crate::netrc::Netrc;
use crate::record::{CredentialRecord, Lookup, StoreKind};
use crate::store::CredentialStore;

/// netrc file name in the home directory.
#[cfg(windows)]
pub const NETRC_FILE_NAME: &str = "_netrc";
#[cfg(not(windows))]
pub const NETRC_FILE_NAME: &str = ".netrc";

/// `~/.netrc` (`~/_netrc` on Windows).
pub fn default_netrc_path() -> Option<PathBuf> {
	dirs::home_dir().map(|home| home.join(NETRC_FILE_NAME))
}

/// Credential store that keeps records as `machine`/`login`/`password` blocks
/// in a netrc file.
///
/// Every mutation re-reads the whole file, edits the parsed document and
/// rewrites it through a temporary file and a rename. Entries for hosts this
/// store does not manage are written back unchanged. There is no cross-process
/// lock: two processes saving at the same time race and the last rename wins.
#[derive(Debug, Clone)]
pub struct PlaintextCredentialStore {
	path: PathBuf,
}

impl PlaintextCredentialStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	async fn read_contents(&self) -> Result<Option<String>, CredentialError> {
		match fs::read_to_string(&self.path).await {
			Ok(contents) => Ok(Some(contents)),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
			Err(e) => Err(CredentialError::Io {
				path: self.path.clone(),
				source: e,
			}),
		}
	}

	/// Parsed document for a mutation; parse failures are hard errors here.
	async fn read_document(&self) -> Result<Option<Netrc>, CredentialError> {
		let Some(contents) = self.read_contents().await? else {
			return Ok(None);
		};
		Netrc::parse(&contents)
			.map(Some)
			.map_err(|e| CredentialError::Malformed {
				location: self.path.display().to_string(),
				detail: e.to_string(),
			})
	}

	async fn write_document(
		&self,
		netrc: &Netrc,
		operation: &'static str,
		host: &str,
	) -> Result<(), CredentialError> {
		self.write_atomically(netrc.render())
			.await
			.map_err(|e| CredentialError::not_completed(operation, host, e))?;
		debug!(path = %self.path.display(), host = %host, operation, "credential file written");
		Ok(())
	}

	async fn write_atomically(&self, contents: String) -> std::io::Result<()> {
		let path = self.path.clone();
		tokio::task::spawn_blocking(move || replace_file(&path, contents.as_bytes()))
			.await
			.map_err(std::io::Error::other)?
	}
}

/// Replace `path` with `contents` through a uniquely named temp file in the
/// same directory. A symlinked netrc is followed so the link survives.
fn replace_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
	let target = match std::fs::canonicalize(path) {
		Ok(resolved) => resolved,
		Err(e) if e.kind() == ErrorKind::NotFound => path.to_path_buf(),
		Err(e) => return Err(e),
	};
	let dir = match target.parent() {
		Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
		_ => PathBuf::from("."),
	};
	std::fs::create_dir_all(&dir)?;

	let mut temp = tempfile::Builder::new()
		.prefix(".vaultkit-netrc")
		.suffix(".tmp")
		.tempfile_in(&dir)?;
	temp.write_all(contents)?;
	temp.as_file().sync_all()?;

	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;
		let perms = std::fs::Permissions::from_mode(0o700);
		if let Err(e) = std::fs::set_permissions(temp.path(), perms) {
			warn!(path = %temp.path().display(), error = %e, "failed to restrict credential file permissions");
		}
	}

	temp.persist(&target).map_err(|e| e.error)?;
	Ok(())
}

fn ensure_token(field: &str, value: &str) -> Result<(), CredentialError> {
	if value.is_empty() || value.chars().any(char::is_whitespace) {
		return Err(CredentialError::InvalidInput(format!(
			"{field} cannot be stored in a netrc file: it is empty or contains whitespace"
		)));
	}
	Ok(())
}

fn ensure_storable(host: &str, login: &str, secret: &SecretString) -> Result<(), CredentialError> {
	ensure_token("host", host)?;
	ensure_token("login", login)?;
	ensure_token("secret", secret.expose())
}

#[async_trait]
impl CredentialStore for PlaintextCredentialStore {
	fn kind(&self) -> StoreKind {
		StoreKind::Plaintext
	}

	fn describe_location(&self) -> String {
		self.path.display().to_string()
	}

	async fn lookup(&self, host: &str) -> Result<Lookup, CredentialError> {
		let Some(contents) = self.read_contents().await? else {
			debug!(path = %self.path.display(), "credential file does not exist");
			return Ok(Lookup::NotFound);
		};

		let netrc = match Netrc::parse(&contents) {
			Ok(netrc) => netrc,
			Err(e) => return Ok(Lookup::Malformed(e.to_string())),
		};

		let Some(machine) = netrc.find(host) else {
			return Ok(Lookup::NotFound);
		};
		match (&machine.name, &machine.login, &machine.password) {
			(Some(name), Some(login), Some(password)) => Ok(Lookup::Found(CredentialRecord::new(
				name.clone(),
				login.clone(),
				SecretString::new(password.clone()),
			)?)),
			_ => Ok(Lookup::Malformed(format!(
				"entry for {host} is missing its login or password"
			))),
		}
	}

	async fn save(&self, record: &CredentialRecord) -> Result<(), CredentialError> {
		ensure_storable(record.host(), record.login(), record.secret())?;

		let mut netrc = self.read_document().await?.unwrap_or_default();
		netrc.upsert(record.host(), record.login(), record.secret().expose());
		self.write_document(&netrc, "save", record.host()).await
	}

	async fn update_secret(
		&self,
		new_login: &str,
		old: &CredentialRecord,
		new_secret: &SecretString,
	) -> Result<(), CredentialError> {
		ensure_storable(old.host(), new_login, new_secret)?;

		let mut netrc = self
			.read_document()
			.await?
			.ok_or_else(|| CredentialError::not_logged_in(old.host()))?;
		if !netrc.update(old.host(), new_login, new_secret.expose()) {
			return Err(CredentialError::not_logged_in(old.host()));
		}
		self.write_document(&netrc, "update", old.host()).await
	}

	async fn remove(&self, host: &str) -> Result<(), CredentialError> {
		let mut netrc = match self.read_document().await? {
			Some(netrc) if !netrc.is_empty() => netrc,
			_ => return Err(CredentialError::not_logged_in(host)),
		};

		if netrc.remove(host).is_none() {
			debug!(host = %host, "no credential entry to remove");
			return Ok(());
		}
		self.write_document(&netrc, "remove", host).await
	}
}
