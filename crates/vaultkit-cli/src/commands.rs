// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::instrument;

use vaultkit_cli_auth::{AuthenticationCoordinator, HttpVaultApi, LoginSecret, RoleId, VaultEndpoint};
use vaultkit_cli_config::{StoreChoice, VaultkitConfig};
use vaultkit_cli_credentials::{default_netrc_path, CredentialStoreSelector, KeyringBackend, StoreKind};

use crate::input::read_secret;

fn store_override(choice: StoreChoice) -> Option<StoreKind> {
	match choice {
		StoreChoice::Auto => None,
		StoreChoice::File => Some(StoreKind::Plaintext),
		StoreChoice::Keyring => Some(StoreKind::Secure),
	}
}

fn selector(config: &VaultkitConfig) -> Result<CredentialStoreSelector> {
	let netrc_path = config
		.credentials
		.netrc_path
		.clone()
		.or_else(default_netrc_path)
		.context("could not determine home directory for the netrc file")?;
	Ok(
		CredentialStoreSelector::new(netrc_path, Arc::new(KeyringBackend))
			.with_override(store_override(config.credentials.store)),
	)
}

fn coordinator(config: &VaultkitConfig) -> Result<AuthenticationCoordinator> {
	let endpoint = VaultEndpoint::new(
		config.vault.require_url()?,
		config.vault.require_account()?,
	)?;
	let api = HttpVaultApi::with_timeout(config.http.timeout)?;
	Ok(AuthenticationCoordinator::new(
		endpoint,
		selector(config)?,
		Arc::new(api),
	))
}

#[instrument(skip_all, fields(login = %login))]
pub async fn login(
	config: &VaultkitConfig,
	login: &str,
	password_stdin: bool,
	api_key_stdin: bool,
) -> Result<()> {
	let coordinator = coordinator(config)?;

	let secret = if api_key_stdin {
		LoginSecret::ApiKey(read_secret("API key")?)
	} else if password_stdin {
		LoginSecret::Password(read_secret("Password")?)
	} else {
		LoginSecret::Password(read_secret(&format!("Password for {login}"))?)
	};

	let outcome = coordinator
		.login(login, secret)
		.await
		.context("login failed")?;
	eprintln!(
		"Logged in as {} to {} (credentials stored in {})",
		outcome.login,
		coordinator.endpoint().url(),
		outcome.location
	);
	Ok(())
}

pub async fn logout(config: &VaultkitConfig) -> Result<()> {
	let coordinator = coordinator(config)?;
	coordinator.logout().await.context("logout failed")?;
	eprintln!("Logged out of {}", coordinator.endpoint().url());
	Ok(())
}

pub async fn authenticate(config: &VaultkitConfig) -> Result<()> {
	let coordinator = coordinator(config)?;
	let token = coordinator
		.token()
		.await
		.context("authentication failed")?;
	println!("{}", token.expose());
	Ok(())
}

pub async fn whoami(config: &VaultkitConfig) -> Result<()> {
	let coordinator = coordinator(config)?;
	let body = coordinator.whoami().await.context("whoami failed")?;
	println!("{}", serde_json::to_string_pretty(&body)?);
	Ok(())
}

#[instrument(skip_all, fields(role = ?role))]
pub async fn rotate_api_key(config: &VaultkitConfig, role: Option<&str>) -> Result<()> {
	let role = role.map(str::parse::<RoleId>).transpose()?;
	let coordinator = coordinator(config)?;
	let key = coordinator
		.rotate_api_key(role.as_ref())
		.await
		.context("API key rotation failed")?;
	println!("{}", key.expose());
	Ok(())
}

pub async fn credential_store(config: &VaultkitConfig) -> Result<()> {
	let selection = selector(config)?.select().await;
	println!("{}\t{}", selection.kind(), selection.location);
	Ok(())
}
