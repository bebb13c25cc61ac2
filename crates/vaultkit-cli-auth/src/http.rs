// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `VaultApi` over the vault's REST interface.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, instrument, warn};
use vaultkit_common_secret::SecretString;

use crate::api::{RoleId, VaultApi, VaultEndpoint};
use crate::error::AuthError;

#[derive(Debug, Clone)]
pub struct HttpVaultApi {
	client: Client,
}

impl HttpVaultApi {
	pub fn new(client: Client) -> Self {
		Self { client }
	}

	pub fn with_timeout(timeout: Duration) -> Result<Self, AuthError> {
		let client =
			vaultkit_common_http::new_client_with_timeout(timeout).map_err(AuthError::Transport)?;
		Ok(Self::new(client))
	}

	fn authn_url(endpoint: &VaultEndpoint, rest: &str) -> String {
		format!(
			"{}/authn/{}/{rest}",
			endpoint.url(),
			urlencoding::encode(endpoint.account())
		)
	}
}

fn token_header(token: &SecretString) -> String {
	format!("Token token=\"{}\"", token.expose())
}

/// Map a non-success status to an error. Response bodies of failed requests
/// are dropped; they can echo submitted credentials.
async fn check(resp: Response) -> Result<Response, AuthError> {
	let status = resp.status();
	if status.is_success() {
		return Ok(resp);
	}

	match status {
		StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
			warn!(status = %status, "vault rejected credentials");
			Err(AuthError::Unauthorized)
		}
		StatusCode::NOT_FOUND => Err(AuthError::NotFound(resp.url().path().to_string())),
		_ => {
			let body_len = resp.text().await.map(|b| b.len()).unwrap_or_default();
			warn!(status = %status, body_len, "vault request failed");
			Err(AuthError::Http {
				status: status.as_u16(),
				body_len,
			})
		}
	}
}

async fn secret_body(resp: Response) -> Result<SecretString, AuthError> {
	let body = check(resp).await?.text().await.map_err(AuthError::Transport)?;
	let body = SecretString::new(body);
	if body.is_blank() {
		return Err(AuthError::InvalidResponse("empty response body".to_string()));
	}
	Ok(body)
}

#[async_trait]
impl VaultApi for HttpVaultApi {
	#[instrument(skip_all, fields(account = %endpoint.account(), login = %login))]
	async fn login(
		&self,
		endpoint: &VaultEndpoint,
		login: &str,
		password: &SecretString,
	) -> Result<SecretString, AuthError> {
		debug!("exchanging password for API key");
		let resp = self
			.client
			.get(Self::authn_url(endpoint, "login"))
			.basic_auth(login, Some(password.expose()))
			.send()
			.await
			.map_err(AuthError::Transport)?;
		secret_body(resp).await
	}

	#[instrument(skip_all, fields(account = %endpoint.account(), login = %login))]
	async fn authenticate(
		&self,
		endpoint: &VaultEndpoint,
		login: &str,
		api_key: &SecretString,
	) -> Result<SecretString, AuthError> {
		let path = format!("{}/authenticate", urlencoding::encode(login));
		let resp = self
			.client
			.post(Self::authn_url(endpoint, &path))
			.header(reqwest::header::ACCEPT_ENCODING, "base64")
			.body(api_key.expose().clone())
			.send()
			.await
			.map_err(AuthError::Transport)?;

		let token = secret_body(resp).await?;
		let trimmed = token.expose().trim();
		if base64::engine::general_purpose::STANDARD
			.decode(trimmed)
			.is_err()
		{
			return Err(AuthError::InvalidResponse(
				"access token is not base64 encoded".to_string(),
			));
		}
		debug!("obtained access token");
		Ok(SecretString::from(trimmed))
	}

	#[instrument(skip_all, fields(account = %endpoint.account(), login = %login))]
	async fn rotate_own_api_key(
		&self,
		endpoint: &VaultEndpoint,
		login: &str,
		api_key: &SecretString,
	) -> Result<SecretString, AuthError> {
		let resp = self
			.client
			.put(Self::authn_url(endpoint, "api_key"))
			.basic_auth(login, Some(api_key.expose()))
			.send()
			.await
			.map_err(AuthError::Transport)?;
		secret_body(resp).await
	}

	#[instrument(skip_all, fields(account = %endpoint.account(), role = %role))]
	async fn rotate_api_key(
		&self,
		endpoint: &VaultEndpoint,
		role: &RoleId,
		token: &SecretString,
	) -> Result<SecretString, AuthError> {
		let resp = self
			.client
			.put(Self::authn_url(endpoint, "api_key"))
			.query(&[("role", role.to_string())])
			.header(reqwest::header::AUTHORIZATION, token_header(token))
			.send()
			.await
			.map_err(AuthError::Transport)?;
		secret_body(resp).await
	}

	#[instrument(skip_all, fields(account = %endpoint.account()))]
	async fn whoami(
		&self,
		endpoint: &VaultEndpoint,
		token: &SecretString,
	) -> Result<serde_json::Value, AuthError> {
		let resp = self
			.client
			.get(format!("{}/whoami", endpoint.url()))
			.header(reqwest::header::AUTHORIZATION, token_header(token))
			.send()
			.await
			.map_err(AuthError::Transport)?;

		check(resp)
			.await?
			.json()
			.await
			.map_err(|e| AuthError::InvalidResponse(e.to_string()))
	}
}
