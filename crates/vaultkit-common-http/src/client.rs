// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP client with consistent User-Agent header.

use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Creates a new HTTP client builder with the standard vaultkit User-Agent header.
///
/// Use this when you need to customize the client beyond a timeout.
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Creates a new HTTP client with a request timeout and the standard User-Agent.
pub fn new_client_with_timeout(timeout: Duration) -> Result<Client, reqwest::Error> {
	tracing::debug!(timeout_secs = timeout.as_secs(), "building HTTP client");
	builder().timeout(timeout).build()
}

/// Returns the standard vaultkit User-Agent string.
///
/// Format: `vaultkit/{os}-{arch}/{version}`
pub fn user_agent() -> String {
	format!(
		"vaultkit/{}-{}/{}",
		std::env::consts::OS,
		std::env::consts::ARCH,
		env!("CARGO_PKG_VERSION")
	)
}
