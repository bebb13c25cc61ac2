// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory cache for the short-lived vault access token.

use chrono::{DateTime, Duration, Utc};
use vaultkit_common_secret::SecretString;

/// How long the vault honours an access token after issuing it.
pub const TOKEN_LIFETIME_SECS: i64 = 5 * 60;

#[derive(Debug, Clone)]
pub struct CachedToken {
	value: SecretString,
	issued_at: DateTime<Utc>,
	expires_at: DateTime<Utc>,
}

impl CachedToken {
	pub fn new(value: SecretString, issued_at: DateTime<Utc>) -> Self {
		Self {
			value,
			issued_at,
			expires_at: issued_at + Duration::seconds(TOKEN_LIFETIME_SECS),
		}
	}

	pub fn value(&self) -> &SecretString {
		&self.value
	}

	pub fn issued_at(&self) -> DateTime<Utc> {
		self.issued_at
	}

	pub fn expires_at(&self) -> DateTime<Utc> {
		self.expires_at
	}

	/// Usable up to and including `expires_at`.
	pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
		now <= self.expires_at
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
	Absent,
	Valid,
	Expired,
}

/// One token slot. Expiry is checked when the token is asked for; nothing
/// refreshes it in the background.
#[derive(Debug, Default)]
pub struct TokenCache {
	slot: Option<CachedToken>,
}

impl TokenCache {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn state(&self, now: DateTime<Utc>) -> TokenState {
		match &self.slot {
			None => TokenState::Absent,
			Some(token) if token.is_valid_at(now) => TokenState::Valid,
			Some(_) => TokenState::Expired,
		}
	}

	/// The cached token if it is still valid at `now`.
	pub fn fresh(&self, now: DateTime<Utc>) -> Option<&CachedToken> {
		self.slot.as_ref().filter(|t| t.is_valid_at(now))
	}

	/// Overwrite the slot with a token issued at `issued_at`.
	pub fn store(&mut self, value: SecretString, issued_at: DateTime<Utc>) -> &CachedToken {
		self.slot.insert(CachedToken::new(value, issued_at))
	}

	pub fn reset(&mut self) {
		self.slot = None;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_expires_five_minutes_after_issue() {
		let issued = Utc::now();
		let token = CachedToken::new(SecretString::from("t"), issued);

		assert_eq!(token.expires_at() - token.issued_at(), Duration::minutes(5));
		assert!(token.is_valid_at(issued + Duration::minutes(5)));
		assert!(!token.is_valid_at(issued + Duration::minutes(5) + Duration::milliseconds(1)));
	}

	#[test]
	fn test_state_machine() {
		let t0 = Utc::now();
		let mut cache = TokenCache::new();
		assert_eq!(cache.state(t0), TokenState::Absent);
		assert!(cache.fresh(t0).is_none());

		cache.store(SecretString::from("t1"), t0);
		assert_eq!(cache.state(t0 + Duration::seconds(299)), TokenState::Valid);
		assert_eq!(
			cache.fresh(t0 + Duration::seconds(299)).unwrap().value().expose(),
			"t1"
		);
		assert_eq!(cache.state(t0 + Duration::seconds(301)), TokenState::Expired);
		assert!(cache.fresh(t0 + Duration::seconds(301)).is_none());

		let t1 = t0 + Duration::seconds(301);
		cache.store(SecretString::from("t2"), t1);
		assert_eq!(cache.state(t1), TokenState::Valid);

		cache.reset();
		assert_eq!(cache.state(t1), TokenState::Absent);
	}
}
