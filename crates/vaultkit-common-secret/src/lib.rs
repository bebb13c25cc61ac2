// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Redacting wrapper for vault credentials.
//!
//! API keys, interactive passwords and short-lived access tokens all travel
//! through the client wrapped in [`Secret<T>`]. The wrapper:
//!
//! - prints `[REDACTED]` from `Debug` and `Display`, so `tracing` fields and
//!   error messages can never carry the value
//! - serializes as `"[REDACTED]"`
//! - zeroizes the inner value on drop
//! - only hands out the value through an explicit [`Secret::expose`]
//!
//! ```
//! use vaultkit_common_secret::SecretString;
//!
//! let api_key = SecretString::new("3x7yq1m0b2".to_string());
//! assert_eq!(format!("{api_key}"), "[REDACTED]");
//! assert_eq!(api_key.expose(), "3x7yq1m0b2");
//! ```

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Placeholder printed in place of every secret.
pub const REDACTED: &str = "[REDACTED]";

/// A value that must never be logged or echoed.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Secret<T>
where
	T: Zeroize,
{
	inner: T,
}

/// The common case: a secret string such as an API key.
pub type SecretString = Secret<String>;

impl<T> Secret<T>
where
	T: Zeroize,
{
	pub fn new(inner: T) -> Self {
		Self { inner }
	}

	/// Access the wrapped value. Every call site is a place the secret leaves
	/// the wrapper, so keep them easy to audit.
	pub fn expose(&self) -> &T {
		&self.inner
	}
}

impl SecretString {
	/// True when the wrapped string is empty or only whitespace.
	pub fn is_blank(&self) -> bool {
		self.inner.trim().is_empty()
	}
}

impl From<String> for SecretString {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}

impl From<&str> for SecretString {
	fn from(value: &str) -> Self {
		Self::new(value.to_string())
	}
}

impl<T> Clone for Secret<T>
where
	T: Zeroize + Clone,
{
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T> fmt::Debug for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Secret").field(&REDACTED).finish()
	}
}

impl<T> fmt::Display for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl<T> PartialEq for Secret<T>
where
	T: Zeroize + PartialEq,
{
	fn eq(&self, other: &Self) -> bool {
		self.inner == other.inner
	}
}

impl<T> Eq for Secret<T> where T: Zeroize + Eq {}

#[cfg(feature = "serde")]
mod serde_impl {
	use serde::{Deserialize, Deserializer, Serialize, Serializer};
	use zeroize::Zeroize;

	use super::{Secret, REDACTED};

	impl<T> Serialize for Secret<T>
	where
		T: Serialize + Zeroize,
	{
		fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
		where
			S: Serializer,
		{
			serializer.serialize_str(REDACTED)
		}
	}

	impl<'de, T> Deserialize<'de> for Secret<T>
	where
		T: Deserialize<'de> + Zeroize,
	{
		fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
		where
			D: Deserializer<'de>,
		{
			T::deserialize(deserializer).map(Secret::new)
		}
	}
}
