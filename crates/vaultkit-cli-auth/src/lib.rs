// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authentication against the vault for the vaultkit CLI.
//!
//! [`AuthenticationCoordinator`] loads the long-lived API key from whichever
//! credential store is selected, exchanges it for a short-lived access token
//! and caches that token for five minutes. It also drives login, logout and
//! API key rotation.

mod api;
mod clock;
mod coordinator;
mod error;
mod http;
mod token;

pub use api::{RoleId, VaultApi, VaultEndpoint};
pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::{AuthenticationCoordinator, LoggedIn, LoginSecret};
pub use error::AuthError;
pub use http::HttpVaultApi;
pub use token::{CachedToken, TokenCache, TokenState, TOKEN_LIFETIME_SECS};
