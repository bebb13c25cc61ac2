// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Time source for token expiry.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

pub trait Clock: Send + Sync + std::fmt::Debug {
	fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> DateTime<Utc> {
		Utc::now()
	}
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
	now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
	pub fn new(start: DateTime<Utc>) -> Self {
		Self {
			now: Arc::new(Mutex::new(start)),
		}
	}

	pub fn advance(&self, by: Duration) {
		let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
		*now += by;
	}

	pub fn set(&self, to: DateTime<Utc>) {
		*self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
	}
}

impl Clock for ManualClock {
	fn now(&self) -> DateTime<Utc> {
		*self.now.lock().unwrap_or_else(|e| e.into_inner())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_manual_clock_moves_only_when_advanced() {
		let start = Utc::now();
		let clock = ManualClock::new(start);
		let shared = clock.clone();

		assert_eq!(clock.now(), start);
		shared.advance(Duration::seconds(90));
		assert_eq!(clock.now(), start + Duration::seconds(90));

		clock.set(start);
		assert_eq!(shared.now(), start);
	}
}
