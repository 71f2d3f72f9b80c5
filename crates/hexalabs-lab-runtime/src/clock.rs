// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};

/// Source of wall-clock time for the session timers.
pub trait Clock: Send + Sync {
	fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> DateTime<Utc> {
		Utc::now()
	}
}

/// Wall time that advances with the tokio clock.
///
/// Under `tokio::time::pause` the runtime clock jumps forward while
/// `Utc::now()` does not, so timers driven by this clock stay consistent with
/// the ticks that drive them.
#[derive(Debug, Clone, Copy)]
pub struct AnchoredClock {
	wall: DateTime<Utc>,
	anchor: tokio::time::Instant,
}

impl AnchoredClock {
	pub fn new(wall: DateTime<Utc>) -> Self {
		Self {
			wall,
			anchor: tokio::time::Instant::now(),
		}
	}
}

impl Clock for AnchoredClock {
	fn now(&self) -> DateTime<Utc> {
		let elapsed = tokio::time::Instant::now().duration_since(self.anchor);
		let elapsed = chrono::TimeDelta::from_std(elapsed).unwrap_or_else(|_| chrono::TimeDelta::zero());
		self.wall + elapsed
	}
}
