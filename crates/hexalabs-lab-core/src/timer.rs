// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Session time math.
//!
//! All functions take `now` explicitly so the runtime can drive them from a
//! mocked clock.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};

const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_HOUR: i64 = 3_600_000;

/// Remaining time at or below which the expiry warning fires.
pub const EXPIRY_WARNING_THRESHOLD: TimeDelta = TimeDelta::minutes(60);

/// Remaining minutes below which the usage badge is flagged as low.
pub const LOW_TIME_MINUTES: i64 = 30;

/// Formats whole minutes as `"{h}h {m}m"`.
pub fn format_hours_minutes(total_minutes: i64) -> String {
	format!("{}h {}m", total_minutes / 60, total_minutes % 60)
}

/// Elapsed and remaining whole minutes for the usage badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerReading {
	pub elapsed_minutes: i64,
	pub remaining_minutes: i64,
}

impl TimerReading {
	pub fn is_low(&self) -> bool {
		self.remaining_minutes < LOW_TIME_MINUTES
	}

	/// `"{h}h {m}m / {h}h {m}m left"`
	pub fn badge(&self) -> String {
		format!(
			"{} / {} left",
			format_hours_minutes(self.elapsed_minutes),
			format_hours_minutes(self.remaining_minutes)
		)
	}
}

/// Countdown label shown next to the lifecycle controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
	Remaining { hours: i64, minutes: i64 },
	Expired,
}

impl fmt::Display for Countdown {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Countdown::Remaining { hours, minutes } => write!(f, "{hours}h {minutes}m remaining"),
			Countdown::Expired => f.write_str("Session expired"),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClock {
	start_time: DateTime<Utc>,
	expires_at: DateTime<Utc>,
}

impl SessionClock {
	pub fn new(start_time: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
		Self {
			start_time,
			expires_at,
		}
	}

	pub fn expires_at(&self) -> DateTime<Utc> {
		self.expires_at
	}

	/// Signed time left; negative once expired.
	pub fn remaining(&self, now: DateTime<Utc>) -> TimeDelta {
		self.expires_at - now
	}

	pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
		self.remaining(now) <= TimeDelta::zero()
	}

	/// Floored minutes since start and until expiry, both clamped at zero.
	pub fn reading(&self, now: DateTime<Utc>) -> TimerReading {
		let elapsed_ms = (now - self.start_time).num_milliseconds();
		let remaining_ms = self.remaining(now).num_milliseconds();
		TimerReading {
			elapsed_minutes: elapsed_ms.div_euclid(MS_PER_MINUTE).max(0),
			remaining_minutes: remaining_ms.div_euclid(MS_PER_MINUTE).max(0),
		}
	}

	pub fn countdown(&self, now: DateTime<Utc>) -> Countdown {
		let diff = self.remaining(now).num_milliseconds();
		if diff <= 0 {
			return Countdown::Expired;
		}
		Countdown::Remaining {
			hours: diff / MS_PER_HOUR,
			minutes: (diff % MS_PER_HOUR) / MS_PER_MINUTE,
		}
	}
}

/// One-shot latch for the "less than an hour left" warning.
///
/// Fires on the first observation with `0 < remaining <= threshold` and never
/// again. A session that is observed already expired does not fire.
#[derive(Debug, Clone)]
pub struct ExpiryWarning {
	threshold: TimeDelta,
	fired: bool,
}

impl Default for ExpiryWarning {
	fn default() -> Self {
		Self::new(EXPIRY_WARNING_THRESHOLD)
	}
}

impl ExpiryWarning {
	pub fn new(threshold: TimeDelta) -> Self {
		Self {
			threshold,
			fired: false,
		}
	}

	pub fn has_fired(&self) -> bool {
		self.fired
	}

	/// Returns true exactly once.
	pub fn observe(&mut self, remaining: TimeDelta) -> bool {
		if self.fired || remaining <= TimeDelta::zero() || remaining > self.threshold {
			return false;
		}
		self.fired = true;
		true
	}
}
