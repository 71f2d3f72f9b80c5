// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! The countdown and usage-badge tickers.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use hexalabs_lab_core::{Countdown, ExpiryWarning, SessionClock, TimerReading};
use tokio::sync::watch;
use tracing::warn;

use crate::api::Notifier;
use crate::clock::Clock;
use crate::schedule::Ticker;

pub const COUNTDOWN_PERIOD: Duration = Duration::from_secs(60);
pub const BADGE_PERIOD: Duration = Duration::from_secs(1);

pub const EXPIRY_WARNING_MESSAGE: &str = "Session Expiring Soon! Your lab session will expire in \
	less than 1 hour. Please close the lab now to save your work via snapshot, then relaunch to \
	continue.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownState {
	pub countdown: Countdown,
	/// Set once the expiry warning has fired; the host highlights the timer.
	pub warning: bool,
}

/// Owns both tickers. Dropping it stops them.
pub struct SessionTimers {
	countdown: watch::Receiver<CountdownState>,
	badge: watch::Receiver<Option<TimerReading>>,
	_countdown_ticker: Ticker,
	_badge_ticker: Ticker,
}

impl SessionTimers {
	/// The countdown is evaluated immediately and then every minute; the badge
	/// first updates after one second and then every second.
	pub fn start(
		session: SessionClock,
		clock: Arc<dyn Clock>,
		notifier: Arc<dyn Notifier>,
		warning_threshold: TimeDelta,
	) -> Self {
		let initial = CountdownState {
			countdown: session.countdown(clock.now()),
			warning: false,
		};
		let (countdown_tx, countdown) = watch::channel(initial);
		let (badge_tx, badge) = watch::channel(None);

		let countdown_clock = Arc::clone(&clock);
		let mut latch = ExpiryWarning::new(warning_threshold);
		let countdown_ticker = Ticker::spawn(Duration::ZERO, COUNTDOWN_PERIOD, move || {
			let now = countdown_clock.now();
			let fire = latch.observe(session.remaining(now));
			countdown_tx.send_replace(CountdownState {
				countdown: session.countdown(now),
				warning: latch.has_fired(),
			});
			let notifier = Arc::clone(&notifier);
			async move {
				if fire {
					warn!(expires_at = %session.expires_at(), "lab session expiring soon");
					notifier.warning(EXPIRY_WARNING_MESSAGE).await;
				}
				ControlFlow::Continue(())
			}
		});

		let badge_ticker = Ticker::spawn(BADGE_PERIOD, BADGE_PERIOD, move || {
			badge_tx.send_replace(Some(session.reading(clock.now())));
			async { ControlFlow::Continue(()) }
		});

		Self {
			countdown,
			badge,
			_countdown_ticker: countdown_ticker,
			_badge_ticker: badge_ticker,
		}
	}

	pub fn countdown(&self) -> CountdownState {
		*self.countdown.borrow()
	}

	pub fn subscribe_countdown(&self) -> watch::Receiver<CountdownState> {
		self.countdown.clone()
	}

	/// `None` until the first badge tick.
	pub fn badge(&self) -> Option<TimerReading> {
		*self.badge.borrow()
	}

	pub fn subscribe_badge(&self) -> watch::Receiver<Option<TimerReading>> {
		self.badge.clone()
	}
}
