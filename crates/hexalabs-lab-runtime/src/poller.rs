// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Bounded status polling until the console can be shown.

use std::sync::Arc;
use std::time::Duration;

use hexalabs_lab_core::{console_ready, ConsoleCredentials, LabId, LabStatus};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::api::LabApi;
use crate::kv::RefreshFlags;

pub const POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const MAX_POLL_ATTEMPTS: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
	pub interval: Duration,
	pub max_attempts: u32,
}

impl Default for PollerConfig {
	fn default() -> Self {
		Self {
			interval: POLL_INTERVAL,
			max_attempts: MAX_POLL_ATTEMPTS,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
	Polling,
	StoppedShown,
	StoppedHidden,
}

impl PollPhase {
	pub fn is_terminal(&self) -> bool {
		!matches!(self, PollPhase::Polling)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollState {
	pub attempts: u32,
	pub status: LabStatus,
	pub phase: PollPhase,
}

impl PollState {
	fn start(status: LabStatus) -> Self {
		Self {
			attempts: 0,
			status,
			phase: PollPhase::Polling,
		}
	}
}

#[derive(Clone)]
pub struct StatusPoller {
	api: Arc<dyn LabApi>,
	flags: RefreshFlags,
	config: PollerConfig,
}

impl StatusPoller {
	pub fn new(api: Arc<dyn LabApi>, flags: RefreshFlags, config: PollerConfig) -> Self {
		Self { api, flags, config }
	}

	/// Polls until a terminal phase, publishing every observation to `tx`.
	///
	/// The first fetch happens one interval after the call. A failed or
	/// non-success fetch means the session no longer exists and ends polling
	/// without retry. On the final attempt no fetch is made; the decision uses
	/// the last observed status.
	pub async fn run(
		&self,
		lab_id: &LabId,
		initial: LabStatus,
		credentials: &ConsoleCredentials,
		tx: &watch::Sender<PollState>,
	) -> PollPhase {
		let mut state = PollState::start(initial);

		if console_ready(initial, credentials) && self.flags.is_set(lab_id).await {
			debug!(lab_id = %lab_id, "console already refreshed this session, skipping poll");
			state.phase = PollPhase::StoppedShown;
			tx.send_replace(state);
			return state.phase;
		}
		tx.send_replace(state);

		let mut interval =
			tokio::time::interval_at(Instant::now() + self.config.interval, self.config.interval);
		interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

		loop {
			interval.tick().await;
			state.attempts += 1;

			if state.attempts >= self.config.max_attempts {
				state.phase = if console_ready(state.status, credentials) {
					PollPhase::StoppedShown
				} else {
					PollPhase::StoppedHidden
				};
				info!(
						lab_id = %lab_id,
						attempts = state.attempts,
						status = %state.status,
						phase = ?state.phase,
						"poll attempts exhausted"
				);
				tx.send_replace(state);
				return state.phase;
			}

			match self.api.status(lab_id).await {
				Err(e) => {
					info!(
							lab_id = %lab_id,
							attempts = state.attempts,
							error = %e,
							"lab status unavailable, treating session as gone"
					);
					state.phase = PollPhase::StoppedHidden;
				}
				Ok(status) => {
					state.status = status;
					if console_ready(status, credentials) {
						info!(lab_id = %lab_id, attempts = state.attempts, "console ready");
						state.phase = PollPhase::StoppedShown;
					} else if status == LabStatus::Running {
						info!(
								lab_id = %lab_id,
								attempts = state.attempts,
								"lab running without console credentials"
						);
						state.phase = PollPhase::StoppedHidden;
					} else {
						debug!(lab_id = %lab_id, attempts = state.attempts, status = %status, "still waiting");
					}
				}
			}

			tx.send_replace(state);
			if state.phase.is_terminal() {
				return state.phase;
			}
		}
	}

	/// Runs the poll on its own task. Dropping the handle stops it.
	pub fn spawn(
		&self,
		lab_id: LabId,
		initial: LabStatus,
		credentials: ConsoleCredentials,
	) -> PollHandle {
		let (tx, rx) = watch::channel(PollState::start(initial));
		let poller = self.clone();
		let task =
			tokio::spawn(async move { poller.run(&lab_id, initial, &credentials, &tx).await });
		PollHandle { rx, task }
	}
}

pub struct PollHandle {
	rx: watch::Receiver<PollState>,
	task: JoinHandle<PollPhase>,
}

impl PollHandle {
	pub fn state(&self) -> PollState {
		*self.rx.borrow()
	}

	pub fn subscribe(&self) -> watch::Receiver<PollState> {
		self.rx.clone()
	}

	/// Waits for a terminal state. Returns the last published state if the
	/// poll was stopped before reaching one.
	pub async fn finished(&mut self) -> PollState {
		let terminal = match self.rx.wait_for(|s| s.phase.is_terminal()).await {
			Ok(state) => Some(*state),
			Err(_) => None,
		};
		terminal.unwrap_or_else(|| *self.rx.borrow())
	}

	pub fn stop(&self) {
		self.task.abort();
	}
}

impl Drop for PollHandle {
	fn drop(&mut self) {
		self.task.abort();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::kv::MemoryKeyValueStore;
	use crate::testing::MockLabApi;

	fn ready_creds() -> ConsoleCredentials {
		ConsoleCredentials {
			connection_id: Some("17".into()),
			username: Some("student".into()),
			password: Some("pw".into()),
			auth_token: None,
		}
	}

	fn poller(api: Arc<MockLabApi>) -> (StatusPoller, RefreshFlags) {
		let flags = RefreshFlags::new(Arc::new(MemoryKeyValueStore::new()));
		(
			StatusPoller::new(api, flags.clone(), PollerConfig::default()),
			flags,
		)
	}

	#[tokio::test(start_paused = true)]
	async fn already_refreshed_session_skips_polling() {
		let api = Arc::new(MockLabApi::default());
		let (poller, flags) = poller(Arc::clone(&api));
		let lab = LabId::new("lab-1");
		flags.mark(&lab, None).await.unwrap();

		let mut handle = poller.spawn(lab, LabStatus::Running, ready_creds());
		let state = handle.finished().await;
		assert_eq!(state.phase, PollPhase::StoppedShown);
		assert_eq!(state.attempts, 0);
		assert_eq!(api.status_calls(), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn ready_but_not_refreshed_still_polls() {
		let api = Arc::new(MockLabApi::default());
		api.push_statuses([Ok(LabStatus::Running)]);
		let (poller, _) = poller(Arc::clone(&api));

		let start = Instant::now();
		let mut handle = poller.spawn(LabId::new("lab-1"), LabStatus::Running, ready_creds());
		let state = handle.finished().await;
		assert_eq!(state.phase, PollPhase::StoppedShown);
		assert_eq!(state.attempts, 1);
		assert_eq!(start.elapsed(), Duration::from_secs(3));
	}

	#[tokio::test(start_paused = true)]
	async fn fetch_error_stops_hidden_without_retry() {
		let api = Arc::new(MockLabApi::default());
		api.push_statuses([
			Ok(LabStatus::Provisioning),
			Err(crate::error::LabApiError::NotFound),
		]);
		let (poller, _) = poller(Arc::clone(&api));

		let mut handle = poller.spawn(LabId::new("lab-1"), LabStatus::Provisioning, ready_creds());
		let state = handle.finished().await;
		assert_eq!(state.phase, PollPhase::StoppedHidden);
		assert_eq!(state.attempts, 2);

		tokio::time::sleep(Duration::from_secs(60)).await;
		assert_eq!(api.status_calls(), 2);
	}

	#[tokio::test(start_paused = true)]
	async fn running_without_credentials_stops_hidden() {
		let api = Arc::new(MockLabApi::default());
		api.push_statuses([Ok(LabStatus::Running)]);
		let (poller, _) = poller(Arc::clone(&api));

		let creds = ConsoleCredentials {
			connection_id: Some("17".into()),
			..Default::default()
		};
		let mut handle = poller.spawn(LabId::new("lab-1"), LabStatus::Provisioning, creds);
		let state = handle.finished().await;
		assert_eq!(state.phase, PollPhase::StoppedHidden);
		assert_eq!(state.status, LabStatus::Running);
	}

	#[tokio::test(start_paused = true)]
	async fn dropping_handle_stops_fetches() {
		let api = Arc::new(MockLabApi::default());
		let (poller, _) = poller(Arc::clone(&api));

		let handle = poller.spawn(LabId::new("lab-1"), LabStatus::Provisioning, ready_creds());
		tokio::time::sleep(Duration::from_millis(9_500)).await;
		assert_eq!(api.status_calls(), 3);
		drop(handle);

		tokio::time::sleep(Duration::from_secs(60)).await;
		assert_eq!(api.status_calls(), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn max_attempts_decides_on_last_status() {
		let api = Arc::new(MockLabApi::default());
		let (poller, _) = poller(Arc::clone(&api));
		let poller = StatusPoller {
			config: PollerConfig {
				interval: Duration::from_secs(1),
				max_attempts: 4,
			},
			..poller
		};

		let mut handle = poller.spawn(LabId::new("lab-1"), LabStatus::Provisioning, ready_creds());
		let state = handle.finished().await;
		assert_eq!(state.phase, PollPhase::StoppedHidden);
		assert_eq!(state.attempts, 4);
		assert_eq!(api.status_calls(), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn stopped_poll_reports_last_state() {
		let api = Arc::new(MockLabApi::default());
		let (poller, _) = poller(Arc::clone(&api));

		let mut handle = poller.spawn(LabId::new("lab-1"), LabStatus::Provisioning, ready_creds());
		handle.stop();
		let state = handle.finished().await;
		assert_eq!(state.phase, PollPhase::Polling);
		assert_eq!(state.attempts, 0);
		assert_eq!(state.status, LabStatus::Provisioning);
	}
}
