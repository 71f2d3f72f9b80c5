// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Wires the components together for one launched session.

use std::sync::Arc;

use chrono::TimeDelta;
use hexalabs_lab_core::{LabSession, SessionClock, TaskSequence, EXPIRY_WARNING_THRESHOLD};
use url::Url;

use crate::api::{Confirmer, LabApi, Navigator, Notifier};
use crate::cache::ProgressCache;
use crate::clock::Clock;
use crate::gate::{ConsoleGate, ConsoleView};
use crate::kv::{KeyValueStore, RefreshFlags};
use crate::lifecycle::LifecycleController;
use crate::poller::{PollHandle, PollState, PollerConfig, StatusPoller};
use crate::progress::{ProgressStore, ProgressTimings};
use crate::provision::CredentialProvisioner;
use crate::timers::SessionTimers;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
	pub gateway: Url,
	pub poller: PollerConfig,
	pub progress: ProgressTimings,
	pub warning_threshold: TimeDelta,
}

impl RuntimeConfig {
	pub fn new(gateway: Url) -> Self {
		Self {
			gateway,
			poller: PollerConfig::default(),
			progress: ProgressTimings::default(),
			warning_threshold: EXPIRY_WARNING_THRESHOLD,
		}
	}
}

#[derive(Clone)]
pub struct Collaborators {
	pub api: Arc<dyn LabApi>,
	pub navigator: Arc<dyn Navigator>,
	pub confirmer: Arc<dyn Confirmer>,
	pub notifier: Arc<dyn Notifier>,
	pub session_store: Arc<dyn KeyValueStore>,
	pub progress_cache: Arc<dyn ProgressCache>,
	pub clock: Arc<dyn Clock>,
}

/// Everything running for one session. Dropping it stops every timer the
/// session owns.
pub struct LabRuntime {
	session: LabSession,
	poll: PollHandle,
	gate: ConsoleGate,
	timers: SessionTimers,
	lifecycle: LifecycleController,
	provisioner: CredentialProvisioner,
	progress: Option<ProgressStore>,
}

impl LabRuntime {
	/// Starts polling and the session timers. Progress tracking is enabled
	/// when the lab has a task sequence.
	pub fn start(
		session: LabSession,
		tasks: Option<TaskSequence>,
		config: &RuntimeConfig,
		collaborators: Collaborators,
	) -> Self {
		let flags = RefreshFlags::new(Arc::clone(&collaborators.session_store));

		let poller = StatusPoller::new(
			Arc::clone(&collaborators.api),
			flags.clone(),
			config.poller,
		);
		let poll = poller.spawn(
			session.id.clone(),
			session.status,
			session.console.clone(),
		);

		let gate = ConsoleGate::new(
			config.gateway.clone(),
			flags,
			Arc::clone(&collaborators.navigator),
		);

		let timers = SessionTimers::start(
			SessionClock::new(session.start_time, session.expires_at),
			Arc::clone(&collaborators.clock),
			Arc::clone(&collaborators.notifier),
			config.warning_threshold,
		);

		let lifecycle = LifecycleController::new(
			Arc::clone(&collaborators.api),
			Arc::clone(&collaborators.navigator),
			Arc::clone(&collaborators.confirmer),
			Arc::clone(&collaborators.notifier),
		);

		let provisioner = CredentialProvisioner::new(
			session.course_id.clone(),
			Arc::clone(&collaborators.api),
			session.external_account.clone(),
		);

		let progress = tasks.map(|sequence| {
			ProgressStore::new(
				session.course_id.clone(),
				session.purchase_id.clone(),
				sequence,
				Arc::clone(&collaborators.api),
				Arc::clone(&collaborators.progress_cache),
				config.progress,
			)
		});

		Self {
			session,
			poll,
			gate,
			timers,
			lifecycle,
			provisioner,
			progress,
		}
	}

	pub fn session(&self) -> &LabSession {
		&self.session
	}

	pub fn poll_state(&self) -> PollState {
		self.poll.state()
	}

	pub async fn console_view(&self) -> ConsoleView {
		self.gate.view(&self.session, &self.poll.state()).await
	}

	/// Waits for polling to finish, then returns the resulting view.
	pub async fn wait_for_console(&mut self) -> ConsoleView {
		let state = self.poll.finished().await;
		self.gate.view(&self.session, &state).await
	}

	pub fn gate(&self) -> &ConsoleGate {
		&self.gate
	}

	pub fn timers(&self) -> &SessionTimers {
		&self.timers
	}

	pub fn lifecycle(&self) -> &LifecycleController {
		&self.lifecycle
	}

	pub fn provisioner(&self) -> &CredentialProvisioner {
		&self.provisioner
	}

	pub fn progress(&self) -> Option<&ProgressStore> {
		self.progress.as_ref()
	}
}
