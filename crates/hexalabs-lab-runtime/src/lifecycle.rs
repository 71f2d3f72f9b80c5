// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Restart, close and destroy.
//!
//! Each action has its own consistency contract:
//!
//! - `restart` awaits the backend and only reports success once it answers.
//! - `close` navigates away first and tears the session down in the
//!   background. The caller never learns whether teardown succeeded.
//! - `destroy` is irreversible, so it requires a typed confirmation and only
//!   navigates after the backend confirms the deletion.

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hexalabs_lab_core::{CourseId, PurchaseId};
use tracing::{info, instrument, warn};

use crate::api::{ConfirmAnswer, ConfirmPrompt, Confirmer, LabApi, Navigator, Notifier, Route};
use crate::error::{LabApiError, LifecycleError};
use crate::schedule::Background;

/// Text the user must type to confirm `destroy`.
pub const DESTROY_CONFIRMATION: &str = "DELETE";

/// Delay before the landing view is refreshed after `close`.
pub const CLOSE_RECONCILE_DELAY: Duration = Duration::from_millis(500);

pub const RESTART_NOTICE: &str =
	"VM restart initiated. Please wait a few moments for the VM to come back online.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOutcome {
	Completed,
	Cancelled,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
	fn drop(&mut self) {
		self.0.store(false, Ordering::SeqCst);
	}
}

fn user_message(err: &LabApiError, fallback: &str) -> String {
	match err {
		LabApiError::Rejected { message, .. } => message.clone(),
		LabApiError::Network(_) => fallback.to_string(),
		other => other.to_string(),
	}
}

pub struct LifecycleController {
	api: Arc<dyn LabApi>,
	navigator: Arc<dyn Navigator>,
	confirmer: Arc<dyn Confirmer>,
	notifier: Arc<dyn Notifier>,
	restarting: AtomicBool,
	reconcile_delay: Duration,
	background: Background,
}

impl LifecycleController {
	pub fn new(
		api: Arc<dyn LabApi>,
		navigator: Arc<dyn Navigator>,
		confirmer: Arc<dyn Confirmer>,
		notifier: Arc<dyn Notifier>,
	) -> Self {
		Self {
			api,
			navigator,
			confirmer,
			notifier,
			restarting: AtomicBool::new(false),
			reconcile_delay: CLOSE_RECONCILE_DELAY,
			background: Background::new(),
		}
	}

	pub fn is_restarting(&self) -> bool {
		self.restarting.load(Ordering::SeqCst)
	}

	/// Waits for background teardown started by `close`. A process that is
	/// about to exit calls this so the request is not cut off.
	pub async fn settle(&self) {
		self.background.settle().await;
	}

	#[instrument(skip_all, fields(course_id = %course_id))]
	pub async fn restart(&self, course_id: &CourseId) -> Result<LifecycleOutcome, LifecycleError> {
		if self.is_restarting() {
			return Err(LifecycleError::Busy);
		}
		if self.confirmer.confirm(ConfirmPrompt::Restart).await != ConfirmAnswer::Accepted {
			info!("restart cancelled");
			return Ok(LifecycleOutcome::Cancelled);
		}
		if self
			.restarting
			.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
			.is_err()
		{
			return Err(LifecycleError::Busy);
		}
		let _in_flight = InFlight(&self.restarting);

		match self.api.restart(course_id).await {
			Ok(()) => {
				info!("lab restart initiated");
				self.notifier.info(RESTART_NOTICE).await;
				self.navigator.refresh().await;
				Ok(LifecycleOutcome::Completed)
			}
			Err(e) => {
				warn!(error = %e, "lab restart failed");
				let message = user_message(&e, "Failed to restart VM. Please try again.");
				self.notifier.error(&message).await;
				Err(e.into())
			}
		}
	}

	/// Returns as soon as navigation has been requested; the teardown
	/// request runs detached.
	#[instrument(skip_all, fields(purchase_id = %purchase_id))]
	pub async fn close(&self, purchase_id: &PurchaseId) -> Result<LifecycleOutcome, LifecycleError> {
		if self.confirmer.confirm(ConfirmPrompt::Close).await != ConfirmAnswer::Accepted {
			info!("close cancelled");
			return Ok(LifecycleOutcome::Cancelled);
		}

		self.navigator.navigate(Route::Dashboard).await;

		let api = Arc::clone(&self.api);
		let id = purchase_id.clone();
		self.background.detach("lab-close", async move {
			api.close(&id).await?;
			info!(purchase_id = %id, "lab closed in background");
			Ok::<(), LabApiError>(())
		});

		// Refreshes the page the user lands on, not the closed view, so it
		// outlives this controller.
		let navigator = Arc::clone(&self.navigator);
		let delay = self.reconcile_delay;
		self.background.detach("lab-close-reconcile", async move {
			tokio::time::sleep(delay).await;
			navigator.refresh().await;
			Ok::<(), Infallible>(())
		});

		Ok(LifecycleOutcome::Completed)
	}

	#[instrument(skip_all, fields(purchase_id = %purchase_id))]
	pub async fn destroy(&self, purchase_id: &PurchaseId) -> Result<LifecycleOutcome, LifecycleError> {
		let prompt = ConfirmPrompt::Destroy {
			literal: DESTROY_CONFIRMATION,
		};
		match self.confirmer.confirm(prompt).await {
			ConfirmAnswer::Declined => {
				info!("destroy cancelled");
				return Ok(LifecycleOutcome::Cancelled);
			}
			ConfirmAnswer::Typed(text) if text == DESTROY_CONFIRMATION => {}
			_ => {
				info!("destroy confirmation mismatch");
				return Err(LifecycleError::ConfirmationMismatch);
			}
		}

		match self.api.delete(purchase_id).await {
			Ok(message) => {
				info!("lab destroyed");
				self
					.notifier
					.info(&format!("Lab Session Destroyed! {message}"))
					.await;
				self.navigator.navigate(Route::Dashboard).await;
				self.navigator.refresh().await;
				Ok(LifecycleOutcome::Completed)
			}
			Err(e) => {
				warn!(error = %e, "lab destroy failed");
				let message = user_message(&e, "Failed to destroy lab. Please try again.");
				self.notifier.error(&message).await;
				Err(e.into())
			}
		}
	}
}
