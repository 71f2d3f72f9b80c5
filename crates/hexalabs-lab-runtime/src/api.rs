// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Collaborator traits.
//!
//! The controller never talks to the network, the screen or the clipboard
//! directly; each of those sits behind one of the traits below so the
//! timing-sensitive logic can be driven by mocks under paused time.

use async_trait::async_trait;
use hexalabs_lab_core::{
	ConsoleCredentials, CourseId, ExternalAccount, LabId, LabInstruction, LabSession, LabStatus,
	ProgressPayload, ProgressSnapshot, PurchaseId,
};

use crate::error::LabApiError;

/// The lab backend.
#[async_trait]
pub trait LabApi: Send + Sync {
	/// Start (or resume) the lab for a purchase and return the session snapshot.
	async fn launch(
		&self,
		course_id: &CourseId,
		purchase_id: &PurchaseId,
	) -> Result<LabSession, LabApiError>;

	async fn status(&self, lab_id: &LabId) -> Result<LabStatus, LabApiError>;

	/// Gateway credentials of the course's active session. Re-reading these
	/// does not count as a launch.
	async fn console_credentials(
		&self,
		course_id: &CourseId,
	) -> Result<ConsoleCredentials, LabApiError>;

	async fn restart(&self, course_id: &CourseId) -> Result<(), LabApiError>;

	async fn close(&self, purchase_id: &PurchaseId) -> Result<(), LabApiError>;

	/// Permanently delete the lab. Returns the backend's confirmation message.
	async fn delete(&self, purchase_id: &PurchaseId) -> Result<String, LabApiError>;

	/// `Ok(None)` when the backend has no record for this purchase.
	async fn get_progress(
		&self,
		purchase_id: &PurchaseId,
	) -> Result<Option<ProgressSnapshot>, LabApiError>;

	async fn save_progress(&self, payload: &ProgressPayload) -> Result<(), LabApiError>;

	async fn create_account(&self, course_id: &CourseId) -> Result<ExternalAccount, LabApiError>;
}

/// Routes the controller can ask the host to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
	Dashboard,
}

impl Route {
	pub fn path(&self) -> &'static str {
		match self {
			Route::Dashboard => "/dashboard",
		}
	}
}

/// Host navigation.
///
/// `refresh` re-fetches the current view's data; `reload` is a full reload,
/// which the gateway needs to finish its authentication handshake.
#[async_trait]
pub trait Navigator: Send + Sync {
	async fn navigate(&self, route: Route);
	async fn refresh(&self);
	async fn reload(&self);
}

/// The prompts a lifecycle action can show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmPrompt {
	Restart,
	/// Reminds the user to save their work before the session is torn down.
	Close,
	/// Irreversible; the user must type the given literal.
	Destroy { literal: &'static str },
}

impl ConfirmPrompt {
	pub fn title(&self) -> &'static str {
		match self {
			ConfirmPrompt::Restart => "Restart the VM?",
			ConfirmPrompt::Close => "Close Lab Session?",
			ConfirmPrompt::Destroy { .. } => "Destroy Lab Session?",
		}
	}

	pub fn message(&self) -> &'static str {
		match self {
			ConfirmPrompt::Restart => "This will reboot the virtual machine.",
			ConfirmPrompt::Close => {
				"Your work will be saved via snapshot. You can resume later. \
				 VM resources will be deleted to save costs."
			}
			ConfirmPrompt::Destroy { .. } => {
				"This will permanently delete the VM, snapshot, and all your work. \
				 The lab will remain in your dashboard for future use."
			}
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAnswer {
	Declined,
	Accepted,
	/// Free text typed by the user, for prompts that require it.
	Typed(String),
}

#[async_trait]
pub trait Confirmer: Send + Sync {
	async fn confirm(&self, prompt: ConfirmPrompt) -> ConfirmAnswer;
}

#[async_trait]
pub trait Notifier: Send + Sync {
	async fn info(&self, message: &str);
	async fn warning(&self, message: &str);
	async fn error(&self, message: &str);
}

#[async_trait]
pub trait Clipboard: Send + Sync {
	async fn write_text(&self, text: &str) -> Result<(), String>;
}

/// Looks up the instructional content for a course.
#[async_trait]
pub trait InstructionCatalog: Send + Sync {
	async fn instructions(&self, course_id: &CourseId) -> Option<LabInstruction>;
}
