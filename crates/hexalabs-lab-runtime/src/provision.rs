// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! On-demand cloud portal account for the lab.
//!
//! The returned credentials stay in memory for the lifetime of the
//! provisioner and are never written to disk.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use hexalabs_lab_core::{CourseId, ExternalAccount};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::api::{Clipboard, LabApi};
use crate::error::{LabApiError, ProvisionError};
use crate::schedule::ScheduledTask;

pub const DEFAULT_PORTAL_URL: &str = "https://portal.azure.com";

/// How long a field shows as copied.
pub const COPIED_FEEDBACK: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionState {
	Idle,
	Loading,
	Ready(ExternalAccount),
	Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountField {
	Username,
	Password,
	ResourceGroup,
	PortalUrl,
}

impl AccountField {
	fn value<'a>(&self, account: &'a ExternalAccount) -> &'a str {
		match self {
			AccountField::Username => &account.username,
			AccountField::Password => account.password.expose(),
			AccountField::ResourceGroup => &account.resource_group,
			AccountField::PortalUrl => &account.portal_url,
		}
	}
}

/// Accepts credentials already attached to the session when the username,
/// password and resource group are all present.
fn usable_preset(account: ExternalAccount) -> Option<ExternalAccount> {
	let complete = !account.username.trim().is_empty()
		&& !account.password.is_blank()
		&& !account.resource_group.trim().is_empty();
	if !complete {
		return None;
	}
	let mut account = account;
	if account.portal_url.trim().is_empty() {
		account.portal_url = DEFAULT_PORTAL_URL.to_string();
	}
	Some(account)
}

pub struct CredentialProvisioner {
	course_id: CourseId,
	api: Arc<dyn LabApi>,
	state: watch::Sender<ProvisionState>,
	copied: Arc<Mutex<HashSet<AccountField>>>,
	copy_timers: Mutex<HashMap<AccountField, ScheduledTask>>,
}

impl CredentialProvisioner {
	pub fn new(course_id: CourseId, api: Arc<dyn LabApi>, preset: Option<ExternalAccount>) -> Self {
		let initial = match preset.and_then(usable_preset) {
			Some(account) => ProvisionState::Ready(account),
			None => ProvisionState::Idle,
		};
		let (state, _) = watch::channel(initial);
		Self {
			course_id,
			api,
			state,
			copied: Arc::new(Mutex::new(HashSet::new())),
			copy_timers: Mutex::new(HashMap::new()),
		}
	}

	pub fn state(&self) -> ProvisionState {
		self.state.borrow().clone()
	}

	pub fn subscribe(&self) -> watch::Receiver<ProvisionState> {
		self.state.subscribe()
	}

	/// Returns the account, creating it if none is held yet. A failure moves
	/// to [`ProvisionState::Failed`]; calling again retries.
	pub async fn provision(&self) -> Result<ExternalAccount, ProvisionError> {
		let mut busy = false;
		let mut ready = None;
		self.state.send_if_modified(|state| match state {
			ProvisionState::Ready(account) => {
				ready = Some(account.clone());
				false
			}
			ProvisionState::Loading => {
				busy = true;
				false
			}
			_ => {
				*state = ProvisionState::Loading;
				true
			}
		});
		if let Some(account) = ready {
			return Ok(account);
		}
		if busy {
			return Err(ProvisionError::InProgress);
		}

		match self.api.create_account(&self.course_id).await {
			Ok(account) => {
				info!(
						course_id = %self.course_id,
						username = %account.username,
						resource_group = %account.resource_group,
						"portal account ready"
				);
				self.state.send_replace(ProvisionState::Ready(account.clone()));
				Ok(account)
			}
			Err(e) => {
				warn!(course_id = %self.course_id, error = %e, "portal account creation failed");
				let message = match &e {
					LabApiError::Rejected { message, .. } => message.clone(),
					_ => "Failed to create Azure account".to_string(),
				};
				self.state.send_replace(ProvisionState::Failed(message));
				Err(e.into())
			}
		}
	}

	/// Copies one field and marks it copied for [`COPIED_FEEDBACK`]. Copying
	/// the same field again restarts its timer; other fields are unaffected.
	pub async fn copy(
		&self,
		field: AccountField,
		clipboard: &dyn Clipboard,
	) -> Result<(), ProvisionError> {
		let value = self.field_value(field)?;
		clipboard
			.write_text(&value)
			.await
			.map_err(ProvisionError::Clipboard)?;

		self
			.copied
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.insert(field);

		let copied: Weak<Mutex<HashSet<AccountField>>> = Arc::downgrade(&self.copied);
		let timer = ScheduledTask::after(COPIED_FEEDBACK, async move {
			if let Some(copied) = copied.upgrade() {
				copied
					.lock()
					.unwrap_or_else(PoisonError::into_inner)
					.remove(&field);
			}
		});
		self
			.copy_timers
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.insert(field, timer);
		Ok(())
	}

	fn field_value(&self, field: AccountField) -> Result<String, ProvisionError> {
		match &*self.state.borrow() {
			ProvisionState::Ready(account) => Ok(field.value(account).to_string()),
			_ => Err(ProvisionError::NotReady),
		}
	}

	pub fn is_copied(&self, field: AccountField) -> bool {
		self
			.copied
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.contains(&field)
	}
}
