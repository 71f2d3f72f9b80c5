// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Decides what the console area shows.

use std::sync::Arc;

use hexalabs_lab_core::{ConsoleEmbed, LabSession, LabStatus};
use tracing::info;
use url::Url;

use crate::api::Navigator;
use crate::error::StoreError;
use crate::kv::RefreshFlags;
use crate::poller::{PollPhase, PollState};

pub const PROVISIONING_MESSAGE: &str = "Provisioning Your Lab Environment";
pub const PREPARING_MESSAGE: &str = "Preparing Console";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleView {
	Loading {
		status: LabStatus,
		message: &'static str,
	},
	Console {
		embed: ConsoleEmbed,
	},
	/// The console is ready, but the gateway only finishes its handshake
	/// after a full reload. Shown once per session.
	ConsoleWithRefreshOverlay {
		embed: ConsoleEmbed,
	},
}

impl ConsoleView {
	pub fn embed(&self) -> Option<&ConsoleEmbed> {
		match self {
			ConsoleView::Loading { .. } => None,
			ConsoleView::Console { embed } | ConsoleView::ConsoleWithRefreshOverlay { embed } => {
				Some(embed)
			}
		}
	}
}

pub struct ConsoleGate {
	gateway: Url,
	flags: RefreshFlags,
	navigator: Arc<dyn Navigator>,
}

impl ConsoleGate {
	pub fn new(gateway: Url, flags: RefreshFlags, navigator: Arc<dyn Navigator>) -> Self {
		Self {
			gateway,
			flags,
			navigator,
		}
	}

	pub async fn view(&self, session: &LabSession, poll: &PollState) -> ConsoleView {
		match poll.phase {
			PollPhase::Polling | PollPhase::StoppedHidden => ConsoleView::Loading {
				status: poll.status,
				message: match poll.status {
					LabStatus::Provisioning => PROVISIONING_MESSAGE,
					_ => PREPARING_MESSAGE,
				},
			},
			PollPhase::StoppedShown => {
				let embed = ConsoleEmbed::new(&self.gateway, &session.console);
				if self.flags.is_set(&session.id).await {
					ConsoleView::Console { embed }
				} else {
					ConsoleView::ConsoleWithRefreshOverlay { embed }
				}
			}
		}
	}

	/// Records the refresh for this session and asks the host for a full
	/// reload. The flag expires with the session.
	pub async fn acknowledge_refresh(&self, session: &LabSession) -> Result<(), StoreError> {
		self.flags.mark(&session.id, Some(session.expires_at)).await?;
		info!(lab_id = %session.id, "console refresh acknowledged");
		self.navigator.reload().await;
		Ok(())
	}
}
