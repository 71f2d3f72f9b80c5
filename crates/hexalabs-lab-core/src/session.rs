// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Lab session snapshot, console credentials and the console invariant.

use std::fmt;

use chrono::{DateTime, Utc};
use hexalabs_common_secret::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::ids::{CourseId, LabId, PurchaseId};

/// Launch allowance assumed when the backend omits `maxLaunches`.
pub const DEFAULT_MAX_LAUNCHES: u32 = 10;

/// Provisioning state reported by the backend.
///
/// The status endpoint also answers with values such as `stopped` or
/// `not_found`; those collapse into [`LabStatus::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabStatus {
	Provisioning,
	Running,
	Expired,
	#[serde(other)]
	Unknown,
}

impl LabStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			LabStatus::Provisioning => "provisioning",
			LabStatus::Running => "running",
			LabStatus::Expired => "expired",
			LabStatus::Unknown => "unknown",
		}
	}
}

impl fmt::Display for LabStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

fn present(value: Option<&str>) -> bool {
	value.is_some_and(|v| !v.is_empty())
}

fn present_secret(value: Option<&SecretString>) -> bool {
	value.is_some_and(|v| !v.expose().is_empty())
}

/// Gateway credentials issued for a session.
///
/// Every field is optional because the backend fills them in as provisioning
/// progresses. An empty string is treated exactly like a missing value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleCredentials {
	#[serde(default)]
	pub connection_id: Option<String>,
	#[serde(default)]
	pub username: Option<String>,
	#[serde(default)]
	pub password: Option<SecretString>,
	#[serde(default)]
	pub auth_token: Option<SecretString>,
}

impl ConsoleCredentials {
	pub fn has_connection(&self) -> bool {
		present(self.connection_id.as_deref())
	}

	/// Either a token or a username is enough to authenticate at the gateway.
	pub fn has_identity(&self) -> bool {
		present_secret(self.auth_token.as_ref()) || present(self.username.as_deref())
	}

	pub fn is_complete(&self) -> bool {
		self.has_connection() && self.has_identity()
	}
}

/// The console may be embedded iff the lab is running and the gateway
/// credentials are complete.
pub fn console_ready(status: LabStatus, credentials: &ConsoleCredentials) -> bool {
	status == LabStatus::Running && credentials.is_complete()
}

/// Target URL for the embedded gateway console.
///
/// The gateway's login form reads `username` and `password` from the query
/// inside the URL fragment, so the credentials are carried in plain text. The
/// `Debug` impl prints only the origin.
#[derive(Clone, PartialEq, Eq)]
pub struct ConsoleEmbed {
	url: Url,
}

impl ConsoleEmbed {
	/// Builds `{gateway}/#/?username=..&password=..`.
	pub fn new(gateway: &Url, credentials: &ConsoleCredentials) -> Self {
		let mut url = gateway.clone();
		if !url.path().ends_with('/') {
			let path = format!("{}/", url.path());
			url.set_path(&path);
		}

		let query = url::form_urlencoded::Serializer::new(String::new())
			.append_pair("username", credentials.username.as_deref().unwrap_or_default())
			.append_pair(
				"password",
				credentials
					.password
					.as_ref()
					.map(|p| p.expose().as_str())
					.unwrap_or_default(),
			)
			.finish();
		url.set_fragment(Some(&format!("/?{query}")));

		Self { url }
	}

	/// The full URL, credentials included.
	pub fn expose_url(&self) -> &Url {
		&self.url
	}
}

impl fmt::Debug for ConsoleEmbed {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ConsoleEmbed")
			.field("origin", &self.url.origin().ascii_serialization())
			.field("path", &self.url.path())
			.field("fragment", &hexalabs_common_secret::REDACTED)
			.finish()
	}
}

/// Cloud portal account provisioned for the lab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalAccount {
	pub username: String,
	pub password: SecretString,
	#[serde(default)]
	pub resource_group: String,
	#[serde(default)]
	pub portal_url: String,
}

/// Everything the runtime knows about one lab session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabSession {
	pub id: LabId,
	pub purchase_id: PurchaseId,
	pub course_id: CourseId,
	pub status: LabStatus,
	pub start_time: DateTime<Utc>,
	pub expires_at: DateTime<Utc>,
	pub launch_count: u32,
	pub max_launches: u32,
	pub console: ConsoleCredentials,
	pub external_account: Option<ExternalAccount>,
}

impl LabSession {
	pub fn remaining_launches(&self) -> u32 {
		self.max_launches.saturating_sub(self.launch_count)
	}

	pub fn console_ready(&self) -> bool {
		console_ready(self.status, &self.console)
	}

	pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
		self.status == LabStatus::Expired || now >= self.expires_at
	}
}
