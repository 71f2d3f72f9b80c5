// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Scripted collaborators for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use hexalabs_lab_core::{
	ConsoleCredentials, CourseId, ExternalAccount, LabId, LabSession, LabStatus, ProgressPayload,
	ProgressSnapshot, PurchaseId,
};
use reqwest::StatusCode;

use crate::api::{
	Clipboard, ConfirmAnswer, ConfirmPrompt, Confirmer, LabApi, Navigator, Notifier, Route,
};
use crate::error::LabApiError;

/// Ordered record of side effects across collaborators.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
	pub fn push(&self, entry: impl Into<String>) {
		self.0.lock().unwrap().push(entry.into());
	}

	pub fn entries(&self) -> Vec<String> {
		self.0.lock().unwrap().clone()
	}
}

pub fn session() -> LabSession {
	let start = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
	LabSession {
		id: LabId::new("lab-1"),
		purchase_id: PurchaseId::new("p-1"),
		course_id: CourseId::new("c-1"),
		status: LabStatus::Running,
		start_time: start,
		expires_at: start + chrono::TimeDelta::hours(2),
		launch_count: 1,
		max_launches: 10,
		console: ConsoleCredentials {
			connection_id: Some("17".into()),
			username: Some("student".into()),
			password: Some("pw".into()),
			auth_token: None,
		},
		external_account: None,
	}
}

pub fn account() -> ExternalAccount {
	ExternalAccount {
		username: "student@labs.example.com".into(),
		password: "Az!pw".into(),
		resource_group: "rg-lab-1".into(),
		portal_url: "https://portal.azure.com".into(),
	}
}

#[derive(Default)]
pub struct MockLabApi {
	pub journal: Journal,
	statuses: Mutex<VecDeque<Result<LabStatus, LabApiError>>>,
	status_calls: AtomicUsize,
	failure: Mutex<Option<String>>,
	latency: Mutex<Duration>,
	remote_progress: Mutex<Option<ProgressSnapshot>>,
	saved: Mutex<Vec<ProgressPayload>>,
}

impl MockLabApi {
	pub fn with_journal(journal: Journal) -> Self {
		Self {
			journal,
			..Default::default()
		}
	}

	pub fn push_statuses(&self, statuses: impl IntoIterator<Item = Result<LabStatus, LabApiError>>) {
		self.statuses.lock().unwrap().extend(statuses);
	}

	pub fn status_calls(&self) -> usize {
		self.status_calls.load(Ordering::SeqCst)
	}

	/// Every mutating call fails with `message` until cleared.
	pub fn fail_with(&self, message: Option<&str>) {
		*self.failure.lock().unwrap() = message.map(str::to_string);
	}

	pub fn set_latency(&self, latency: Duration) {
		*self.latency.lock().unwrap() = latency;
	}

	pub fn set_remote_progress(&self, snapshot: Option<ProgressSnapshot>) {
		*self.remote_progress.lock().unwrap() = snapshot;
	}

	pub fn saved(&self) -> Vec<ProgressPayload> {
		self.saved.lock().unwrap().clone()
	}

	async fn respond(&self, call: String) -> Result<(), LabApiError> {
		self.journal.push(format!("{call}:start"));
		let latency = *self.latency.lock().unwrap();
		if !latency.is_zero() {
			tokio::time::sleep(latency).await;
		}
		let failure = self.failure.lock().unwrap().clone();
		self.journal.push(format!("{call}:end"));
		match failure {
			Some(message) => Err(LabApiError::Rejected {
				status: StatusCode::INTERNAL_SERVER_ERROR,
				message,
			}),
			None => Ok(()),
		}
	}
}

#[async_trait]
impl LabApi for MockLabApi {
	async fn launch(
		&self,
		course_id: &CourseId,
		purchase_id: &PurchaseId,
	) -> Result<LabSession, LabApiError> {
		self.respond(format!("launch {course_id}")).await?;
		Ok(LabSession {
			course_id: course_id.clone(),
			purchase_id: purchase_id.clone(),
			..session()
		})
	}

	async fn status(&self, _lab_id: &LabId) -> Result<LabStatus, LabApiError> {
		self.status_calls.fetch_add(1, Ordering::SeqCst);
		self
			.statuses
			.lock()
			.unwrap()
			.pop_front()
			.unwrap_or(Ok(LabStatus::Provisioning))
	}

	async fn console_credentials(
		&self,
		course_id: &CourseId,
	) -> Result<ConsoleCredentials, LabApiError> {
		self.respond(format!("console {course_id}")).await?;
		Ok(session().console)
	}

	async fn restart(&self, course_id: &CourseId) -> Result<(), LabApiError> {
		self.respond(format!("restart {course_id}")).await
	}

	async fn close(&self, purchase_id: &PurchaseId) -> Result<(), LabApiError> {
		self.respond(format!("close {purchase_id}")).await
	}

	async fn delete(&self, purchase_id: &PurchaseId) -> Result<String, LabApiError> {
		self.respond(format!("delete {purchase_id}")).await?;
		Ok("All resources have been deleted.".into())
	}

	async fn get_progress(
		&self,
		_purchase_id: &PurchaseId,
	) -> Result<Option<ProgressSnapshot>, LabApiError> {
		if let Some(message) = self.failure.lock().unwrap().clone() {
			return Err(LabApiError::Rejected {
				status: StatusCode::SERVICE_UNAVAILABLE,
				message,
			});
		}
		Ok(self.remote_progress.lock().unwrap().clone())
	}

	async fn save_progress(&self, payload: &ProgressPayload) -> Result<(), LabApiError> {
		self.respond(format!("save {}", payload.purchase_id)).await?;
		self.saved.lock().unwrap().push(payload.clone());
		Ok(())
	}

	async fn create_account(&self, course_id: &CourseId) -> Result<ExternalAccount, LabApiError> {
		self.respond(format!("account {course_id}")).await?;
		Ok(account())
	}
}

#[derive(Default)]
pub struct RecordingNavigator {
	pub journal: Journal,
}

impl RecordingNavigator {
	pub fn with_journal(journal: Journal) -> Self {
		Self { journal }
	}
}

#[async_trait]
impl Navigator for RecordingNavigator {
	async fn navigate(&self, route: Route) {
		self.journal.push(format!("navigate {}", route.path()));
	}

	async fn refresh(&self) {
		self.journal.push("refresh");
	}

	async fn reload(&self) {
		self.journal.push("reload");
	}
}

pub struct ScriptedConfirmer {
	answers: Mutex<VecDeque<ConfirmAnswer>>,
	pub prompts: Mutex<Vec<ConfirmPrompt>>,
}

impl ScriptedConfirmer {
	pub fn new(answers: impl IntoIterator<Item = ConfirmAnswer>) -> Self {
		Self {
			answers: Mutex::new(answers.into_iter().collect()),
			prompts: Mutex::new(Vec::new()),
		}
	}
}

#[async_trait]
impl Confirmer for ScriptedConfirmer {
	async fn confirm(&self, prompt: ConfirmPrompt) -> ConfirmAnswer {
		self.prompts.lock().unwrap().push(prompt);
		self
			.answers
			.lock()
			.unwrap()
			.pop_front()
			.unwrap_or(ConfirmAnswer::Declined)
	}
}

#[derive(Default)]
pub struct RecordingNotifier {
	pub messages: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
	pub fn of_kind(&self, kind: &str) -> Vec<String> {
		self
			.messages
			.lock()
			.unwrap()
			.iter()
			.filter(|(k, _)| k == kind)
			.map(|(_, m)| m.clone())
			.collect()
	}
}

#[async_trait]
impl Notifier for RecordingNotifier {
	async fn info(&self, message: &str) {
		self.messages.lock().unwrap().push(("info".into(), message.into()));
	}

	async fn warning(&self, message: &str) {
		self
			.messages
			.lock()
			.unwrap()
			.push(("warning".into(), message.into()));
	}

	async fn error(&self, message: &str) {
		self.messages.lock().unwrap().push(("error".into(), message.into()));
	}
}

#[derive(Default)]
pub struct MemoryClipboard {
	pub contents: Mutex<Vec<String>>,
}

#[async_trait]
impl Clipboard for MemoryClipboard {
	async fn write_text(&self, text: &str) -> Result<(), String> {
		self.contents.lock().unwrap().push(text.to_string());
		Ok(())
	}
}
