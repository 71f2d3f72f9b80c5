// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use hexalabs_lab_core::{
	ConsoleCredentials, CourseId, ExternalAccount, LabId, LabSession, LabStatus, ProgressPayload,
	ProgressSnapshot, PurchaseId,
};
use hexalabs_lab_runtime::{
	AnchoredClock, Clock, Collaborators, ConfirmAnswer, ConfirmPrompt, Confirmer, LabApi,
	LabApiError, MemoryKeyValueStore, MemoryProgressCache, Navigator, Notifier, Route,
};

/// Side effects in the order they happened, shared by every fake.
#[derive(Clone, Default)]
pub struct Timeline(Arc<Mutex<Vec<(tokio::time::Instant, String)>>>);

impl Timeline {
	pub fn record(&self, event: impl Into<String>) {
		self
			.0
			.lock()
			.unwrap()
			.push((tokio::time::Instant::now(), event.into()));
	}

	pub fn events(&self) -> Vec<String> {
		self.0.lock().unwrap().iter().map(|(_, e)| e.clone()).collect()
	}

	pub fn at(&self, event: &str) -> Option<tokio::time::Instant> {
		self
			.0
			.lock()
			.unwrap()
			.iter()
			.find(|(_, e)| e == event)
			.map(|(at, _)| *at)
	}
}

pub struct FakeBackend {
	pub timeline: Timeline,
	statuses: Mutex<VecDeque<LabStatus>>,
	pub latency: Duration,
	pub saves: Mutex<Vec<ProgressPayload>>,
}

impl FakeBackend {
	pub fn new(timeline: Timeline) -> Self {
		Self {
			timeline,
			statuses: Mutex::new(VecDeque::new()),
			latency: Duration::ZERO,
			saves: Mutex::new(Vec::new()),
		}
	}

	pub fn with_statuses(self, statuses: impl IntoIterator<Item = LabStatus>) -> Self {
		self.statuses.lock().unwrap().extend(statuses);
		self
	}

	pub fn with_latency(mut self, latency: Duration) -> Self {
		self.latency = latency;
		self
	}

	async fn call(&self, name: String) {
		self.timeline.record(format!("{name}:start"));
		if !self.latency.is_zero() {
			tokio::time::sleep(self.latency).await;
		}
		self.timeline.record(format!("{name}:end"));
	}
}

#[async_trait]
impl LabApi for FakeBackend {
	async fn launch(
		&self,
		course_id: &CourseId,
		purchase_id: &PurchaseId,
	) -> Result<LabSession, LabApiError> {
		self.call("launch".into()).await;
		Ok(LabSession {
			course_id: course_id.clone(),
			purchase_id: purchase_id.clone(),
			..session(session_start(), TimeDelta::hours(2))
		})
	}

	async fn status(&self, _lab_id: &LabId) -> Result<LabStatus, LabApiError> {
		self.timeline.record("status");
		Ok(self
			.statuses
			.lock()
			.unwrap()
			.pop_front()
			.unwrap_or(LabStatus::Provisioning))
	}

	async fn console_credentials(
		&self,
		_course_id: &CourseId,
	) -> Result<ConsoleCredentials, LabApiError> {
		self.call("console".into()).await;
		Ok(session(session_start(), TimeDelta::hours(2)).console)
	}

	async fn restart(&self, _course_id: &CourseId) -> Result<(), LabApiError> {
		self.call("restart".into()).await;
		Ok(())
	}

	async fn close(&self, _purchase_id: &PurchaseId) -> Result<(), LabApiError> {
		self.call("close".into()).await;
		Ok(())
	}

	async fn delete(&self, _purchase_id: &PurchaseId) -> Result<String, LabApiError> {
		self.call("delete".into()).await;
		Ok("deleted".into())
	}

	async fn get_progress(
		&self,
		_purchase_id: &PurchaseId,
	) -> Result<Option<ProgressSnapshot>, LabApiError> {
		Ok(None)
	}

	async fn save_progress(&self, payload: &ProgressPayload) -> Result<(), LabApiError> {
		self.call("save".into()).await;
		self.saves.lock().unwrap().push(payload.clone());
		Ok(())
	}

	async fn create_account(&self, _course_id: &CourseId) -> Result<ExternalAccount, LabApiError> {
		self.call("account".into()).await;
		Ok(ExternalAccount {
			username: "student".into(),
			password: "pw".into(),
			resource_group: "rg".into(),
			portal_url: "https://portal.azure.com".into(),
		})
	}
}

pub struct FakeNavigator(pub Timeline);

#[async_trait]
impl Navigator for FakeNavigator {
	async fn navigate(&self, route: Route) {
		self.0.record(format!("navigate {}", route.path()));
	}

	async fn refresh(&self) {
		self.0.record("refresh");
	}

	async fn reload(&self) {
		self.0.record("reload");
	}
}

pub struct AlwaysConfirm;

#[async_trait]
impl Confirmer for AlwaysConfirm {
	async fn confirm(&self, prompt: ConfirmPrompt) -> ConfirmAnswer {
		match prompt {
			ConfirmPrompt::Destroy { literal } => ConfirmAnswer::Typed(literal.to_string()),
			_ => ConfirmAnswer::Accepted,
		}
	}
}

#[derive(Default)]
pub struct Notices(pub Mutex<Vec<(tokio::time::Instant, String)>>);

impl Notices {
	pub fn warnings(&self) -> Vec<(tokio::time::Instant, String)> {
		self.0.lock().unwrap().clone()
	}
}

#[async_trait]
impl Notifier for Notices {
	async fn info(&self, _message: &str) {}

	async fn warning(&self, message: &str) {
		self
			.0
			.lock()
			.unwrap()
			.push((tokio::time::Instant::now(), message.to_string()));
	}

	async fn error(&self, _message: &str) {}
}

pub fn session_start() -> DateTime<Utc> {
	Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap()
}

/// A session that started at `start` and expires `lifetime` later, with
/// complete gateway credentials.
pub fn session(start: DateTime<Utc>, lifetime: TimeDelta) -> LabSession {
	LabSession {
		id: LabId::new("rg-lab-1"),
		purchase_id: PurchaseId::new("p-1"),
		course_id: CourseId::new("az-104"),
		status: LabStatus::Provisioning,
		start_time: start,
		expires_at: start + lifetime,
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

pub struct Harness {
	pub timeline: Timeline,
	pub backend: Arc<FakeBackend>,
	pub notices: Arc<Notices>,
	pub cache: Arc<MemoryProgressCache>,
	pub collaborators: Collaborators,
}

pub fn harness(backend: FakeBackend, now: DateTime<Utc>) -> Harness {
	let timeline = backend.timeline.clone();
	let backend = Arc::new(backend);
	let notices = Arc::new(Notices::default());
	let cache = Arc::new(MemoryProgressCache::new());
	let clock: Arc<dyn Clock> = Arc::new(AnchoredClock::new(now));
	let collaborators = Collaborators {
		api: backend.clone(),
		navigator: Arc::new(FakeNavigator(timeline.clone())),
		confirmer: Arc::new(AlwaysConfirm),
		notifier: notices.clone(),
		session_store: Arc::new(MemoryKeyValueStore::with_clock(Arc::clone(&clock))),
		progress_cache: cache.clone(),
		clock,
	};
	Harness {
		timeline,
		backend,
		notices,
		cache,
		collaborators,
	}
}
