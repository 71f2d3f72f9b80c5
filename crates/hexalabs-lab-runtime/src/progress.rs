// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Task progress with a durable local copy and a debounced remote sync.
//!
//! Every toggle is written to the local cache before anything else happens.
//! The remote write is collapsed: each toggle resets a single timer, and only
//! the state at the moment the timer fires is sent. A sync failure only
//! changes the status indicator; local state is never rolled back.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use hexalabs_lab_core::{
	CourseId, ProgressPayload, ProgressRecord, ProgressSnapshot, PurchaseId, SyncStatus,
	TaskSequence, ToggleOutcome,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::LabApi;
use crate::cache::ProgressCache;
use crate::error::{LabApiError, ProgressError};
use crate::schedule::{Debouncer, ScheduledTask};

pub const SYNC_DEBOUNCE: Duration = Duration::from_secs(2);
pub const SAVED_RESET: Duration = Duration::from_secs(2);
pub const ERROR_RESET: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressTimings {
	pub debounce: Duration,
	pub saved_reset: Duration,
	pub error_reset: Duration,
}

impl Default for ProgressTimings {
	fn default() -> Self {
		Self {
			debounce: SYNC_DEBOUNCE,
			saved_reset: SAVED_RESET,
			error_reset: ERROR_RESET,
		}
	}
}

/// Where [`ProgressStore::load`] found the state it started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressSource {
	Remote,
	Local,
	Empty,
}

struct SyncShared {
	api: Arc<dyn LabApi>,
	status: watch::Sender<SyncStatus>,
	generation: AtomicU64,
	revert: Mutex<Option<ScheduledTask>>,
	timings: ProgressTimings,
}

impl SyncShared {
	fn set_revert(&self, task: Option<ScheduledTask>) {
		*self.revert.lock().unwrap_or_else(PoisonError::into_inner) = task;
	}

	fn schedule_revert(self: &Arc<Self>, delay: Duration, generation: u64) {
		let weak: Weak<Self> = Arc::downgrade(self);
		self.set_revert(Some(ScheduledTask::after(delay, async move {
			if let Some(shared) = weak.upgrade() {
				if shared.generation.load(Ordering::SeqCst) == generation {
					shared.status.send_replace(SyncStatus::Idle);
				}
			}
		})));
	}

	/// Sends `payload` and moves the indicator through saving to saved or
	/// error. A result that arrives after a newer sync has started leaves the
	/// indicator to that newer sync.
	async fn sync(self: Arc<Self>, payload: ProgressPayload) -> Result<(), LabApiError> {
		let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
		self.set_revert(None);
		self.status.send_replace(SyncStatus::Saving);

		let result = self.api.save_progress(&payload).await;
		let current = self.generation.load(Ordering::SeqCst) == generation;

		match &result {
			Ok(()) => {
				debug!(
						purchase_id = %payload.purchase_id,
						completed = payload.snapshot.completed_tasks.len(),
						"progress synced"
				);
				if current {
					self.status.send_replace(SyncStatus::Saved);
					self.schedule_revert(self.timings.saved_reset, generation);
				}
			}
			Err(e) => {
				warn!(purchase_id = %payload.purchase_id, error = %e, "progress sync failed");
				if current {
					self.status.send_replace(SyncStatus::Error);
					self.schedule_revert(self.timings.error_reset, generation);
				}
			}
		}
		result
	}
}

pub struct ProgressStore {
	course_id: CourseId,
	purchase_id: PurchaseId,
	sequence: TaskSequence,
	record: tokio::sync::Mutex<ProgressRecord>,
	cache: Arc<dyn ProgressCache>,
	shared: Arc<SyncShared>,
	debouncer: Debouncer,
}

impl ProgressStore {
	pub fn new(
		course_id: CourseId,
		purchase_id: PurchaseId,
		sequence: TaskSequence,
		api: Arc<dyn LabApi>,
		cache: Arc<dyn ProgressCache>,
		timings: ProgressTimings,
	) -> Self {
		let (status, _) = watch::channel(SyncStatus::Idle);
		Self {
			record: tokio::sync::Mutex::new(ProgressRecord::new(purchase_id.clone())),
			course_id,
			purchase_id,
			sequence,
			cache,
			shared: Arc::new(SyncShared {
				api,
				status,
				generation: AtomicU64::new(0),
				revert: Mutex::new(None),
				timings,
			}),
			debouncer: Debouncer::new(),
		}
	}

	/// Loads the remote record, falling back to the local cache.
	pub async fn load(&self) -> ProgressSource {
		let (snapshot, source) = match self.shared.api.get_progress(&self.purchase_id).await {
			Ok(Some(snapshot)) => (Some(snapshot), ProgressSource::Remote),
			Ok(None) => self.load_local().await,
			Err(e) => {
				warn!(purchase_id = %self.purchase_id, error = %e, "failed to load remote progress");
				self.load_local().await
			}
		};

		let record = match snapshot {
			Some(s) => ProgressRecord::from_snapshot(self.purchase_id.clone(), s, &self.sequence),
			None => ProgressRecord::new(self.purchase_id.clone()),
		};
		info!(
				course_id = %self.course_id,
				source = ?source,
				completed = record.completed_count(),
				"progress loaded"
		);
		*self.record.lock().await = record;
		source
	}

	async fn load_local(&self) -> (Option<ProgressSnapshot>, ProgressSource) {
		match self.cache.load(&self.course_id).await {
			Ok(Some(snapshot)) => (Some(snapshot), ProgressSource::Local),
			Ok(None) => (None, ProgressSource::Empty),
			Err(e) => {
				warn!(course_id = %self.course_id, error = %e, "failed to read cached progress");
				(None, ProgressSource::Empty)
			}
		}
	}

	/// Flips a task, writes the local cache and resets the remote sync timer.
	///
	/// If the local write fails nothing changes and no sync is scheduled.
	pub async fn toggle(&self, task_id: &str) -> Result<ToggleOutcome, ProgressError> {
		let mut record = self.record.lock().await;
		let mut next = record.clone();
		let outcome = next.toggle(&self.sequence, task_id)?;

		self.cache.store(&self.course_id, &next.snapshot()).await?;
		*record = next;
		let payload = record.payload();
		drop(record);

		debug!(task_id, outcome = ?outcome, "task toggled");

		let shared = Arc::clone(&self.shared);
		self.debouncer.reset(self.shared.timings.debounce, async move {
			let _ = shared.sync(payload).await;
		});
		Ok(outcome)
	}

	/// Sends a pending sync immediately and waits for any sync already
	/// running. Only the pending sync's failure is returned; a running sync
	/// reports through [`ProgressStore::sync_status`].
	pub async fn flush(&self) -> Result<(), LabApiError> {
		self.debouncer.settle().await;
		if !self.debouncer.cancel() {
			return Ok(());
		}
		let payload = self.record.lock().await.payload();
		Arc::clone(&self.shared).sync(payload).await
	}

	pub fn has_pending_sync(&self) -> bool {
		self.debouncer.is_pending()
	}

	pub async fn snapshot(&self) -> ProgressSnapshot {
		self.record.lock().await.snapshot()
	}

	pub async fn is_completed(&self, task_id: &str) -> bool {
		self.record.lock().await.is_completed(task_id)
	}

	pub async fn completion_percent(&self) -> f64 {
		self.record.lock().await.completion_percent(&self.sequence)
	}

	pub fn sequence(&self) -> &TaskSequence {
		&self.sequence
	}

	pub fn sync_status(&self) -> SyncStatus {
		*self.shared.status.borrow()
	}

	pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
		self.shared.status.subscribe()
	}
}

impl Drop for ProgressStore {
	fn drop(&mut self) {
		self.shared.set_revert(None);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::cache::MemoryProgressCache;
	use crate::error::StoreError;
	use crate::testing::MockLabApi;
	use async_trait::async_trait;

	struct BrokenCache;

	#[async_trait]
	impl ProgressCache for BrokenCache {
		async fn load(&self, _: &CourseId) -> Result<Option<ProgressSnapshot>, StoreError> {
			Ok(None)
		}

		async fn store(&self, _: &CourseId, _: &ProgressSnapshot) -> Result<(), StoreError> {
			Err(StoreError::Io(std::io::Error::new(
				std::io::ErrorKind::PermissionDenied,
				"read-only",
			)))
		}
	}

	fn store_with(api: Arc<MockLabApi>, cache: Arc<dyn ProgressCache>) -> ProgressStore {
		ProgressStore::new(
			CourseId::new("c-1"),
			PurchaseId::new("p-1"),
			TaskSequence::new(["t1", "t2", "t3"]),
			api,
			cache,
			ProgressTimings::default(),
		)
	}

	#[tokio::test(start_paused = true)]
	async fn toggles_collapse_into_one_sync() {
		let api = Arc::new(MockLabApi::default());
		let cache = Arc::new(MemoryProgressCache::new());
		let store = store_with(api.clone(), cache.clone());

		store.toggle("t1").await.unwrap();
		tokio::time::sleep(Duration::from_millis(500)).await;
		store.toggle("t2").await.unwrap();
		tokio::time::sleep(Duration::from_millis(500)).await;
		store.toggle("t2").await.unwrap();

		let cached = cache.get(&CourseId::new("c-1")).unwrap();
		assert_eq!(cached.completed_tasks, vec!["t1".to_string()]);
		assert!(api.saved().is_empty());

		tokio::time::sleep(Duration::from_millis(2_100)).await;
		let saved = api.saved();
		assert_eq!(saved.len(), 1);
		assert_eq!(saved[0].purchase_id, PurchaseId::new("p-1"));
		assert_eq!(saved[0].snapshot.completed_tasks, vec!["t1".to_string()]);
		assert_eq!(saved[0].snapshot.current_task_index, 2);
	}

	#[tokio::test(start_paused = true)]
	async fn status_goes_saved_then_idle() {
		let api = Arc::new(MockLabApi::default());
		api.set_latency(Duration::from_millis(100));
		let store = store_with(api.clone(), Arc::new(MemoryProgressCache::new()));

		store.toggle("t1").await.unwrap();
		assert_eq!(store.sync_status(), SyncStatus::Idle);

		tokio::time::sleep(Duration::from_millis(2_050)).await;
		assert_eq!(store.sync_status(), SyncStatus::Saving);

		tokio::time::sleep(Duration::from_millis(100)).await;
		assert_eq!(store.sync_status(), SyncStatus::Saved);

		tokio::time::sleep(Duration::from_millis(2_000)).await;
		assert_eq!(store.sync_status(), SyncStatus::Idle);
	}

	#[tokio::test(start_paused = true)]
	async fn failure_shows_error_for_three_seconds_and_keeps_local() {
		let api = Arc::new(MockLabApi::default());
		api.fail_with(Some("database unavailable"));
		let cache = Arc::new(MemoryProgressCache::new());
		let store = store_with(api.clone(), cache.clone());

		store.toggle("t3").await.unwrap();
		tokio::time::sleep(Duration::from_millis(2_010)).await;
		assert_eq!(store.sync_status(), SyncStatus::Error);

		tokio::time::sleep(Duration::from_millis(2_500)).await;
		assert_eq!(store.sync_status(), SyncStatus::Error);
		tokio::time::sleep(Duration::from_millis(600)).await;
		assert_eq!(store.sync_status(), SyncStatus::Idle);

		assert!(store.is_completed("t3").await);
		let cached = cache.get(&CourseId::new("c-1")).unwrap();
		assert_eq!(cached.completed_tasks, vec!["t3".to_string()]);
	}

	#[tokio::test(start_paused = true)]
	async fn newer_sync_suppresses_old_revert() {
		let api = Arc::new(MockLabApi::default());
		api.set_latency(Duration::from_secs(3));
		let store = store_with(api.clone(), Arc::new(MemoryProgressCache::new()));

		store.toggle("t1").await.unwrap();
		// First sync fires at 2s and is in flight until 5s.
		tokio::time::sleep(Duration::from_millis(2_500)).await;
		store.toggle("t2").await.unwrap();
		// Second sync fires at 4.5s, in flight until 7.5s.
		tokio::time::sleep(Duration::from_millis(2_700)).await;
		assert_eq!(store.sync_status(), SyncStatus::Saving);

		tokio::time::sleep(Duration::from_millis(2_500)).await;
		assert_eq!(store.sync_status(), SyncStatus::Saved);
		assert_eq!(api.saved().len(), 2);
		assert_eq!(api.saved()[1].snapshot.completed_tasks.len(), 2);
	}

	#[tokio::test(start_paused = true)]
	async fn cache_failure_rejects_toggle_and_skips_sync() {
		let api = Arc::new(MockLabApi::default());
		let store = store_with(api.clone(), Arc::new(BrokenCache));

		let err = store.toggle("t1").await.unwrap_err();
		assert!(matches!(err, ProgressError::Store(_)));
		assert!(!store.is_completed("t1").await);
		assert!(!store.has_pending_sync());

		tokio::time::sleep(Duration::from_secs(5)).await;
		assert!(api.saved().is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn unknown_task_is_rejected() {
		let api = Arc::new(MockLabApi::default());
		let store = store_with(api, Arc::new(MemoryProgressCache::new()));
		let err = store.toggle("t9").await.unwrap_err();
		assert!(matches!(err, ProgressError::Model(_)));
		assert!(!store.has_pending_sync());
	}

	#[tokio::test(start_paused = true)]
	async fn flush_sends_immediately() {
		let api = Arc::new(MockLabApi::default());
		let store = store_with(api.clone(), Arc::new(MemoryProgressCache::new()));

		store.flush().await.unwrap();
		assert!(api.saved().is_empty());

		store.toggle("t1").await.unwrap();
		store.flush().await.unwrap();
		assert_eq!(api.saved().len(), 1);

		tokio::time::sleep(Duration::from_secs(5)).await;
		assert_eq!(api.saved().len(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn flush_waits_for_sync_already_running() {
		let api = Arc::new(MockLabApi::default());
		api.set_latency(Duration::from_secs(1));
		let store = store_with(api.clone(), Arc::new(MemoryProgressCache::new()));

		store.toggle("t1").await.unwrap();
		tokio::time::sleep(Duration::from_millis(2_100)).await;
		assert!(!store.has_pending_sync());
		assert_eq!(store.sync_status(), SyncStatus::Saving);

		store.flush().await.unwrap();
		drop(store);

		tokio::time::sleep(Duration::from_secs(5)).await;
		let saved = api.saved();
		assert_eq!(saved.len(), 1);
		assert_eq!(saved[0].snapshot.completed_tasks, vec!["t1".to_string()]);
	}

	#[tokio::test(start_paused = true)]
	async fn drop_cancels_pending_sync() {
		let api = Arc::new(MockLabApi::default());
		let store = store_with(api.clone(), Arc::new(MemoryProgressCache::new()));
		store.toggle("t1").await.unwrap();
		drop(store);

		tokio::time::sleep(Duration::from_secs(5)).await;
		assert!(api.saved().is_empty());
	}

	#[tokio::test]
	async fn load_prefers_remote_then_local() {
		let api = Arc::new(MockLabApi::default());
		let cache = Arc::new(MemoryProgressCache::new());
		cache
			.store(
				&CourseId::new("c-1"),
				&ProgressSnapshot {
					completed_tasks: vec!["t1".into()],
					current_task_index: 1,
				},
			)
			.await
			.unwrap();

		api.set_remote_progress(Some(ProgressSnapshot {
			completed_tasks: vec!["t1".into(), "t2".into()],
			current_task_index: 2,
		}));
		let store = store_with(api.clone(), cache.clone());
		assert_eq!(store.load().await, ProgressSource::Remote);
		assert_eq!(store.snapshot().await.completed_tasks.len(), 2);

		api.set_remote_progress(None);
		assert_eq!(store.load().await, ProgressSource::Local);
		assert_eq!(store.snapshot().await.current_task_index, 1);

		api.fail_with(Some("offline"));
		assert_eq!(store.load().await, ProgressSource::Local);

		let empty = store_with(api, Arc::new(MemoryProgressCache::new()));
		assert_eq!(empty.load().await, ProgressSource::Empty);
		assert_eq!(empty.completion_percent().await, 0.0);
	}
}
