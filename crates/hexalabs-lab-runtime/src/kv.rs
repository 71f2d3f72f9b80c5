// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Session-scoped key-value storage and the refresh flag built on it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hexalabs_lab_core::LabId;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
	async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

	/// Stores `value`. An entry with `expires_at` in the past reads as absent.
	async fn set(
		&self,
		key: &str,
		value: &str,
		expires_at: Option<DateTime<Utc>>,
	) -> Result<(), StoreError>;

	async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
	value: String,
	#[serde(default)]
	expires_at: Option<DateTime<Utc>>,
}

impl Entry {
	fn is_live(&self, now: DateTime<Utc>) -> bool {
		self.expires_at.map_or(true, |at| now < at)
	}
}

/// Lives as long as the process.
pub struct MemoryKeyValueStore {
	entries: Mutex<HashMap<String, Entry>>,
	clock: Arc<dyn Clock>,
}

impl Default for MemoryKeyValueStore {
	fn default() -> Self {
		Self::with_clock(Arc::new(SystemClock))
	}
}

impl MemoryKeyValueStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
		Self {
			entries: Mutex::new(HashMap::new()),
			clock,
		}
	}
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
	async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
		let now = self.clock.now();
		let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
		Ok(entries
			.get(key)
			.filter(|e| e.is_live(now))
			.map(|e| e.value.clone()))
	}

	async fn set(
		&self,
		key: &str,
		value: &str,
		expires_at: Option<DateTime<Utc>>,
	) -> Result<(), StoreError> {
		let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
		entries.insert(
			key.to_string(),
			Entry {
				value: value.to_string(),
				expires_at,
			},
		);
		Ok(())
	}

	async fn remove(&self, key: &str) -> Result<(), StoreError> {
		let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
		entries.remove(key);
		Ok(())
	}
}

/// A JSON object on disk. Survives CLI invocations; entries expire with the
/// session they belong to.
pub struct FileKeyValueStore {
	path: PathBuf,
	clock: Arc<dyn Clock>,
	io: tokio::sync::Mutex<()>,
}

impl FileKeyValueStore {
	pub fn new(path: PathBuf) -> Self {
		Self::with_clock(path, Arc::new(SystemClock))
	}

	pub fn with_clock(path: PathBuf, clock: Arc<dyn Clock>) -> Self {
		Self {
			path,
			clock,
			io: tokio::sync::Mutex::new(()),
		}
	}

	pub fn from_xdg() -> Result<Self, StoreError> {
		let base = dirs::state_dir()
			.or_else(dirs::data_local_dir)
			.ok_or(StoreError::NoStateDir)?;
		Ok(Self::new(base.join("hexalabs").join("session.json")))
	}

	async fn read_all(&self) -> Result<HashMap<String, Entry>, StoreError> {
		if !self.path.exists() {
			return Ok(HashMap::new());
		}
		let contents = tokio::fs::read_to_string(&self.path).await?;
		if contents.trim().is_empty() {
			return Ok(HashMap::new());
		}
		Ok(serde_json::from_str(&contents)?)
	}

	async fn write_all(&self, entries: &HashMap<String, Entry>) -> Result<(), StoreError> {
		if let Some(parent) = self.path.parent() {
			tokio::fs::create_dir_all(parent).await?;
		}
		let tmp_path = self.path.with_extension("json.tmp");
		let json = serde_json::to_string_pretty(entries)?;
		tokio::fs::write(&tmp_path, &json).await?;
		tokio::fs::rename(&tmp_path, &self.path).await?;
		debug!(path = %self.path.display(), entries = entries.len(), "wrote session store");
		Ok(())
	}
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
	async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
		let _io = self.io.lock().await;
		let now = self.clock.now();
		let entries = self.read_all().await?;
		Ok(entries
			.get(key)
			.filter(|e| e.is_live(now))
			.map(|e| e.value.clone()))
	}

	async fn set(
		&self,
		key: &str,
		value: &str,
		expires_at: Option<DateTime<Utc>>,
	) -> Result<(), StoreError> {
		let _io = self.io.lock().await;
		let now = self.clock.now();
		let mut entries = self.read_all().await?;
		entries.retain(|_, e| e.is_live(now));
		entries.insert(
			key.to_string(),
			Entry {
				value: value.to_string(),
				expires_at,
			},
		);
		self.write_all(&entries).await
	}

	async fn remove(&self, key: &str) -> Result<(), StoreError> {
		let _io = self.io.lock().await;
		let mut entries = self.read_all().await?;
		if entries.remove(key).is_some() {
			self.write_all(&entries).await?;
		}
		Ok(())
	}
}

/// "The user already reloaded the console for this session."
#[derive(Clone)]
pub struct RefreshFlags {
	store: Arc<dyn KeyValueStore>,
}

impl RefreshFlags {
	pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
		Self { store }
	}

	pub fn key(lab_id: &LabId) -> String {
		format!("lab-refreshed-{lab_id}")
	}

	/// A store failure reads as "not set", which shows the overlay again.
	pub async fn is_set(&self, lab_id: &LabId) -> bool {
		match self.store.get(&Self::key(lab_id)).await {
			Ok(value) => value.as_deref() == Some("true"),
			Err(e) => {
				warn!(lab_id = %lab_id, error = %e, "failed to read refresh flag");
				false
			}
		}
	}

	pub async fn mark(
		&self,
		lab_id: &LabId,
		expires_at: Option<DateTime<Utc>>,
	) -> Result<(), StoreError> {
		self
			.store
			.set(&Self::key(lab_id), "true", expires_at)
			.await
	}
}
