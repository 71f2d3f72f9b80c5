// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Durable local copy of task progress, keyed by course.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use hexalabs_lab_core::{CourseId, ProgressSnapshot};
use tracing::{debug, info};

use crate::error::StoreError;

#[async_trait]
pub trait ProgressCache: Send + Sync {
	async fn load(&self, course_id: &CourseId) -> Result<Option<ProgressSnapshot>, StoreError>;
	async fn store(&self, course_id: &CourseId, snapshot: &ProgressSnapshot)
		-> Result<(), StoreError>;
}

pub fn cache_key(course_id: &CourseId) -> String {
	let safe: String = course_id
		.as_str()
		.chars()
		.map(|c| {
			if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
				c
			} else {
				'_'
			}
		})
		.collect();
	format!("lab-progress-{safe}")
}

pub struct FileProgressCache {
	dir: PathBuf,
}

impl FileProgressCache {
	pub fn new(dir: PathBuf) -> Self {
		Self { dir }
	}

	pub fn from_xdg() -> Result<Self, StoreError> {
		let data_dir = dirs::data_dir().ok_or(StoreError::NoStateDir)?;
		let dir = data_dir.join("hexalabs").join("progress");
		std::fs::create_dir_all(&dir)?;

		info!(progress_dir = %dir.display(), "initialized local progress cache");

		Ok(Self::new(dir))
	}

	fn path(&self, course_id: &CourseId) -> PathBuf {
		self.dir.join(format!("{}.json", cache_key(course_id)))
	}
}

#[async_trait]
impl ProgressCache for FileProgressCache {
	async fn load(&self, course_id: &CourseId) -> Result<Option<ProgressSnapshot>, StoreError> {
		let path = self.path(course_id);
		if !path.exists() {
			debug!(course_id = %course_id, path = %path.display(), "no cached progress");
			return Ok(None);
		}

		let contents = tokio::fs::read_to_string(&path).await?;
		let snapshot: ProgressSnapshot = serde_json::from_str(&contents)?;
		debug!(
				course_id = %course_id,
				completed = snapshot.completed_tasks.len(),
				"loaded cached progress"
		);
		Ok(Some(snapshot))
	}

	async fn store(
		&self,
		course_id: &CourseId,
		snapshot: &ProgressSnapshot,
	) -> Result<(), StoreError> {
		tokio::fs::create_dir_all(&self.dir).await?;

		let path = self.path(course_id);
		let tmp_path = self
			.dir
			.join(format!("{}.json.tmp", cache_key(course_id)));
		let json = serde_json::to_string_pretty(snapshot)?;

		tokio::fs::write(&tmp_path, &json).await?;
		tokio::fs::rename(&tmp_path, &path).await?;

		debug!(
				course_id = %course_id,
				completed = snapshot.completed_tasks.len(),
				current_task_index = snapshot.current_task_index,
				"saved progress to disk"
		);
		Ok(())
	}
}

#[derive(Default)]
pub struct MemoryProgressCache {
	entries: Mutex<HashMap<CourseId, ProgressSnapshot>>,
}

impl MemoryProgressCache {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, course_id: &CourseId) -> Option<ProgressSnapshot> {
		self
			.entries
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.get(course_id)
			.cloned()
	}
}

#[async_trait]
impl ProgressCache for MemoryProgressCache {
	async fn load(&self, course_id: &CourseId) -> Result<Option<ProgressSnapshot>, StoreError> {
		Ok(self.get(course_id))
	}

	async fn store(
		&self,
		course_id: &CourseId,
		snapshot: &ProgressSnapshot,
	) -> Result<(), StoreError> {
		self
			.entries
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.insert(course_id.clone(), snapshot.clone());
		Ok(())
	}
}
