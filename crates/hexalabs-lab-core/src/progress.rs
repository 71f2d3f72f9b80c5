// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Per-task completion state and the toggle algorithm.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::LabModelError;
use crate::ids::PurchaseId;

/// Remote sync indicator shown next to the task list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
	#[default]
	Idle,
	Saving,
	Saved,
	Error,
}

/// The fixed ordering of task ids for one lab.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskSequence {
	ids: Vec<String>,
}

impl TaskSequence {
	pub fn new<I, S>(ids: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			ids: ids.into_iter().map(Into::into).collect(),
		}
	}

	pub fn position(&self, task_id: &str) -> Option<usize> {
		self.ids.iter().position(|id| id == task_id)
	}

	pub fn get(&self, index: usize) -> Option<&str> {
		self.ids.get(index).map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.ids.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ids.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.ids.iter().map(String::as_str)
	}
}

/// Wire and cache shape of a progress record.
///
/// The GET endpoint additionally returns `lastUpdatedAt`, which is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
	#[serde(default)]
	pub completed_tasks: Vec<String>,
	#[serde(default)]
	pub current_task_index: usize,
}

/// Body of `POST api/labs/progress`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPayload {
	pub purchase_id: PurchaseId,
	#[serde(flatten)]
	pub snapshot: ProgressSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
	Completed,
	Reopened,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRecord {
	purchase_id: PurchaseId,
	completed: BTreeSet<String>,
	current_task_index: usize,
}

impl ProgressRecord {
	pub fn new(purchase_id: PurchaseId) -> Self {
		Self {
			purchase_id,
			completed: BTreeSet::new(),
			current_task_index: 0,
		}
	}

	/// Rebuilds a record from a stored snapshot. Duplicate ids collapse and the
	/// index is clamped into the sequence. Ids that are no longer part of the
	/// sequence are kept so a content update never loses recorded work.
	pub fn from_snapshot(
		purchase_id: PurchaseId,
		snapshot: ProgressSnapshot,
		sequence: &TaskSequence,
	) -> Self {
		let max_index = sequence.len().saturating_sub(1);
		Self {
			purchase_id,
			completed: snapshot.completed_tasks.into_iter().collect(),
			current_task_index: snapshot.current_task_index.min(max_index),
		}
	}

	pub fn purchase_id(&self) -> &PurchaseId {
		&self.purchase_id
	}

	pub fn current_task_index(&self) -> usize {
		self.current_task_index
	}

	pub fn is_completed(&self, task_id: &str) -> bool {
		self.completed.contains(task_id)
	}

	pub fn completed(&self) -> impl Iterator<Item = &str> {
		self.completed.iter().map(String::as_str)
	}

	pub fn completed_count(&self) -> usize {
		self.completed.len()
	}

	/// Percentage of the sequence that is complete, in `0.0..=100.0`.
	pub fn completion_percent(&self, sequence: &TaskSequence) -> f64 {
		if sequence.is_empty() {
			return 0.0;
		}
		let done = sequence.iter().filter(|id| self.is_completed(id)).count();
		done as f64 / sequence.len() as f64 * 100.0
	}

	/// Flips completion of `task_id`.
	///
	/// Newly completing a task moves the current index to the next incomplete
	/// task after it; if every later task is done the index stays put.
	pub fn toggle(
		&mut self,
		sequence: &TaskSequence,
		task_id: &str,
	) -> Result<ToggleOutcome, LabModelError> {
		let position = sequence
			.position(task_id)
			.ok_or_else(|| LabModelError::UnknownTask(task_id.to_string()))?;

		if self.completed.remove(task_id) {
			return Ok(ToggleOutcome::Reopened);
		}

		self.completed.insert(task_id.to_string());
		let next = sequence
			.iter()
			.enumerate()
			.skip(position + 1)
			.find(|(_, id)| !self.completed.contains(*id))
			.map(|(index, _)| index);
		if let Some(index) = next {
			self.current_task_index = index;
		}
		Ok(ToggleOutcome::Completed)
	}

	pub fn snapshot(&self) -> ProgressSnapshot {
		ProgressSnapshot {
			completed_tasks: self.completed.iter().cloned().collect(),
			current_task_index: self.current_task_index,
		}
	}

	pub fn payload(&self) -> ProgressPayload {
		ProgressPayload {
			purchase_id: self.purchase_id.clone(),
			snapshot: self.snapshot(),
		}
	}
}
