// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use hexalabs_lab_core::{CourseId, LabInstruction};
use tracing::debug;

use crate::api::InstructionCatalog;
use crate::error::StoreError;

/// Instructions held in memory, typically read from a JSON file containing
/// an array of labs.
#[derive(Debug, Default, Clone)]
pub struct StaticCatalog {
	labs: HashMap<CourseId, LabInstruction>,
}

impl StaticCatalog {
	pub fn new(labs: impl IntoIterator<Item = LabInstruction>) -> Self {
		Self {
			labs: labs
				.into_iter()
				.map(|lab| (lab.course_id.clone(), lab))
				.collect(),
		}
	}

	pub async fn from_json_file(path: &Path) -> Result<Self, StoreError> {
		let contents = tokio::fs::read_to_string(path).await?;
		let labs: Vec<LabInstruction> = serde_json::from_str(&contents)?;
		debug!(path = %path.display(), labs = labs.len(), "loaded instruction catalog");
		Ok(Self::new(labs))
	}

	pub fn len(&self) -> usize {
		self.labs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.labs.is_empty()
	}
}

#[async_trait]
impl InstructionCatalog for StaticCatalog {
	async fn instructions(&self, course_id: &CourseId) -> Option<LabInstruction> {
		self.labs.get(course_id).cloned()
	}
}
