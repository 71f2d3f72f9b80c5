// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shape of the instructional content attached to a lab.
//!
//! Only the structure is modelled here. The catalog itself is static data
//! supplied by the embedding application.

use serde::{Deserialize, Serialize};

use crate::ids::CourseId;
use crate::progress::TaskSequence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
	Beginner,
	Intermediate,
	Advanced,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabInstruction {
	pub id: String,
	pub course_id: CourseId,
	pub title: String,
	#[serde(default)]
	pub description: String,
	#[serde(default)]
	pub estimated_minutes: u32,
	pub difficulty: Difficulty,
	#[serde(default)]
	pub objectives: Vec<String>,
	#[serde(default)]
	pub prerequisites: Vec<String>,
	pub tasks: Vec<LabTask>,
}

impl LabInstruction {
	/// Task ids ordered by `order`, ties broken by position in the file.
	pub fn task_sequence(&self) -> TaskSequence {
		let mut tasks: Vec<&LabTask> = self.tasks.iter().collect();
		tasks.sort_by_key(|t| t.order);
		TaskSequence::new(tasks.into_iter().map(|t| t.id.clone()))
	}

	pub fn task(&self, task_id: &str) -> Option<&LabTask> {
		self.tasks.iter().find(|t| t.id == task_id)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabTask {
	pub id: String,
	pub order: u32,
	pub title: String,
	#[serde(default)]
	pub description: String,
	#[serde(default)]
	pub estimated_minutes: u32,
	#[serde(default)]
	pub steps: Vec<InstructionStep>,
	#[serde(default)]
	pub content: Vec<ContentBlock>,
	#[serde(default)]
	pub verification: Option<Verification>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionStep {
	pub order: u32,
	pub text: String,
	#[serde(default)]
	pub code: Option<CodeSnippet>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeLevel {
	Note,
	Warning,
	Tip,
	Important,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeSnippet {
	pub language: String,
	pub code: String,
	#[serde(default)]
	pub caption: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
	Documentation,
	Video,
	Article,
	Tutorial,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TroubleshootingEntry {
	pub problem: String,
	pub solution: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentBlock {
	Knowledge {
		level: KnowledgeLevel,
		title: Option<String>,
		body: String,
	},
	Code(CodeSnippet),
	Resource {
		resource: ResourceKind,
		title: String,
		url: String,
	},
	Hint {
		body: String,
	},
	Troubleshooting {
		entries: Vec<TroubleshootingEntry>,
	},
	Solution {
		body: String,
		#[serde(default)]
		code: Option<CodeSnippet>,
	},
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
	pub question: String,
	pub options: Vec<String>,
	pub correct_answer: usize,
	#[serde(default)]
	pub explanation: Option<String>,
}

impl Quiz {
	pub fn is_correct(&self, answer: usize) -> bool {
		answer == self.correct_answer && answer < self.options.len()
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Verification {
	Manual {
		#[serde(default)]
		checklist: Vec<String>,
	},
	Automated {
		script: String,
		expected_output: String,
	},
	Quiz(Quiz),
}
