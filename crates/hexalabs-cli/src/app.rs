// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared wiring for every subcommand.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::TimeDelta;
use hexalabs_cli_config::LabConfig;
use hexalabs_lab_core::{CourseId, LabInstruction};
use hexalabs_lab_runtime::{
	Collaborators, FileKeyValueStore, FileProgressCache, HttpLabApi, InstructionCatalog,
	KeyValueStore, LabApi, LifecycleController, Navigator, PollerConfig, ProgressCache,
	ProgressTimings, RuntimeConfig, StaticCatalog, SystemClock,
};
use tracing::info;

use crate::terminal::{Prompt, PromptConfirmer, TerminalNotifier};

pub struct App {
	pub api: Arc<dyn LabApi>,
	pub prompt: Arc<Prompt>,
	pub runtime: RuntimeConfig,
	session_store: Arc<dyn KeyValueStore>,
	progress_cache: Arc<dyn ProgressCache>,
	assume_yes: bool,
}

impl App {
	pub fn from_config(config: &LabConfig, assume_yes: bool) -> Result<Self> {
		let mut api = HttpLabApi::connect(config.server.url.clone(), None)
			.context("failed to build HTTP client")?;
		if let Some(token) = config.server.auth_token.clone() {
			api = api.with_auth_token(token);
		}

		info!(
			server = %config.server.url,
			gateway = %config.gateway.url,
			"lab backend configured"
		);

		Ok(Self {
			api: Arc::new(api),
			prompt: Arc::new(Prompt::stdin()),
			runtime: runtime_config(config)?,
			session_store: Arc::new(FileKeyValueStore::new(config.paths.session_file.clone())),
			progress_cache: Arc::new(FileProgressCache::new(config.paths.progress_dir.clone())),
			assume_yes,
		})
	}

	pub fn progress_cache(&self) -> Arc<dyn ProgressCache> {
		Arc::clone(&self.progress_cache)
	}

	pub fn collaborators(&self, navigator: Arc<dyn Navigator>) -> Collaborators {
		Collaborators {
			api: Arc::clone(&self.api),
			navigator,
			confirmer: Arc::new(PromptConfirmer::new(
				Arc::clone(&self.prompt),
				self.assume_yes,
			)),
			notifier: Arc::new(TerminalNotifier),
			session_store: Arc::clone(&self.session_store),
			progress_cache: Arc::clone(&self.progress_cache),
			clock: Arc::new(SystemClock),
		}
	}

	pub fn lifecycle(&self, navigator: Arc<dyn Navigator>) -> LifecycleController {
		let c = self.collaborators(navigator);
		LifecycleController::new(c.api, c.navigator, c.confirmer, c.notifier)
	}
}

pub fn runtime_config(config: &LabConfig) -> Result<RuntimeConfig> {
	let warning_threshold = TimeDelta::from_std(config.timer.warning_threshold)
		.context("timer.warning_threshold is out of range")?;
	Ok(RuntimeConfig {
		gateway: config.gateway.url.clone(),
		poller: PollerConfig {
			interval: config.polling.interval,
			max_attempts: config.polling.max_attempts,
		},
		progress: ProgressTimings {
			debounce: config.progress.debounce,
			saved_reset: config.progress.saved_reset,
			error_reset: config.progress.error_reset,
		},
		warning_threshold,
	})
}

/// Reads the catalog file and picks the course's instructions.
pub async fn load_instruction(path: &Path, course_id: &CourseId) -> Result<LabInstruction> {
	let catalog = StaticCatalog::from_json_file(path)
		.await
		.with_context(|| format!("failed to read catalog {}", path.display()))?;
	catalog
		.instructions(course_id)
		.await
		.with_context(|| format!("course {course_id} is not in {}", path.display()))
}
