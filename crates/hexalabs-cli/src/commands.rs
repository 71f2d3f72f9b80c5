// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! One-shot subcommands and the printing they share with `connect`.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::ValueEnum;
use hexalabs_lab_core::{
	CourseId, ExternalAccount, LabId, LabInstruction, PurchaseId, SyncStatus, ToggleOutcome,
};
use hexalabs_lab_runtime::{
	AccountField, CredentialProvisioner, LabApiError, LifecycleOutcome, ProgressStore,
};
use tracing::{info, warn};

use crate::app::{load_instruction, App};
use crate::terminal::{SystemClipboard, TerminalNavigator};

/// Account fields that can be copied to the clipboard.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldArg {
	#[value(alias = "user")]
	Username,
	#[value(alias = "pass")]
	Password,
	#[value(alias = "rg")]
	ResourceGroup,
	#[value(alias = "portal")]
	PortalUrl,
}

impl From<FieldArg> for AccountField {
	fn from(field: FieldArg) -> Self {
		match field {
			FieldArg::Username => AccountField::Username,
			FieldArg::Password => AccountField::Password,
			FieldArg::ResourceGroup => AccountField::ResourceGroup,
			FieldArg::PortalUrl => AccountField::PortalUrl,
		}
	}
}

fn describe(outcome: LifecycleOutcome, done: &str) {
	match outcome {
		LifecycleOutcome::Completed => println!("{done}"),
		LifecycleOutcome::Cancelled => println!("Cancelled."),
	}
}

pub async fn status(app: &App, lab_id: &LabId) -> Result<()> {
	match app.api.status(lab_id).await {
		Ok(status) => {
			println!("{lab_id}: {status}");
			Ok(())
		}
		Err(LabApiError::NotFound) => {
			println!("{lab_id}: not found (deleted or never launched)");
			Ok(())
		}
		Err(e) => Err(e).context("failed to fetch lab status"),
	}
}

pub async fn restart(app: &App, course_id: &CourseId) -> Result<()> {
	let (navigator, _events) = TerminalNavigator::channel();
	let lifecycle = app.lifecycle(Arc::new(navigator));
	let outcome = lifecycle
		.restart(course_id)
		.await
		.context("restart failed")?;
	describe(outcome, "Restart requested.");
	Ok(())
}

/// Returns once the background teardown has finished, since the process is
/// about to exit.
pub async fn close(app: &App, purchase_id: &PurchaseId) -> Result<()> {
	let (navigator, _events) = TerminalNavigator::channel();
	let lifecycle = app.lifecycle(Arc::new(navigator));
	let outcome = lifecycle.close(purchase_id).await.context("close failed")?;
	if outcome == LifecycleOutcome::Completed {
		println!("Closing lab session...");
		lifecycle.settle().await;
	}
	describe(outcome, "Close sent. A snapshot is taken before the VM stops.");
	Ok(())
}

pub async fn destroy(app: &App, purchase_id: &PurchaseId) -> Result<()> {
	let (navigator, _events) = TerminalNavigator::channel();
	let lifecycle = app.lifecycle(Arc::new(navigator));
	let outcome = lifecycle
		.destroy(purchase_id)
		.await
		.context("destroy failed")?;
	describe(outcome, "Lab session destroyed.");
	Ok(())
}

pub fn print_tasks(instruction: &LabInstruction, completed: impl Fn(&str) -> bool, percent: f64) {
	println!("{} ({percent:.0}% complete)", instruction.title);
	for id in instruction.task_sequence().iter() {
		let title = instruction
			.task(id)
			.map(|t| t.title.as_str())
			.unwrap_or(id);
		let mark = if completed(id) { "x" } else { " " };
		println!("  [{mark}] {id}  {title}");
	}
}

pub async fn print_progress(instruction: &LabInstruction, store: &ProgressStore) {
	let snapshot = store.snapshot().await;
	let percent = store.completion_percent().await;
	print_tasks(
		instruction,
		|id| snapshot.completed_tasks.iter().any(|t| t == id),
		percent,
	);
}

pub async fn toggle_task(store: &ProgressStore, task_id: &str) -> Result<()> {
	match store.toggle(task_id).await? {
		ToggleOutcome::Completed => println!("Completed {task_id}"),
		ToggleOutcome::Reopened => println!("Reopened {task_id}"),
	}
	Ok(())
}

/// Sends any pending sync and waits for one already running.
pub async fn flush_progress(store: &ProgressStore) {
	if store.has_pending_sync() {
		println!("Saving progress...");
	}
	match store.flush().await {
		Err(e) => {
			warn!(error = %e, "progress sync failed");
			eprintln!("warning: progress saved locally but not synced: {e}");
		}
		Ok(()) if store.sync_status() == SyncStatus::Error => {
			warn!("progress sync failed");
			eprintln!("warning: progress saved locally but not synced");
		}
		Ok(()) => {}
	}
}

pub async fn progress(
	app: &App,
	course_id: &CourseId,
	purchase_id: &PurchaseId,
	catalog: &Path,
	toggles: &[String],
) -> Result<()> {
	let instruction = load_instruction(catalog, course_id).await?;
	let store = ProgressStore::new(
		course_id.clone(),
		purchase_id.clone(),
		instruction.task_sequence(),
		Arc::clone(&app.api),
		app.progress_cache(),
		app.runtime.progress,
	);
	let source = store.load().await;
	info!(course_id = %course_id, ?source, "progress loaded");

	for task_id in toggles {
		toggle_task(&store, task_id)
			.await
			.with_context(|| format!("failed to toggle {task_id}"))?;
	}

	flush_progress(&store).await;
	print_progress(&instruction, &store).await;
	Ok(())
}

pub fn print_account(account: &ExternalAccount, show_password: bool) {
	println!("Username:       {}", account.username);
	if show_password {
		println!("Password:       {}", account.password.expose());
	} else {
		println!("Password:       {} (use --show-password or copy it)", account.password);
	}
	println!("Resource group: {}", account.resource_group);
	println!("Portal:         {}", account.portal_url);
}

pub async fn copy_field(provisioner: &CredentialProvisioner, field: FieldArg) -> Result<()> {
	provisioner
		.copy(field.into(), &SystemClipboard)
		.await
		.context("copy failed")?;
	println!("Copied {} to the clipboard.", field_name(field));
	Ok(())
}

fn field_name(field: FieldArg) -> &'static str {
	match field {
		FieldArg::Username => "username",
		FieldArg::Password => "password",
		FieldArg::ResourceGroup => "resource group",
		FieldArg::PortalUrl => "portal URL",
	}
}

pub async fn account(
	app: &App,
	course_id: &CourseId,
	copy: Option<FieldArg>,
	show_password: bool,
) -> Result<()> {
	let provisioner = CredentialProvisioner::new(course_id.clone(), Arc::clone(&app.api), None);
	println!("Creating cloud account...");
	let account = provisioner
		.provision()
		.await
		.context("failed to create cloud account")?;
	print_account(&account, show_password);

	if let Some(field) = copy {
		copy_field(&provisioner, field).await?;
	}
	Ok(())
}
