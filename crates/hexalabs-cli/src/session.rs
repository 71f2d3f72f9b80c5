// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! `hexalabs connect`: launch a lab, wait for its console and drive it from
//! a small command prompt.
//!
//! The controller asks the host to refresh after a restart and to reload
//! after the one-time gateway refresh. Both re-read the session's status and
//! console credentials and start a fresh runtime; neither launches again,
//! because every launch counts against the purchase.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use hexalabs_lab_core::{ConsoleEmbed, Countdown, CourseId, LabInstruction, LabSession, PurchaseId};
use hexalabs_lab_runtime::{ConsoleView, LabApiError, LabRuntime, Navigator};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::app::{load_instruction, App};
use crate::commands::{self, FieldArg};
use crate::terminal::{NavEvent, TerminalNavigator};

pub struct ConnectArgs {
	pub course_id: CourseId,
	pub purchase_id: PurchaseId,
	pub catalog: Option<PathBuf>,
	pub open: bool,
}

/// A line typed at the session prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
	Help,
	Status,
	Open,
	Tasks,
	Toggle(String),
	Account,
	Copy(FieldArg),
	Restart,
	Close,
	Destroy,
	Quit,
}

impl SessionCommand {
	/// `Ok(None)` for a blank line.
	pub fn parse(line: &str) -> Result<Option<Self>, String> {
		let mut words = line.split_whitespace();
		let Some(verb) = words.next() else {
			return Ok(None);
		};
		let arg = words.next();
		let command = match (verb.to_ascii_lowercase().as_str(), arg) {
			("help" | "?", _) => Self::Help,
			("status", _) => Self::Status,
			("open", _) => Self::Open,
			("tasks", _) => Self::Tasks,
			("done" | "toggle", Some(task)) => Self::Toggle(task.to_string()),
			("done" | "toggle", None) => return Err(format!("usage: {verb} <task-id>")),
			("account", _) => Self::Account,
			("copy", Some(field)) => Self::Copy(
				FieldArg::from_str(field, true).map_err(|_| format!("unknown field '{field}'"))?,
			),
			("copy", None) => return Err("usage: copy <username|password|rg|portal>".into()),
			("restart", _) => Self::Restart,
			("close", _) => Self::Close,
			("destroy", _) => Self::Destroy,
			("quit" | "exit", _) => Self::Quit,
			(other, _) => return Err(format!("unknown command '{other}', try 'help'")),
		};
		Ok(Some(command))
	}
}

const HELP: &str = "\
Commands:
  status              session state and remaining time
  open                open the console in a browser
  tasks               list lab tasks
  done <task-id>      mark a task complete (again to reopen)
  account             create or show cloud account credentials
  copy <field>        copy username, password, rg or portal
  restart             restart the VM
  close               snapshot and stop the VM
  destroy             delete the lab and all its resources
  quit                leave without closing the lab";

enum Next {
	Quit,
	Reload,
}

pub async fn connect(app: &App, args: ConnectArgs) -> Result<()> {
	let instruction = match &args.catalog {
		Some(path) => Some(load_instruction(path, &args.course_id).await?),
		None => None,
	};

	let mut session = launch(app, &args).await?;
	let (navigator, mut nav) = TerminalNavigator::channel();
	let navigator: Arc<dyn Navigator> = Arc::new(navigator);

	loop {
		let mut runtime = LabRuntime::start(
			session.clone(),
			instruction.as_ref().map(LabInstruction::task_sequence),
			&app.runtime,
			app.collaborators(Arc::clone(&navigator)),
		);

		let next = drive(app, &mut runtime, instruction.as_ref(), &mut nav, args.open).await;
		shut_down(&runtime).await;

		match next? {
			Next::Quit => return Ok(()),
			Next::Reload => session = reread(app, session).await?,
		}
	}
}

async fn launch(app: &App, args: &ConnectArgs) -> Result<LabSession> {
	println!("Launching lab {}...", args.course_id);
	let session = match app.api.launch(&args.course_id, &args.purchase_id).await {
		Ok(session) => session,
		Err(LabApiError::LaunchDenied {
			message,
			expired,
			limit_reached,
		}) => {
			warn!(expired, limit_reached, "launch denied");
			bail!("{message}");
		}
		Err(e) => return Err(e).context("failed to launch lab"),
	};

	info!(
		lab_id = %session.id,
		status = %session.status,
		launch_count = session.launch_count,
		"lab launched"
	);
	println!(
		"Session {} ({} launches left), expires {}",
		session.id,
		session.remaining_launches(),
		session.expires_at.format("%Y-%m-%d %H:%M UTC")
	);
	Ok(session)
}

async fn reread(app: &App, session: LabSession) -> Result<LabSession> {
	let status = app
		.api
		.status(&session.id)
		.await
		.context("lab session is no longer available")?;
	let console = app
		.api
		.console_credentials(&session.course_id)
		.await
		.context("failed to refresh console credentials")?;
	debug!(lab_id = %session.id, %status, "session reloaded");
	Ok(LabSession {
		status,
		console,
		..session
	})
}

fn show_console(embed: &ConsoleEmbed, open: bool) {
	let url = embed.expose_url();
	println!(
		"Console ready: {}{}",
		url.origin().ascii_serialization(),
		url.path()
	);
	if open {
		open_in_browser(embed);
	} else {
		println!("Type 'open' to launch it in your browser.");
	}
}

fn open_in_browser(embed: &ConsoleEmbed) {
	if let Err(e) = webbrowser::open(embed.expose_url().as_str()) {
		warn!(error = %e, "failed to open browser");
		eprintln!("warning: could not open a browser: {e}");
	}
}

async fn drive(
	app: &App,
	runtime: &mut LabRuntime,
	instruction: Option<&LabInstruction>,
	nav: &mut mpsc::UnboundedReceiver<NavEvent>,
	open: bool,
) -> Result<Next> {
	if let Some(progress) = runtime.progress() {
		let source = progress.load().await;
		debug!(?source, "progress loaded");
	}

	println!("Waiting for the lab console...");
	let view = tokio::select! {
		view = runtime.wait_for_console() => view,
		_ = tokio::signal::ctrl_c() => return Ok(Next::Quit),
	};

	let embed = match view {
		ConsoleView::Loading { status, message } => {
			println!("{message}: the lab is {status} and its console did not become available.");
			return Ok(Next::Quit);
		}
		ConsoleView::Console { embed } => {
			show_console(&embed, open);
			embed
		}
		ConsoleView::ConsoleWithRefreshOverlay { embed } => {
			show_console(&embed, open);
			println!("The console needs one reload to finish connecting. Press Enter to reload.");
			if app.prompt.read_line().await?.is_none() {
				return Ok(Next::Quit);
			}
			runtime
				.gate()
				.acknowledge_refresh(runtime.session())
				.await
				.context("failed to record console refresh")?;
			embed
		}
	};

	println!("{HELP}");
	let mut countdown = runtime.timers().subscribe_countdown();
	loop {
		tokio::select! {
			biased;
			event = nav.recv() => match event {
				Some(NavEvent::Navigate(route)) => {
					debug!(route = route.path(), "leaving session");
					return Ok(Next::Quit);
				}
				Some(NavEvent::Refresh | NavEvent::Reload) => return Ok(Next::Reload),
				None => return Ok(Next::Quit),
			},
			_ = countdown.wait_for(|s| s.countdown == Countdown::Expired) => {
				println!("{}", Countdown::Expired);
				return Ok(Next::Quit);
			}
			_ = tokio::signal::ctrl_c() => return Ok(Next::Quit),
			line = app.prompt.read_line() => {
				let Some(line) = line? else {
					return Ok(Next::Quit);
				};
				let command = match SessionCommand::parse(&line) {
					Ok(Some(command)) => command,
					Ok(None) => continue,
					Err(usage) => {
						println!("{usage}");
						continue;
					}
				};
				if command == SessionCommand::Quit {
					return Ok(Next::Quit);
				}
				if let Err(e) = run(runtime, instruction, &embed, command).await {
					eprintln!("error: {e:#}");
				}
			}
		}
	}
}

async fn run(
	runtime: &LabRuntime,
	instruction: Option<&LabInstruction>,
	embed: &ConsoleEmbed,
	command: SessionCommand,
) -> Result<()> {
	let session = runtime.session();
	match command {
		SessionCommand::Help => println!("{HELP}"),
		SessionCommand::Status => {
			let countdown = runtime.timers().countdown();
			println!("Lab {} is {}", session.id, runtime.poll_state().status);
			if let Some(reading) = runtime.timers().badge() {
				println!("Time: {}", reading.badge());
			}
			let marker = if countdown.warning { " (expiring soon)" } else { "" };
			println!("{}{marker}", countdown.countdown);
			println!(
				"Launches: {} of {} used",
				session.launch_count, session.max_launches
			);
		}
		SessionCommand::Open => open_in_browser(embed),
		SessionCommand::Tasks => match (instruction, runtime.progress()) {
			(Some(instruction), Some(store)) => commands::print_progress(instruction, store).await,
			_ => println!("No task list loaded; start with --catalog <file>."),
		},
		SessionCommand::Toggle(task_id) => match runtime.progress() {
			Some(store) => commands::toggle_task(store, &task_id).await?,
			None => println!("No task list loaded; start with --catalog <file>."),
		},
		SessionCommand::Account => {
			let account = runtime.provisioner().provision().await?;
			commands::print_account(&account, false);
		}
		SessionCommand::Copy(field) => commands::copy_field(runtime.provisioner(), field).await?,
		SessionCommand::Restart => {
			runtime.lifecycle().restart(&session.course_id).await?;
		}
		SessionCommand::Close => {
			runtime.lifecycle().close(&session.purchase_id).await?;
		}
		SessionCommand::Destroy => {
			runtime.lifecycle().destroy(&session.purchase_id).await?;
		}
		SessionCommand::Quit => {}
	}
	Ok(())
}

/// Finishes progress syncs and lets background teardown finish.
async fn shut_down(runtime: &LabRuntime) {
	if let Some(progress) = runtime.progress() {
		commands::flush_progress(progress).await;
	}
	runtime.lifecycle().settle().await;
}
