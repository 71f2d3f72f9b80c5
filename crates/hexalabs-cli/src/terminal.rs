// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Host collaborators backed by the terminal.

use std::io::{self, Write};
use std::sync::Arc;

use async_trait::async_trait;
use hexalabs_lab_runtime::{
	Clipboard, ConfirmAnswer, ConfirmPrompt, Confirmer, Navigator, Notifier, Route,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

/// Line-oriented stdin shared by the command loop and the confirmer.
pub struct Prompt {
	lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl Prompt {
	pub fn stdin() -> Self {
		Self {
			lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
		}
	}

	/// `Ok(None)` at end of input. Cancel safe.
	pub async fn read_line(&self) -> io::Result<Option<String>> {
		self.lines.lock().await.next_line().await
	}

	pub async fn ask(&self, question: &str) -> io::Result<Option<String>> {
		print!("{question}");
		io::stdout().flush()?;
		self.read_line().await
	}
}

/// What the controller asked the host to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEvent {
	Navigate(Route),
	Refresh,
	Reload,
}

/// Forwards navigation requests to whoever drives the session.
pub struct TerminalNavigator {
	events: mpsc::UnboundedSender<NavEvent>,
}

impl TerminalNavigator {
	pub fn channel() -> (Self, mpsc::UnboundedReceiver<NavEvent>) {
		let (events, rx) = mpsc::unbounded_channel();
		(Self { events }, rx)
	}

	fn send(&self, event: NavEvent) {
		if self.events.send(event).is_err() {
			debug!(?event, "no session loop listening for navigation");
		}
	}
}

#[async_trait]
impl Navigator for TerminalNavigator {
	async fn navigate(&self, route: Route) {
		println!("Returning to {}", route.path());
		self.send(NavEvent::Navigate(route));
	}

	async fn refresh(&self) {
		self.send(NavEvent::Refresh);
	}

	async fn reload(&self) {
		self.send(NavEvent::Reload);
	}
}

/// Asks on stdin. With `assume_yes`, yes/no prompts are accepted without
/// asking; the typed destroy confirmation is always asked.
pub struct PromptConfirmer {
	prompt: Arc<Prompt>,
	assume_yes: bool,
}

impl PromptConfirmer {
	pub fn new(prompt: Arc<Prompt>, assume_yes: bool) -> Self {
		Self { prompt, assume_yes }
	}
}

fn question(prompt: &ConfirmPrompt) -> String {
	match prompt {
		ConfirmPrompt::Destroy { literal } => format!(
			"{}\n{}\nType {literal} to confirm: ",
			prompt.title(),
			prompt.message()
		),
		_ => format!("{}\n{} [y/N] ", prompt.title(), prompt.message()),
	}
}

/// Maps a typed answer onto the controller's vocabulary. End of input and
/// blank answers decline.
pub fn interpret(prompt: &ConfirmPrompt, answer: Option<&str>) -> ConfirmAnswer {
	let answer = answer.map(str::trim).unwrap_or_default();
	if answer.is_empty() {
		return ConfirmAnswer::Declined;
	}
	match prompt {
		ConfirmPrompt::Destroy { .. } => ConfirmAnswer::Typed(answer.to_string()),
		_ if answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes") => {
			ConfirmAnswer::Accepted
		}
		_ => ConfirmAnswer::Declined,
	}
}

#[async_trait]
impl Confirmer for PromptConfirmer {
	async fn confirm(&self, prompt: ConfirmPrompt) -> ConfirmAnswer {
		if self.assume_yes && !matches!(prompt, ConfirmPrompt::Destroy { .. }) {
			return ConfirmAnswer::Accepted;
		}
		match self.prompt.ask(&question(&prompt)).await {
			Ok(answer) => interpret(&prompt, answer.as_deref()),
			Err(e) => {
				warn!(error = %e, "could not read confirmation");
				ConfirmAnswer::Declined
			}
		}
	}
}

/// Prints notices for the user and mirrors them into the log.
pub struct TerminalNotifier;

#[async_trait]
impl Notifier for TerminalNotifier {
	async fn info(&self, message: &str) {
		info!(notice = message, "user notice");
		println!("{message}");
	}

	async fn warning(&self, message: &str) {
		warn!(notice = message, "user notice");
		println!("warning: {message}");
	}

	async fn error(&self, message: &str) {
		error!(notice = message, "user notice");
		eprintln!("error: {message}");
	}
}

/// The desktop clipboard. Each write opens its own handle on a blocking
/// thread.
pub struct SystemClipboard;

#[async_trait]
impl Clipboard for SystemClipboard {
	async fn write_text(&self, text: &str) -> Result<(), String> {
		let text = text.to_string();
		tokio::task::spawn_blocking(move || {
			let mut clipboard = arboard::Clipboard::new().map_err(|e| e.to_string())?;
			clipboard.set_text(text).map_err(|e| e.to_string())
		})
		.await
		.map_err(|e| e.to_string())?
	}
}
