// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Hexalabs CLI
//!
//! Launches lab sessions, holds the console open while the VM is in use and
//! runs the lifecycle actions (restart, close, destroy) from the terminal.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hexalabs_cli_config::{load_config_with_cli, CliOverrides, LogFormat, LogLevel, LoggingConfig};
use hexalabs_lab_core::{CourseId, LabId, PurchaseId};
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod commands;
mod session;
mod terminal;

use app::App;
use commands::FieldArg;
use session::ConnectArgs;

/// Hexalabs - hands-on cloud lab sessions
#[derive(Parser, Debug)]
#[command(name = "hexalabs", version, about, long_about = None)]
struct Args {
	/// Path to custom configuration file
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Log level (overrides config)
	#[arg(short, long)]
	log_level: Option<String>,

	/// Output logs as JSON (overrides config)
	#[arg(long)]
	json_logs: bool,

	/// Lab backend URL (overrides config)
	#[arg(long)]
	server_url: Option<String>,

	/// Remote desktop gateway URL (overrides config)
	#[arg(long)]
	gateway_url: Option<String>,

	/// Answer yes to restart and close confirmations. Destroy always asks.
	#[arg(short = 'y', long)]
	yes: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Launch a lab and attach to its console
	Connect {
		course: CourseId,
		purchase: PurchaseId,
		/// Lab instructions file (JSON) for task tracking
		#[arg(long)]
		catalog: Option<PathBuf>,
		/// Open the console in a browser once it is ready
		#[arg(long)]
		open: bool,
	},
	/// Show a lab session's status
	Status { lab: LabId },
	/// Restart the lab VM
	Restart { course: CourseId },
	/// Snapshot and stop the lab VM
	Close { purchase: PurchaseId },
	/// Delete the lab session and its resources
	Destroy { purchase: PurchaseId },
	/// Show or update task progress
	Progress {
		course: CourseId,
		purchase: PurchaseId,
		/// Lab instructions file (JSON)
		#[arg(long)]
		catalog: PathBuf,
		/// Task to mark complete, or reopen if already complete
		#[arg(long = "toggle", value_name = "TASK_ID")]
		toggle: Vec<String>,
	},
	/// Create or show the cloud account for a course
	Account {
		course: CourseId,
		/// Copy one field to the clipboard
		#[arg(long, value_enum)]
		copy: Option<FieldArg>,
		/// Print the password instead of masking it
		#[arg(long)]
		show_password: bool,
	},
}

impl From<&Args> for CliOverrides {
	fn from(args: &Args) -> Self {
		CliOverrides {
			server_url: args.server_url.clone(),
			gateway_url: args.gateway_url.clone(),
			log_level: args.log_level.clone(),
			log_format: args.json_logs.then(|| "json".to_string()),
			config_file: args.config.clone(),
		}
	}
}

fn log_level_to_tracing(level: LogLevel) -> tracing::Level {
	match level {
		LogLevel::Trace => tracing::Level::TRACE,
		LogLevel::Debug => tracing::Level::DEBUG,
		LogLevel::Info => tracing::Level::INFO,
		LogLevel::Warn => tracing::Level::WARN,
		LogLevel::Error => tracing::Level::ERROR,
	}
}

// Logs go to stderr so they never interleave with the prompt.
fn init_tracing(logging: &LoggingConfig) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		EnvFilter::new(format!("hexalabs={}", log_level_to_tracing(logging.level)))
	});

	match logging.format {
		LogFormat::Json => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().json().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Compact => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().compact().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Pretty => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().with_writer(std::io::stderr))
				.init();
		}
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let config =
		load_config_with_cli(CliOverrides::from(&args)).context("failed to load configuration")?;
	init_tracing(&config.logging);

	info!(server = %config.server.url, "starting hexalabs");
	debug!(paths = ?config.paths, "resolved paths");

	let app = App::from_config(&config, args.yes)?;

	match args.command {
		Command::Connect {
			course,
			purchase,
			catalog,
			open,
		} => {
			session::connect(
				&app,
				ConnectArgs {
					course_id: course,
					purchase_id: purchase,
					catalog,
					open,
				},
			)
			.await
		}
		Command::Status { lab } => commands::status(&app, &lab).await,
		Command::Restart { course } => commands::restart(&app, &course).await,
		Command::Close { purchase } => commands::close(&app, &purchase).await,
		Command::Destroy { purchase } => commands::destroy(&app, &purchase).await,
		Command::Progress {
			course,
			purchase,
			catalog,
			toggle,
		} => commands::progress(&app, &course, &purchase, &catalog, &toggle).await,
		Command::Account {
			course,
			copy,
			show_password,
		} => commands::account(&app, &course, copy, show_password).await,
	}
}
