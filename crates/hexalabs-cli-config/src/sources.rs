// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Configuration sources: files, environment, CLI, defaults.

use std::path::PathBuf;

use hexalabs_common_secret::SecretString;
use tracing::{debug, trace, warn};

use crate::layer::*;
use crate::paths::{PathsConfig, SYSTEM_CONFIG_FILE, WORKSPACE_CONFIG_FILE};
use crate::ConfigError;

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	SystemFile = 20,
	UserFile = 30,
	WorkspaceFile = 40,
	Environment = 50,
	Cli = 60,
}

pub trait ConfigSource: Send + Sync {
	/// Name for logging
	fn name(&self) -> &'static str;

	fn precedence(&self) -> Precedence;

	fn load(&self) -> Result<ConfigLayer, ConfigError>;
}

/// Built-in defaults. The layer is empty; defaults are applied when the
/// runtime config is built.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ConfigLayer::default())
	}
}

/// TOML file source. A missing file yields an empty layer.
pub struct FileSource {
	path: PathBuf,
	precedence: Precedence,
	name: &'static str,
}

impl FileSource {
	pub fn system() -> Self {
		Self {
			path: PathBuf::from(SYSTEM_CONFIG_FILE),
			precedence: Precedence::SystemFile,
			name: "system-config",
		}
	}

	pub fn user(paths: &PathsConfig) -> Self {
		Self {
			path: paths.user_config_file.clone(),
			precedence: Precedence::UserFile,
			name: "user-config",
		}
	}

	pub fn workspace() -> Result<Self, ConfigError> {
		let cwd = std::env::current_dir()?;
		Ok(Self {
			path: cwd.join(WORKSPACE_CONFIG_FILE),
			precedence: Precedence::WorkspaceFile,
			name: "workspace-config",
		})
	}

	pub fn custom(path: PathBuf, precedence: Precedence, name: &'static str) -> Self {
		Self {
			path,
			precedence,
			name,
		}
	}
}

impl ConfigSource for FileSource {
	fn name(&self) -> &'static str {
		self.name
	}
	fn precedence(&self) -> Precedence {
		self.precedence
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), source = self.name, "config file not found, skipping");
			return Ok(ConfigLayer::default());
		}

		debug!(path = %self.path.display(), source = self.name, "loading config file");

		let content = std::fs::read_to_string(&self.path)?;
		let layer: ConfigLayer = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		trace!(source = self.name, "parsed config layer");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: `HEXALABS_<SECTION>_<FIELD>`, e.g. `HEXALABS_POLLING_INTERVAL`.
pub struct EnvSource {
	vars: Option<Vec<(String, String)>>,
}

impl EnvSource {
	pub fn new() -> Self {
		Self { vars: None }
	}

	/// Reads from the given pairs instead of the process environment.
	pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
		Self {
			vars: Some(vars.into_iter().collect()),
		}
	}
}

impl Default for EnvSource {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading environment variables");
		let vars: Vec<(String, String)> = match &self.vars {
			Some(vars) => vars.clone(),
			None => std::env::vars().collect(),
		};

		let mut layer = ConfigLayer::default();
		for (key, value) in vars {
			if !key.starts_with("HEXALABS_") {
				continue;
			}

			let value = value.trim().to_string();
			if value.is_empty() {
				continue;
			}

			trace!(key = %key, "processing env var");

			match key.as_str() {
				"HEXALABS_SERVER_URL" => {
					layer.server.get_or_insert_with(ServerLayer::default).url = Some(value);
				}
				"HEXALABS_AUTH_TOKEN" | "HEXALABS_SERVER_AUTH_TOKEN" => {
					layer
						.server
						.get_or_insert_with(ServerLayer::default)
						.auth_token = Some(SecretString::new(value));
				}
				"HEXALABS_GATEWAY_URL" => {
					layer.gateway.get_or_insert_with(GatewayLayer::default).url = Some(value);
				}
				"HEXALABS_POLLING_INTERVAL" => {
					layer
						.polling
						.get_or_insert_with(PollingLayer::default)
						.interval = Some(value);
				}
				"HEXALABS_POLLING_MAX_ATTEMPTS" => match value.parse() {
					Ok(v) => {
						layer
							.polling
							.get_or_insert_with(PollingLayer::default)
							.max_attempts = Some(v);
					}
					Err(_) => warn!(key = %key, "ignoring non-numeric value"),
				},
				"HEXALABS_PROGRESS_DEBOUNCE" => {
					layer
						.progress
						.get_or_insert_with(ProgressLayer::default)
						.debounce = Some(value);
				}
				"HEXALABS_TIMER_WARNING_THRESHOLD" => {
					layer
						.timer
						.get_or_insert_with(TimerLayer::default)
						.warning_threshold = Some(value);
				}
				"HEXALABS_LOG_LEVEL" => {
					layer.logging.get_or_insert_with(LoggingLayer::default).level = Some(value);
				}
				"HEXALABS_LOG_FORMAT" => {
					layer.logging.get_or_insert_with(LoggingLayer::default).format = Some(value);
				}
				_ => {}
			}
		}

		Ok(layer)
	}
}

/// CLI argument overrides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
	pub server_url: Option<String>,
	pub gateway_url: Option<String>,
	pub log_level: Option<String>,
	pub log_format: Option<String>,
	pub config_file: Option<PathBuf>,
}

pub struct CliSource {
	overrides: CliOverrides,
}

impl CliSource {
	pub fn new(overrides: CliOverrides) -> Self {
		Self { overrides }
	}
}

impl ConfigSource for CliSource {
	fn name(&self) -> &'static str {
		"cli"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Cli
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading CLI overrides");
		let mut layer = ConfigLayer::default();

		if let Some(url) = &self.overrides.server_url {
			layer.server.get_or_insert_with(ServerLayer::default).url = Some(url.clone());
		}
		if let Some(url) = &self.overrides.gateway_url {
			layer.gateway.get_or_insert_with(GatewayLayer::default).url = Some(url.clone());
		}
		if let Some(level) = &self.overrides.log_level {
			layer.logging.get_or_insert_with(LoggingLayer::default).level = Some(level.clone());
		}
		if let Some(format) = &self.overrides.log_format {
			layer.logging.get_or_insert_with(LoggingLayer::default).format = Some(format.clone());
		}

		Ok(layer)
	}
}
