// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Configuration for the hexalabs client.
//!
//! Layers are merged lowest precedence first:
//! defaults, `/etc/hexalabs/config.toml`, `$XDG_CONFIG_HOME/hexalabs/config.toml`,
//! `.hexalabs/config.toml` in the working directory, `HEXALABS_*` environment
//! variables and finally command line flags.

pub mod defaults;
pub mod error;
pub mod layer;
pub mod paths;
pub mod registry;
pub mod runtime;
pub mod sources;
pub mod validation;

pub use defaults::{ensure_default_config, DEFAULT_CONFIG_TEMPLATE};
pub use error::ConfigError;
pub use layer::ConfigLayer;
pub use paths::PathsConfig;
pub use registry::ConfigRegistry;
pub use runtime::{
	GatewayConfig, LabConfig, LogFormat, LogLevel, LoggingConfig, PollingConfig, ProgressConfig,
	ServerConfig, TimerConfig,
};
pub use sources::{CliOverrides, ConfigSource, Precedence};

/// Load configuration from all sources with CLI overrides on top.
///
/// A default user config is written on first run. An explicit
/// `config_file` replaces the workspace file at the same precedence.
pub fn load_config_with_cli(cli: CliOverrides) -> Result<LabConfig, ConfigError> {
	let paths = paths::resolve_xdg_paths()?;

	ensure_default_config(&paths.user_config_file)?;

	let mut registry = ConfigRegistry::new();

	registry.register(Box::new(sources::DefaultsSource));
	registry.register(Box::new(sources::FileSource::system()));
	registry.register(Box::new(sources::FileSource::user(&paths)));
	match &cli.config_file {
		Some(path) => registry.register(Box::new(sources::FileSource::custom(
			path.clone(),
			Precedence::WorkspaceFile,
			"cli-config-file",
		))),
		None => {
			if let Ok(ws) = sources::FileSource::workspace() {
				registry.register(Box::new(ws));
			}
		}
	}
	registry.register(Box::new(sources::EnvSource::new()));
	registry.register(Box::new(sources::CliSource::new(cli)));

	registry.load(paths)
}
