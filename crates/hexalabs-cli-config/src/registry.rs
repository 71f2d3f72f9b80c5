// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Configuration registry - manages sources and merges layers.

use tracing::{debug, info};

use crate::layer::ConfigLayer;
use crate::paths::PathsConfig;
use crate::runtime::LabConfig;
use crate::sources::ConfigSource;
use crate::validation::validate_config;
use crate::ConfigError;

pub struct ConfigRegistry {
	sources: Vec<Box<dyn ConfigSource>>,
}

impl ConfigRegistry {
	pub fn new() -> Self {
		Self {
			sources: Vec::new(),
		}
	}

	pub fn register(&mut self, source: Box<dyn ConfigSource>) {
		debug!(source = source.name(), precedence = ?source.precedence(), "registering config source");
		self.sources.push(source);
	}

	/// Load configuration from all sources, merge, and validate.
	///
	/// Sources are merged lowest precedence first. A file that exists but
	/// does not parse is an error; silently ignoring it would run against the
	/// wrong backend.
	pub fn load(&self, paths: PathsConfig) -> Result<LabConfig, ConfigError> {
		let mut sorted_sources: Vec<_> = self.sources.iter().collect();
		sorted_sources.sort_by_key(|s| s.precedence());

		info!(
			source_count = sorted_sources.len(),
			"loading configuration from sources"
		);

		let mut merged = ConfigLayer::default();
		for source in &sorted_sources {
			let layer = source.load()?;
			debug!(source = source.name(), "merging config layer");
			merged.merge(layer);
		}

		let config = LabConfig::from_layer(merged, paths)?;
		validate_config(&config)?;

		info!(
				server = %config.server.url,
				gateway = %config.gateway.url,
				log_level = ?config.logging.level,
				"configuration loaded successfully"
		);

		Ok(config)
	}

	pub fn source_count(&self) -> usize {
		self.sources.len()
	}
}

impl Default for ConfigRegistry {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;
	use crate::layer::PollingLayer;
	use crate::sources::{DefaultsSource, FileSource, Precedence};

	struct FixedSource {
		name: &'static str,
		precedence: Precedence,
		interval: &'static str,
	}

	impl ConfigSource for FixedSource {
		fn name(&self) -> &'static str {
			self.name
		}
		fn precedence(&self) -> Precedence {
			self.precedence
		}
		fn load(&self) -> Result<ConfigLayer, ConfigError> {
			Ok(ConfigLayer {
				polling: Some(PollingLayer {
					interval: Some(self.interval.to_string()),
					max_attempts: None,
				}),
				..Default::default()
			})
		}
	}

	#[test]
	fn registers_sources() {
		let mut registry = ConfigRegistry::new();
		assert_eq!(registry.source_count(), 0);
		registry.register(Box::new(DefaultsSource));
		assert_eq!(registry.source_count(), 1);
	}

	#[test]
	fn defaults_only_loads() {
		let mut registry = ConfigRegistry::new();
		registry.register(Box::new(DefaultsSource));
		let config = registry.load(PathsConfig::default()).unwrap();
		assert_eq!(config.polling.max_attempts, 20);
	}

	#[test]
	fn higher_precedence_wins_regardless_of_registration_order() {
		let mut registry = ConfigRegistry::new();
		registry.register(Box::new(FixedSource {
			name: "cli",
			precedence: Precedence::Cli,
			interval: "1s",
		}));
		registry.register(Box::new(FixedSource {
			name: "user",
			precedence: Precedence::UserFile,
			interval: "10s",
		}));

		let config = registry.load(PathsConfig::default()).unwrap();
		assert_eq!(config.polling.interval, Duration::from_secs(1));
	}

	#[test]
	fn malformed_file_fails_the_load() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.toml");
		std::fs::write(&path, "not = [valid").unwrap();

		let mut registry = ConfigRegistry::new();
		registry.register(Box::new(FileSource::custom(
			path,
			Precedence::UserFile,
			"user-config",
		)));
		assert!(matches!(
			registry.load(PathsConfig::default()),
			Err(ConfigError::TomlParse { .. })
		));
	}

	#[test]
	fn invalid_merged_config_is_rejected() {
		let mut registry = ConfigRegistry::new();
		registry.register(Box::new(FixedSource {
			name: "user",
			precedence: Precedence::UserFile,
			interval: "0s",
		}));
		assert!(matches!(
			registry.load(PathsConfig::default()),
			Err(ConfigError::InvalidValue { .. })
		));
	}
}
