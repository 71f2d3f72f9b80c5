// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Runtime configuration types with resolved defaults.

use std::time::Duration;

use hexalabs_common_secret::SecretString;
use url::Url;

use crate::layer::*;
use crate::paths::PathsConfig;
use crate::ConfigError;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000/";
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8080/guacamole/";

/// The final, validated configuration for the hexalabs client.
#[derive(Debug, Clone)]
pub struct LabConfig {
	pub server: ServerConfig,
	pub gateway: GatewayConfig,
	pub polling: PollingConfig,
	pub progress: ProgressConfig,
	pub timer: TimerConfig,
	pub logging: LoggingConfig,
	pub paths: PathsConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
	pub url: Url,
	pub auth_token: Option<SecretString>,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
	pub url: Url,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingConfig {
	pub interval: Duration,
	pub max_attempts: u32,
}

impl Default for PollingConfig {
	fn default() -> Self {
		Self {
			interval: Duration::from_secs(3),
			max_attempts: 20,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressConfig {
	pub debounce: Duration,
	pub saved_reset: Duration,
	pub error_reset: Duration,
}

impl Default for ProgressConfig {
	fn default() -> Self {
		Self {
			debounce: Duration::from_secs(2),
			saved_reset: Duration::from_secs(2),
			error_reset: Duration::from_secs(3),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerConfig {
	pub warning_threshold: Duration,
}

impl Default for TimerConfig {
	fn default() -> Self {
		Self {
			warning_threshold: Duration::from_secs(60 * 60),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoggingConfig {
	pub level: LogLevel,
	pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
	Error,
	Warn,
	#[default]
	Info,
	Debug,
	Trace,
}

impl LogLevel {
	pub fn as_str(&self) -> &'static str {
		match self {
			LogLevel::Error => "error",
			LogLevel::Warn => "warn",
			LogLevel::Info => "info",
			LogLevel::Debug => "debug",
			LogLevel::Trace => "trace",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
	#[default]
	Pretty,
	Compact,
	Json,
}

impl LabConfig {
	/// Build runtime config from a merged layer and paths.
	pub fn from_layer(layer: ConfigLayer, paths: PathsConfig) -> Result<Self, ConfigError> {
		Ok(Self {
			server: build_server_config(layer.server)?,
			gateway: build_gateway_config(layer.gateway)?,
			polling: build_polling_config(layer.polling)?,
			progress: build_progress_config(layer.progress)?,
			timer: build_timer_config(layer.timer)?,
			logging: build_logging_config(layer.logging),
			paths,
		})
	}
}

fn parse_url(field: &str, value: Option<String>, default: &str) -> Result<Url, ConfigError> {
	let raw = value.unwrap_or_else(|| default.to_string());
	Url::parse(&raw).map_err(|e| ConfigError::invalid_value(field, e.to_string()))
}

fn parse_duration(
	field: &str,
	value: Option<&str>,
	default: Duration,
) -> Result<Duration, ConfigError> {
	match value {
		None => Ok(default),
		Some(raw) => humantime::parse_duration(raw.trim())
			.map_err(|e| ConfigError::invalid_value(field, format!("'{raw}': {e}"))),
	}
}

fn build_server_config(layer: Option<ServerLayer>) -> Result<ServerConfig, ConfigError> {
	let layer = layer.unwrap_or_default();
	Ok(ServerConfig {
		url: parse_url("server.url", layer.url, DEFAULT_SERVER_URL)?,
		auth_token: layer.auth_token.filter(|t| !t.is_blank()),
	})
}

fn build_gateway_config(layer: Option<GatewayLayer>) -> Result<GatewayConfig, ConfigError> {
	let layer = layer.unwrap_or_default();
	Ok(GatewayConfig {
		url: parse_url("gateway.url", layer.url, DEFAULT_GATEWAY_URL)?,
	})
}

fn build_polling_config(layer: Option<PollingLayer>) -> Result<PollingConfig, ConfigError> {
	let layer = layer.unwrap_or_default();
	let defaults = PollingConfig::default();
	Ok(PollingConfig {
		interval: parse_duration(
			"polling.interval",
			layer.interval.as_deref(),
			defaults.interval,
		)?,
		max_attempts: layer.max_attempts.unwrap_or(defaults.max_attempts),
	})
}

fn build_progress_config(layer: Option<ProgressLayer>) -> Result<ProgressConfig, ConfigError> {
	let layer = layer.unwrap_or_default();
	let defaults = ProgressConfig::default();
	Ok(ProgressConfig {
		debounce: parse_duration(
			"progress.debounce",
			layer.debounce.as_deref(),
			defaults.debounce,
		)?,
		saved_reset: parse_duration(
			"progress.saved_reset",
			layer.saved_reset.as_deref(),
			defaults.saved_reset,
		)?,
		error_reset: parse_duration(
			"progress.error_reset",
			layer.error_reset.as_deref(),
			defaults.error_reset,
		)?,
	})
}

fn build_timer_config(layer: Option<TimerLayer>) -> Result<TimerConfig, ConfigError> {
	let layer = layer.unwrap_or_default();
	Ok(TimerConfig {
		warning_threshold: parse_duration(
			"timer.warning_threshold",
			layer.warning_threshold.as_deref(),
			TimerConfig::default().warning_threshold,
		)?,
	})
}

fn build_logging_config(layer: Option<LoggingLayer>) -> LoggingConfig {
	let layer = layer.unwrap_or_default();
	LoggingConfig {
		level: parse_log_level(layer.level.as_deref()),
		format: parse_log_format(layer.format.as_deref()),
	}
}

fn parse_log_level(s: Option<&str>) -> LogLevel {
	match s.map(str::to_ascii_lowercase).as_deref() {
		Some("error") => LogLevel::Error,
		Some("warn") => LogLevel::Warn,
		Some("info") => LogLevel::Info,
		Some("debug") => LogLevel::Debug,
		Some("trace") => LogLevel::Trace,
		_ => LogLevel::Info,
	}
}

fn parse_log_format(s: Option<&str>) -> LogFormat {
	match s.map(str::to_ascii_lowercase).as_deref() {
		Some("json") => LogFormat::Json,
		Some("compact") => LogFormat::Compact,
		_ => LogFormat::Pretty,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn build(toml_src: &str) -> Result<LabConfig, ConfigError> {
		let layer: ConfigLayer = toml::from_str(toml_src).unwrap();
		LabConfig::from_layer(layer, PathsConfig::default())
	}

	#[test]
	fn empty_layer_yields_defaults() {
		let config = build("").unwrap();
		assert_eq!(config.server.url.as_str(), DEFAULT_SERVER_URL);
		assert_eq!(config.gateway.url.as_str(), DEFAULT_GATEWAY_URL);
		assert_eq!(config.polling, PollingConfig::default());
		assert_eq!(config.progress, ProgressConfig::default());
		assert_eq!(config.timer.warning_threshold, Duration::from_secs(3600));
		assert_eq!(config.logging, LoggingConfig::default());
		assert!(config.server.auth_token.is_none());
	}

	#[test]
	fn humantime_durations_are_parsed() {
		let config = build(
			r#"
			[polling]
			interval = "500ms"
			[progress]
			debounce = "1s 500ms"
			[timer]
			warning_threshold = "45m"
			"#,
		)
		.unwrap();
		assert_eq!(config.polling.interval, Duration::from_millis(500));
		assert_eq!(config.progress.debounce, Duration::from_millis(1500));
		assert_eq!(config.progress.saved_reset, Duration::from_secs(2));
		assert_eq!(config.timer.warning_threshold, Duration::from_secs(45 * 60));
	}

	#[test]
	fn bad_duration_names_the_field() {
		let err = build(
			r#"
			[progress]
			error_reset = "soon"
			"#,
		)
		.unwrap_err();
		assert!(matches!(
			err,
			ConfigError::InvalidValue { ref field, .. } if field == "progress.error_reset"
		));
	}

	#[test]
	fn bad_url_names_the_field() {
		let err = build(
			r#"
			[gateway]
			url = "not a url"
			"#,
		)
		.unwrap_err();
		assert!(matches!(
			err,
			ConfigError::InvalidValue { ref field, .. } if field == "gateway.url"
		));
	}

	#[test]
	fn blank_auth_token_is_dropped() {
		let config = build(
			r#"
			[server]
			auth_token = "  "
			"#,
		)
		.unwrap();
		assert!(config.server.auth_token.is_none());
	}

	#[test]
	fn log_settings_are_case_insensitive() {
		let config = build(
			r#"
			[logging]
			level = "DEBUG"
			format = "Json"
			"#,
		)
		.unwrap();
		assert_eq!(config.logging.level, LogLevel::Debug);
		assert_eq!(config.logging.format, LogFormat::Json);
		assert_eq!(config.logging.level.as_str(), "debug");
	}
}
