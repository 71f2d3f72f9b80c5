// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Partial configuration layer for merging from multiple sources.

use hexalabs_common_secret::SecretString;
use serde::Deserialize;

/// Partial configuration layer - all fields are Option for merging.
///
/// Durations stay as strings here ("3s", "2m 30s") and are parsed when the
/// runtime config is built, so a bad value names its field in the error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigLayer {
	#[serde(default)]
	pub server: Option<ServerLayer>,
	#[serde(default)]
	pub gateway: Option<GatewayLayer>,
	#[serde(default)]
	pub polling: Option<PollingLayer>,
	#[serde(default)]
	pub progress: Option<ProgressLayer>,
	#[serde(default)]
	pub timer: Option<TimerLayer>,
	#[serde(default)]
	pub logging: Option<LoggingLayer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerLayer {
	#[serde(default)]
	pub url: Option<String>,
	#[serde(default)]
	pub auth_token: Option<SecretString>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayLayer {
	#[serde(default)]
	pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PollingLayer {
	#[serde(default)]
	pub interval: Option<String>,
	#[serde(default)]
	pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgressLayer {
	#[serde(default)]
	pub debounce: Option<String>,
	#[serde(default)]
	pub saved_reset: Option<String>,
	#[serde(default)]
	pub error_reset: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimerLayer {
	#[serde(default)]
	pub warning_threshold: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingLayer {
	#[serde(default)]
	pub level: Option<String>,
	#[serde(default)]
	pub format: Option<String>,
}

impl ConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: ConfigLayer) {
		merge_option(&mut self.server, other.server, ServerLayer::merge);
		merge_option(&mut self.gateway, other.gateway, GatewayLayer::merge);
		merge_option(&mut self.polling, other.polling, PollingLayer::merge);
		merge_option(&mut self.progress, other.progress, ProgressLayer::merge);
		merge_option(&mut self.timer, other.timer, TimerLayer::merge);
		merge_option(&mut self.logging, other.logging, LoggingLayer::merge);
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}

fn take<T>(target: &mut Option<T>, source: Option<T>) {
	if source.is_some() {
		*target = source;
	}
}

impl ServerLayer {
	fn merge(&mut self, other: ServerLayer) {
		take(&mut self.url, other.url);
		take(&mut self.auth_token, other.auth_token);
	}
}

impl GatewayLayer {
	fn merge(&mut self, other: GatewayLayer) {
		take(&mut self.url, other.url);
	}
}

impl PollingLayer {
	fn merge(&mut self, other: PollingLayer) {
		take(&mut self.interval, other.interval);
		take(&mut self.max_attempts, other.max_attempts);
	}
}

impl ProgressLayer {
	fn merge(&mut self, other: ProgressLayer) {
		take(&mut self.debounce, other.debounce);
		take(&mut self.saved_reset, other.saved_reset);
		take(&mut self.error_reset, other.error_reset);
	}
}

impl TimerLayer {
	fn merge(&mut self, other: TimerLayer) {
		take(&mut self.warning_threshold, other.warning_threshold);
	}
}

impl LoggingLayer {
	fn merge(&mut self, other: LoggingLayer) {
		take(&mut self.level, other.level);
		take(&mut self.format, other.format);
	}
}
