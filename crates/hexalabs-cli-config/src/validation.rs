// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Configuration validation rules.

use tracing::warn;
use url::Url;

use crate::runtime::LabConfig;
use crate::ConfigError;

pub fn validate_config(config: &LabConfig) -> Result<(), ConfigError> {
	validate_urls(config)?;
	validate_polling(config)?;
	validate_progress(config);
	validate_timer(config);

	Ok(())
}

fn validate_urls(config: &LabConfig) -> Result<(), ConfigError> {
	check_http_url("server.url", &config.server.url)?;
	check_http_url("gateway.url", &config.gateway.url)?;

	if config.server.auth_token.is_some() && config.server.url.scheme() == "http" {
		warn!(
			server = %config.server.url,
			"auth_token will be sent over plain http"
		);
	}

	Ok(())
}

fn check_http_url(field: &str, url: &Url) -> Result<(), ConfigError> {
	match url.scheme() {
		"http" | "https" => {}
		other => {
			return Err(ConfigError::invalid_value(
				field,
				format!("unsupported scheme '{other}', expected http or https"),
			))
		}
	}
	if url.host_str().is_none() {
		return Err(ConfigError::invalid_value(field, "missing host"));
	}
	Ok(())
}

fn validate_polling(config: &LabConfig) -> Result<(), ConfigError> {
	if config.polling.interval.is_zero() {
		return Err(ConfigError::invalid_value(
			"polling.interval",
			"interval must be greater than zero",
		));
	}
	if config.polling.max_attempts == 0 {
		return Err(ConfigError::invalid_value(
			"polling.max_attempts",
			"max_attempts must be at least 1",
		));
	}
	Ok(())
}

fn validate_progress(config: &LabConfig) {
	if config.progress.debounce.is_zero() {
		warn!("progress.debounce is zero; every toggle will sync immediately");
	}
}

fn validate_timer(config: &LabConfig) {
	if config.timer.warning_threshold.is_zero() {
		warn!("timer.warning_threshold is zero; the expiry warning will never fire");
	}
}
