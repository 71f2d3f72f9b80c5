// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Default configuration file generation.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::ConfigError;

/// Written to `~/.config/hexalabs/config.toml` when no user config exists.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"#
# hexalabs configuration
# Location: ~/.config/hexalabs/config.toml
#
# Durations accept humantime strings such as "3s", "500ms" or "1h 30m".
#

[server]
# Base URL of the lab backend.
url = "http://localhost:3000/"
# Bearer token for the backend. Prefer HEXALABS_AUTH_TOKEN.
# auth_token = ""

[gateway]
# Remote desktop gateway embedded once a session is ready.
url = "http://localhost:8080/guacamole/"

[polling]
# Time between status checks after a launch.
interval = "3s"
# Checks before giving up and deciding from the last known status.
max_attempts = 20

[progress]
# Quiet period before task progress is sent to the backend.
debounce = "2s"
saved_reset = "2s"
error_reset = "3s"

[timer]
# Warn once when this much session time remains.
warning_threshold = "1h"

[logging]
# error, warn, info, debug, trace
level = "info"
# pretty, compact, json
format = "pretty"
"#;

/// Write the default template if `path` does not exist. Returns whether a
/// file was created.
pub fn ensure_default_config(path: &Path) -> Result<bool, ConfigError> {
	if path.exists() {
		debug!(path = %path.display(), "user config already exists");
		return Ok(false);
	}

	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent)?;
	}
	fs::write(path, DEFAULT_CONFIG_TEMPLATE)?;
	info!(path = %path.display(), "created default config file");
	Ok(true)
}
