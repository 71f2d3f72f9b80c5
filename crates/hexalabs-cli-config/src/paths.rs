// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! XDG Base Directory compliant path resolution.

use std::path::PathBuf;

use crate::ConfigError;

pub const SYSTEM_CONFIG_FILE: &str = "/etc/hexalabs/config.toml";
pub const WORKSPACE_CONFIG_FILE: &str = ".hexalabs/config.toml";

/// Resolved XDG paths for hexalabs.
#[derive(Debug, Clone)]
pub struct PathsConfig {
	/// `~/.config/hexalabs/config.toml`
	pub user_config_file: PathBuf,
	pub system_config_file: PathBuf,
	/// Per-course progress cache: `~/.local/share/hexalabs/progress`
	pub progress_dir: PathBuf,
	/// Session-scoped flags: `~/.local/state/hexalabs/session.json`
	pub session_file: PathBuf,
}

impl PathsConfig {
	pub fn config_dir(&self) -> PathBuf {
		self
			.user_config_file
			.parent()
			.map(|p| p.to_path_buf())
			.unwrap_or_else(|| self.user_config_file.clone())
	}
}

impl Default for PathsConfig {
	fn default() -> Self {
		Self {
			user_config_file: PathBuf::from("~/.config/hexalabs/config.toml"),
			system_config_file: PathBuf::from(SYSTEM_CONFIG_FILE),
			progress_dir: PathBuf::from("~/.local/share/hexalabs/progress"),
			session_file: PathBuf::from("~/.local/state/hexalabs/session.json"),
		}
	}
}

/// Resolve paths from `XDG_CONFIG_HOME`, `XDG_DATA_HOME` and `XDG_STATE_HOME`,
/// falling back to the usual locations under the home directory.
pub fn resolve_xdg_paths() -> Result<PathsConfig, ConfigError> {
	let home = dirs::home_dir().ok_or(ConfigError::HomeDirNotFound)?;

	let config_home = std::env::var_os("XDG_CONFIG_HOME")
		.map(PathBuf::from)
		.unwrap_or_else(|| home.join(".config"));

	let data_home = std::env::var_os("XDG_DATA_HOME")
		.map(PathBuf::from)
		.unwrap_or_else(|| home.join(".local/share"));

	let state_home = std::env::var_os("XDG_STATE_HOME")
		.map(PathBuf::from)
		.unwrap_or_else(|| home.join(".local/state"));

	tracing::debug!(
			config_home = %config_home.display(),
			data_home = %data_home.display(),
			state_home = %state_home.display(),
			"resolved XDG paths"
	);

	Ok(PathsConfig {
		user_config_file: config_home.join("hexalabs/config.toml"),
		system_config_file: PathBuf::from(SYSTEM_CONFIG_FILE),
		progress_dir: data_home.join("hexalabs/progress"),
		session_file: state_home.join("hexalabs/session.json"),
	})
}

pub fn workspace_config_path() -> Result<PathBuf, ConfigError> {
	let cwd = std::env::current_dir()?;
	Ok(cwd.join(WORKSPACE_CONFIG_FILE))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn resolved_paths_live_under_hexalabs() {
		let paths = resolve_xdg_paths().unwrap();
		assert!(paths.user_config_file.ends_with("hexalabs/config.toml"));
		assert!(paths.progress_dir.ends_with("hexalabs/progress"));
		assert!(paths.session_file.ends_with("hexalabs/session.json"));
		assert_eq!(paths.system_config_file, PathBuf::from(SYSTEM_CONFIG_FILE));
	}

	#[test]
	fn config_dir_is_parent_of_user_file() {
		let paths = PathsConfig::default();
		assert!(paths.config_dir().ends_with("hexalabs"));
	}

	#[test]
	fn workspace_config_is_relative_to_cwd() {
		let path = workspace_config_path().unwrap();
		assert!(path.ends_with(".hexalabs/config.toml"));
	}
}
