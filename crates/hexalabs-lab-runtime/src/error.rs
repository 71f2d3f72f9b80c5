// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use hexalabs_lab_core::LabModelError;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LabApiError {
	#[error("network error: {0}")]
	Network(#[from] reqwest::Error),

	/// Non-success response. `message` is the body's `error` or `message`
	/// field when present.
	#[error("{message}")]
	Rejected { status: StatusCode, message: String },

	#[error("lab session not found")]
	NotFound,

	#[error("launch denied: {message}")]
	LaunchDenied {
		message: String,
		expired: bool,
		limit_reached: bool,
	},

	#[error("invalid URL: {0}")]
	InvalidUrl(String),

	#[error("unexpected response: {0}")]
	Decode(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("state directory unavailable")]
	NoStateDir,
}

#[derive(Debug, Error)]
pub enum LifecycleError {
	#[error("a restart is already in progress")]
	Busy,

	#[error("confirmation text did not match")]
	ConfirmationMismatch,

	#[error(transparent)]
	Api(#[from] LabApiError),
}

#[derive(Debug, Error)]
pub enum ProgressError {
	#[error(transparent)]
	Model(#[from] LabModelError),

	#[error("failed to write local progress: {0}")]
	Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ProvisionError {
	#[error(transparent)]
	Api(#[from] LabApiError),

	#[error("no account has been provisioned yet")]
	NotReady,

	#[error("account creation already in progress")]
	InProgress,

	#[error("clipboard unavailable: {0}")]
	Clipboard(String),
}
