// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabModelError {
	#[error("{0} must not be empty")]
	EmptyId(&'static str),

	#[error("task '{0}' is not part of this lab")]
	UnknownTask(String),
}
