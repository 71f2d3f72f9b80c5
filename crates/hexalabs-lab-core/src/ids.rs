// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Identifier newtypes.
//!
//! The backend issues opaque string ids. They are wrapped so a purchase id can
//! never be passed where a course id is expected: the progress cache is keyed
//! by course while the remote progress endpoint is keyed by purchase.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LabModelError;

macro_rules! string_id {
	($(#[$meta:meta])* $name:ident, $label:literal) => {
		$(#[$meta])*
		#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(String);

		impl $name {
			pub fn new(value: impl Into<String>) -> Self {
				Self(value.into())
			}

			pub fn as_str(&self) -> &str {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str(&self.0)
			}
		}

		impl FromStr for $name {
			type Err = LabModelError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				let trimmed = s.trim();
				if trimmed.is_empty() {
					return Err(LabModelError::EmptyId($label));
				}
				Ok(Self(trimmed.to_string()))
			}
		}

		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
	};
}

string_id!(
	/// Identifier of one running lab session.
	LabId,
	"lab id"
);

string_id!(
	/// Identifier of the purchase (enrolment) a lab session belongs to.
	PurchaseId,
	"purchase id"
);

string_id!(
	/// Identifier of the course whose lab is being run.
	CourseId,
	"course id"
);
