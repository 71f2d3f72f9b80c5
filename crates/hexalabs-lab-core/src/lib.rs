// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Domain model for Hexalabs lab sessions.
//!
//! Everything in this crate is pure: no clocks are read, no I/O is done.
//! The runtime crate feeds in `now`, network responses and user actions.

pub mod content;
pub mod error;
pub mod ids;
pub mod progress;
pub mod session;
pub mod timer;

pub use content::*;
pub use error::*;
pub use ids::*;
pub use progress::*;
pub use session::*;
pub use timer::*;
