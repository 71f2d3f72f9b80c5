// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP client for talking to the lab backend.

mod client;

pub use client::{builder, new_client, user_agent};
