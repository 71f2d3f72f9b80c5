// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::time::Duration;

use reqwest::{Client, ClientBuilder};

/// Default per-request timeout. Lifecycle calls to the backend (restart,
/// delete) can take a while because they wait on the cloud provider.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Creates a client with the standard User-Agent and the given timeout, or
/// [`DEFAULT_TIMEOUT`] when none is given.
pub fn new_client(timeout: Option<Duration>) -> reqwest::Result<Client> {
	builder()
		.timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
		.build()
}

/// Client builder preloaded with the standard User-Agent.
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Format: `hexalabs/{version} ({os}-{arch})`
pub fn user_agent() -> String {
	format!(
		"hexalabs/{} ({}-{})",
		env!("CARGO_PKG_VERSION"),
		std::env::consts::OS,
		std::env::consts::ARCH
	)
}
