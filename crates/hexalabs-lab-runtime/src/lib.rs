// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Runtime controller for a Hexalabs lab session.
//!
//! A launch starts the [`StatusPoller`]; once it reports the console ready
//! the [`ConsoleGate`] decides whether the one-time refresh overlay is
//! needed. [`SessionTimers`] tick alongside, the [`LifecycleController`]
//! handles restart, close and destroy, and the [`ProgressStore`] keeps task
//! completion in sync. [`LabRuntime`] bundles them for one session.

pub mod api;
pub mod cache;
pub mod catalog;
pub mod clock;
pub mod error;
pub mod gate;
pub mod http;
pub mod kv;
pub mod lifecycle;
pub mod poller;
pub mod progress;
pub mod provision;
pub mod runtime;
pub mod schedule;
pub mod timers;

#[cfg(test)]
mod testing;

pub use api::{
	Clipboard, ConfirmAnswer, ConfirmPrompt, Confirmer, InstructionCatalog, LabApi, Navigator,
	Notifier, Route,
};
pub use cache::{FileProgressCache, MemoryProgressCache, ProgressCache};
pub use catalog::StaticCatalog;
pub use clock::{AnchoredClock, Clock, SystemClock};
pub use error::{LabApiError, LifecycleError, ProgressError, ProvisionError, StoreError};
pub use gate::{ConsoleGate, ConsoleView};
pub use http::HttpLabApi;
pub use kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, RefreshFlags};
pub use lifecycle::{LifecycleController, LifecycleOutcome, DESTROY_CONFIRMATION};
pub use poller::{PollHandle, PollPhase, PollState, PollerConfig, StatusPoller};
pub use progress::{ProgressSource, ProgressStore, ProgressTimings};
pub use provision::{AccountField, CredentialProvisioner, ProvisionState};
pub use runtime::{Collaborators, LabRuntime, RuntimeConfig};
pub use schedule::{detach, Background, Debouncer, ScheduledTask, Ticker};
pub use timers::{CountdownState, SessionTimers};
