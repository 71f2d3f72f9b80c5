// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Owned timers.
//!
//! Every deferred or repeating piece of work in the controller is a tokio task
//! held by one of these handles. Dropping the handle aborts the task, so no
//! timer can fire against an owner that no longer exists. The one exception
//! is [`detach`], which is for work whose outcome nobody observes.

use std::fmt::Display;
use std::future::Future;
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A one-shot deferred task.
#[derive(Debug)]
pub struct ScheduledTask {
	handle: JoinHandle<()>,
}

impl ScheduledTask {
	pub fn after<F>(delay: Duration, work: F) -> Self
	where
		F: Future<Output = ()> + Send + 'static,
	{
		let handle = tokio::spawn(async move {
			tokio::time::sleep(delay).await;
			work.await;
		});
		Self { handle }
	}

	pub fn cancel(&self) {
		self.handle.abort();
	}

	pub fn is_finished(&self) -> bool {
		self.handle.is_finished()
	}
}

impl Drop for ScheduledTask {
	fn drop(&mut self) {
		self.handle.abort();
	}
}

#[derive(Default)]
struct DebounceState {
	generation: u64,
	pending: Option<JoinHandle<()>>,
	in_flight: Vec<JoinHandle<()>>,
}

/// Collapses rapid triggers into one action.
///
/// [`Debouncer::reset`] replaces a pending (unfired) action. An action that
/// has already fired runs to completion; it is only aborted when the
/// debouncer itself is dropped.
#[derive(Default)]
pub struct Debouncer {
	state: Arc<Mutex<DebounceState>>,
}

impl Debouncer {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn reset<F>(&self, delay: Duration, action: F)
	where
		F: Future<Output = ()> + Send + 'static,
	{
		let mut state = lock(&self.state);
		state.generation += 1;
		if let Some(pending) = state.pending.take() {
			pending.abort();
		}

		let generation = state.generation;
		let shared = Arc::clone(&self.state);
		state.pending = Some(tokio::spawn(async move {
			tokio::time::sleep(delay).await;
			let mut state = lock(&shared);
			if state.generation != generation {
				return;
			}
			state.pending = None;
			state.in_flight.retain(|h| !h.is_finished());
			state.in_flight.push(tokio::spawn(action));
		}));
	}

	/// Drops the pending action, if any. Returns whether one was pending.
	pub fn cancel(&self) -> bool {
		let mut state = lock(&self.state);
		state.generation += 1;
		match state.pending.take() {
			Some(pending) => {
				pending.abort();
				true
			}
			None => false,
		}
	}

	pub fn is_pending(&self) -> bool {
		lock(&self.state).pending.is_some()
	}

	/// Waits for actions that have already fired. A pending action is left
	/// untouched.
	pub async fn settle(&self) {
		loop {
			let handles = std::mem::take(&mut lock(&self.state).in_flight);
			if handles.is_empty() {
				return;
			}
			for handle in handles {
				if let Err(e) = handle.await {
					if e.is_panic() {
						warn!(error = %e, "debounced action panicked");
					}
				}
			}
		}
	}
}

impl Drop for Debouncer {
	fn drop(&mut self) {
		let mut state = lock(&self.state);
		state.generation += 1;
		if let Some(pending) = state.pending.take() {
			pending.abort();
		}
		for handle in state.in_flight.drain(..) {
			handle.abort();
		}
	}
}

/// A repeating task.
///
/// The first tick happens after `first`, then every `period`. The callback
/// stops the ticker by returning [`ControlFlow::Break`].
#[derive(Debug)]
pub struct Ticker {
	handle: JoinHandle<()>,
}

impl Ticker {
	pub fn spawn<F, Fut>(first: Duration, period: Duration, mut tick: F) -> Self
	where
		F: FnMut() -> Fut + Send + 'static,
		Fut: Future<Output = ControlFlow<()>> + Send + 'static,
	{
		let handle = tokio::spawn(async move {
			let mut interval = tokio::time::interval_at(Instant::now() + first, period);
			interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
			loop {
				interval.tick().await;
				if tick().await.is_break() {
					break;
				}
			}
		});
		Self { handle }
	}

	pub fn stop(&self) {
		self.handle.abort();
	}

	pub fn is_finished(&self) -> bool {
		self.handle.is_finished()
	}
}

impl Drop for Ticker {
	fn drop(&mut self) {
		self.handle.abort();
	}
}

/// Runs `work` with no owner. Its outcome is only logged.
pub fn detach<F, T, E>(label: &'static str, work: F) -> JoinHandle<()>
where
	F: Future<Output = Result<T, E>> + Send + 'static,
	T: Send + 'static,
	E: Display + Send + 'static,
{
	tokio::spawn(async move {
		match work.await {
			Ok(_) => debug!(task = label, "detached task finished"),
			Err(e) => warn!(task = label, error = %e, "detached task failed"),
		}
	})
}

/// Detached work that a short-lived host can still wait out before it
/// exits. Nothing here is aborted on drop.
#[derive(Clone, Default)]
pub struct Background {
	tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl Background {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn detach<F, T, E>(&self, label: &'static str, work: F)
	where
		F: Future<Output = Result<T, E>> + Send + 'static,
		T: Send + 'static,
		E: Display + Send + 'static,
	{
		let handle = detach(label, work);
		let mut tasks = lock(&self.tasks);
		tasks.retain(|h| !h.is_finished());
		tasks.push(handle);
	}

	pub fn active(&self) -> usize {
		lock(&self.tasks).iter().filter(|h| !h.is_finished()).count()
	}

	/// Waits for everything detached so far, including work detached while
	/// waiting.
	pub async fn settle(&self) {
		loop {
			let handles = std::mem::take(&mut *lock(&self.tasks));
			if handles.is_empty() {
				return;
			}
			for handle in handles {
				let _ = handle.await;
			}
		}
	}
}
