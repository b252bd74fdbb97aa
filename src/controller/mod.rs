//! Debounced, single-flight driver for the filter engine.
//!
//! The controller sits between a text input and a list view. Keystrokes go in
//! through [`SearchController::set_text`]; a dedicated worker thread waits out
//! the debounce window, discards requests that were superseded in the
//! meantime and runs the [`FilterEngine`]. Results travel back over a channel
//! and are applied on the UI thread by [`SearchController::pump`], which also
//! drops any result that is older than the latest keystroke.

mod sink;
mod state;
#[cfg(test)]
mod tests;
mod worker;

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{trace, warn};

pub use sink::SearchSink;
pub(crate) use sink::SearchEvent;
pub use state::{Phase, SearchState};

use crate::engine::{Criteria, FilterEngine, ResultSet};
use crate::error::panic_message;
use crate::memory::SearchMemory;
use crate::source::ItemSource;
use crate::store::{EntryStore, ItemKind};
use state::GateState;
use worker::{Command, Shared};

/// Debounce window applied to every search but the first.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

/// Search text and scroll position restored by [`SearchController::attach`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Restored {
	pub search_text: Option<String>,
	pub scroll_offset: Option<f64>,
}

/// Configures and starts a [`SearchController`].
pub struct SearchControllerBuilder<T> {
	store: Option<Arc<EntryStore<T>>>,
	criteria: Criteria<T>,
	debounce: Duration,
	workers: Option<usize>,
	memory: Option<Arc<dyn SearchMemory>>,
}

impl<T: Send + Sync + 'static> Default for SearchControllerBuilder<T> {
	fn default() -> Self {
		Self {
			store: None,
			criteria: Criteria::new(),
			debounce: DEFAULT_DEBOUNCE,
			workers: None,
			memory: None,
		}
	}
}

impl<T: Send + Sync + 'static> SearchControllerBuilder<T> {
	/// Share an existing store instead of creating an empty one.
	#[must_use]
	pub fn store(mut self, store: Arc<EntryStore<T>>) -> Self {
		self.store = Some(store);
		self
	}

	#[must_use]
	pub fn criteria(mut self, criteria: Criteria<T>) -> Self {
		self.criteria = criteria;
		self
	}

	#[must_use]
	pub fn debounce(mut self, debounce: Duration) -> Self {
		self.debounce = debounce;
		self
	}

	/// Filter pool size; `None` uses the available hardware parallelism.
	#[must_use]
	pub fn workers(mut self, workers: Option<usize>) -> Self {
		self.workers = workers;
		self
	}

	#[must_use]
	pub fn memory(mut self, memory: Arc<dyn SearchMemory>) -> Self {
		self.memory = Some(memory);
		self
	}

	/// Spawn the worker thread and return the controller handle.
	pub fn build(self) -> Result<SearchController<T>> {
		let (command_tx, command_rx) = mpsc::channel();
		let (event_tx, event_rx) = mpsc::channel();

		let shared = Arc::new(Shared {
			store: self.store.unwrap_or_default(),
			engine: FilterEngine::with_workers(self.workers),
			criteria: RwLock::new(self.criteria),
			state: Mutex::new(GateState::new()),
			wake: Condvar::new(),
			debounce: self.debounce,
			commands: command_tx,
			events: event_tx,
		});
		let worker = worker::spawn(Arc::clone(&shared), command_rx)
			.context("failed to spawn search worker thread")?;

		Ok(SearchController {
			shared,
			events: Mutex::new(event_rx),
			results: Mutex::new(ResultSet::default()),
			publishing: AtomicBool::new(false),
			memory: self.memory,
			worker: Some(worker),
		})
	}
}

/// Handle owned by the list widget. Dropping it stops the worker.
pub struct SearchController<T: Send + Sync + 'static> {
	shared: Arc<Shared<T>>,
	events: Mutex<Receiver<SearchEvent<T>>>,
	/// Last result applied through [`SearchController::pump`].
	results: Mutex<ResultSet<T>>,
	/// Set while a result is being applied to the sink.
	publishing: AtomicBool,
	memory: Option<Arc<dyn SearchMemory>>,
	worker: Option<JoinHandle<()>>,
}

impl<T: Send + Sync + 'static> SearchController<T> {
	pub fn builder() -> SearchControllerBuilder<T> {
		SearchControllerBuilder::default()
	}

	pub fn store(&self) -> &Arc<EntryStore<T>> {
		&self.shared.store
	}

	pub fn state(&self) -> SearchState {
		self.shared.lock_state().snapshot()
	}

	/// The most recently published results.
	pub fn results(&self) -> ResultSet<T> {
		self.results
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
	}

	/// Replace the predicate and comparator. Takes effect on the next run.
	pub fn set_criteria(&self, criteria: Criteria<T>) {
		*self
			.shared
			.criteria
			.write()
			.unwrap_or_else(PoisonError::into_inner) = criteria;
	}

	/// Record new search text and schedule a debounced search for it.
	///
	/// Any in-flight keystroke run is asked to stop; its result will never be
	/// published.
	pub fn set_text(&self, text: impl Into<String>) {
		let mut state = self.shared.lock_state();
		state.generation = state.generation.wrapping_add(1);
		let generation = state.generation;
		state.pending_text = text.into();
		if state.abort_active() {
			trace!(generation, "aborting superseded run");
		}
		if state.phase == Phase::Idle {
			state.phase = Phase::Debouncing;
		}
		self.shared.submit(&mut state, Command::Search { generation });
		drop(state);
		self.shared.wake.notify_all();
	}

	/// Re-run the current text immediately, without debounce or staleness
	/// checks. The result is always published.
	pub fn refresh(&self) {
		let mut state = self.shared.lock_state();
		self.shared.submit(&mut state, Command::Refresh);
	}

	/// Populate the store from `source` on a background thread, then refresh.
	///
	/// The store is cleared first. The returned handle yields the number of
	/// entries loaded. A source that fails or panics is logged, reported through
	/// the handle, and the refresh still runs over whatever it added.
	pub fn activate(&self, source: Arc<dyn ItemSource<T>>) -> Result<JoinHandle<Result<usize>>> {
		{
			// Counts the refresh sent once loading finishes.
			let mut state = self.shared.lock_state();
			self.shared.mark_busy(&mut state);
			state.queued += 1;
		}

		let shared = Arc::clone(&self.shared);
		let spawned = std::thread::Builder::new()
			.name("sift-source".to_string())
			.spawn(move || {
				shared.store.clear();
				let loaded = panic::catch_unwind(AssertUnwindSafe(|| source.load(&shared.store)))
					.unwrap_or_else(|payload| {
						Err(anyhow!("item source panicked: {}", panic_message(payload.as_ref())))
					});
				if let Err(err) = &loaded {
					warn!(error = %format!("{err:#}"), "item source failed");
				}
				let _ = shared.commands.send(Command::Refresh);
				loaded.map(|()| shared.store.len())
			});
		if spawned.is_err() {
			let _ = self.shared.commands.send(Command::Refresh);
		}
		spawned.context("failed to spawn item source thread")
	}

	/// Restore the remembered search for this item type and start searching.
	///
	/// The first search after attaching skips the debounce window.
	pub fn attach(&self) -> Restored {
		self.shared.lock_state().fresh = true;

		let Some(memory) = &self.memory else {
			return Restored::default();
		};
		let kind = self.kind();
		let restored = Restored {
			search_text: memory.load_last_search(kind.name()),
			scroll_offset: memory.load_scroll_offset(kind.name()),
		};
		if let Some(text) = &restored.search_text {
			self.set_text(text.clone());
		}
		restored
	}

	/// Remember the current search text and scroll position for this item type.
	pub fn detach(&self, scroll_offset: Option<f64>) {
		let Some(memory) = &self.memory else {
			return;
		};
		let kind = self.kind();
		let text = self.shared.lock_state().pending_text.clone();
		memory.save_last_search(kind.name(), &text);
		if let Some(offset) = scroll_offset {
			memory.save_scroll_offset(kind.name(), offset);
		}
	}

	fn kind(&self) -> ItemKind {
		self.shared
			.store
			.declared_type()
			.unwrap_or_else(ItemKind::of::<T>)
	}

	/// Apply every pending event to `sink` without blocking. Returns the
	/// number of events handled.
	pub fn pump(&self, sink: &mut dyn SearchSink<T>) -> usize {
		let events = self.lock_events();
		let mut handled = 0;
		while let Ok(event) = events.try_recv() {
			self.dispatch(event, sink);
			handled += 1;
		}
		handled
	}

	/// Whether the worker thread is still accepting commands.
	pub fn is_running(&self) -> bool {
		self.worker
			.as_ref()
			.is_some_and(|worker| !worker.is_finished())
	}

	/// Apply events until the controller is idle or `timeout` elapses.
	/// Returns whether the controller reached idle. Returns `false` at once
	/// when the worker has stopped, since it can no longer become idle.
	pub fn pump_until_idle(&self, sink: &mut dyn SearchSink<T>, timeout: Duration) -> bool {
		let deadline = Instant::now() + timeout;
		let events = self.lock_events();
		loop {
			// Everything sent before idle was observed is already queued.
			let idle = self.shared.lock_state().idle;
			while let Ok(event) = events.try_recv() {
				self.dispatch(event, sink);
			}
			if idle {
				return true;
			}
			if !self.is_running() {
				warn!("search worker stopped before reaching idle");
				return false;
			}

			let remaining = deadline.saturating_duration_since(Instant::now());
			if remaining.is_zero() {
				return false;
			}
			match events.recv_timeout(remaining) {
				Ok(event) => self.dispatch(event, sink),
				Err(RecvTimeoutError::Timeout) => {}
				Err(RecvTimeoutError::Disconnected) => return false,
			}
		}
	}

	/// Forward a user selection unless a result is currently being applied.
	///
	/// Returns `false` when the notification was suppressed.
	pub fn commit_selection(
		&self,
		sink: &mut dyn SearchSink<T>,
		item: &Arc<T>,
		should_close: bool,
	) -> bool {
		if self.publishing.load(AtomicOrdering::Acquire) {
			trace!("selection change suppressed while publishing");
			return false;
		}
		sink.selection_committed(item, should_close);
		true
	}

	fn lock_events(&self) -> MutexGuard<'_, Receiver<SearchEvent<T>>> {
		self.events.lock().unwrap_or_else(PoisonError::into_inner)
	}

	fn dispatch(&self, event: SearchEvent<T>, sink: &mut dyn SearchSink<T>) {
		match event {
			SearchEvent::Published {
				generation,
				results,
				forced,
			} => {
				if !forced && generation != self.shared.lock_state().generation {
					trace!(generation, "dropping superseded result");
					return;
				}
				*self.results.lock().unwrap_or_else(PoisonError::into_inner) = results.clone();
				let _publishing = PublishGuard::new(&self.publishing);
				sink.result_published(&results);
			}
			SearchEvent::Busy(busy) => sink.busy_changed(busy),
		}
	}
}

impl<T: Send + Sync + 'static> Drop for SearchController<T> {
	fn drop(&mut self) {
		{
			let mut state = self.shared.lock_state();
			state.shutdown = true;
			if let Some(run) = &state.active {
				run.token.cancel();
			}
		}
		self.shared.wake.notify_all();
		let _ = self.shared.commands.send(Command::Shutdown);
		if let Some(worker) = self.worker.take() {
			let _ = worker.join();
		}
	}
}

/// Suppresses selection notifications for as long as it is alive.
struct PublishGuard<'a> {
	flag: &'a AtomicBool,
}

impl<'a> PublishGuard<'a> {
	fn new(flag: &'a AtomicBool) -> Self {
		flag.store(true, AtomicOrdering::Release);
		Self { flag }
	}
}

impl Drop for PublishGuard<'_> {
	fn drop(&mut self) {
		self.flag.store(false, AtomicOrdering::Release);
	}
}
