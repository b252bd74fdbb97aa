use std::io;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, trace, warn};

use super::sink::SearchEvent;
use super::state::{GateState, Phase};
use crate::engine::{CancelToken, Criteria, FilterEngine, FilterOutcome};
use crate::query::normalize;
use crate::store::EntryStore;

/// Commands understood by the background search worker.
#[derive(Debug)]
pub(crate) enum Command {
	/// Debounce, then filter for the text entered at `generation`.
	Search { generation: u64 },
	/// Filter the current text immediately and always publish.
	Refresh,
	/// Stop the worker thread.
	Shutdown,
}

/// State shared between the controller handle and its worker thread.
pub(crate) struct Shared<T> {
	pub(crate) store: Arc<EntryStore<T>>,
	pub(crate) engine: FilterEngine,
	pub(crate) criteria: RwLock<Criteria<T>>,
	pub(crate) state: Mutex<GateState>,
	/// Signalled on every text change and on shutdown.
	pub(crate) wake: Condvar,
	pub(crate) debounce: Duration,
	pub(crate) commands: Sender<Command>,
	/// Sent to while holding `state`, so event order follows state order.
	pub(crate) events: Sender<SearchEvent<T>>,
}

impl<T: Send + Sync + 'static> Shared<T> {
	pub(crate) fn lock_state(&self) -> MutexGuard<'_, GateState> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Flip to busy if currently idle.
	pub(crate) fn mark_busy(&self, state: &mut GateState) {
		if state.idle {
			state.idle = false;
			let _ = self.events.send(SearchEvent::Busy(true));
		}
	}

	/// Queue `command` for the worker. The controller stays busy until every
	/// queued command has been handled.
	pub(crate) fn submit(&self, state: &mut GateState, command: Command) {
		self.mark_busy(state);
		state.queued += 1;
		let _ = self.commands.send(command);
	}

	fn search(&self, generation: u64) {
		let mut state = self.lock_state();
		state.queued = state.queued.saturating_sub(1);
		if !state.is_current(generation) {
			trace!(generation, "search superseded before debounce");
			return;
		}

		if state.fresh {
			state.fresh = false;
		} else {
			state.phase = Phase::Debouncing;
			let (guard, _) = self
				.wake
				.wait_timeout_while(state, self.debounce, |state| state.is_current(generation))
				.unwrap_or_else(PoisonError::into_inner);
			state = guard;
			if !state.is_current(generation) {
				debug!(generation, "search superseded during debounce");
				return;
			}
		}

		let text = state.pending_text.clone();
		let token = CancelToken::new(generation);
		state.begin(token.clone(), false);
		drop(state);

		self.execute(&text, &token, false);
	}

	fn refresh(&self) {
		let mut state = self.lock_state();
		state.queued = state.queued.saturating_sub(1);
		if state.shutdown {
			return;
		}
		let text = state.pending_text.clone();
		let token = CancelToken::new(state.generation);
		state.begin(token.clone(), true);
		drop(state);

		self.execute(&text, &token, true);
	}

	fn execute(&self, text: &str, token: &CancelToken, forced: bool) {
		let generation = token.generation();
		let query = normalize(text);
		let snapshot = self.store.snapshot();
		let criteria = self
			.criteria
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.clone();
		trace!(generation, entries = snapshot.len(), forced, "filtering");

		let outcome = self.engine.run(&snapshot, &query, &criteria, token);

		let mut state = self.lock_state();
		state.active = None;
		state.searching = false;
		match outcome {
			Ok(FilterOutcome { results, failures }) => {
				if !failures.is_empty() {
					debug!(generation, failures = failures.len(), "search completed with excluded entries");
				}
				let _ = self.events.send(SearchEvent::Published {
					generation,
					results,
					forced,
				});
			}
			Err(err) if err.is_aborted() => debug!(generation, "search aborted"),
			Err(err) => warn!(generation, %err, "search failed"),
		}

		if state.generation == generation && state.queued == 0 {
			state.phase = Phase::Idle;
			state.abort_requested = false;
			if !state.idle {
				state.idle = true;
				let _ = self.events.send(SearchEvent::Busy(false));
			}
		} else {
			// More work is queued behind this run.
			state.phase = Phase::Debouncing;
		}
	}
}

pub(crate) fn spawn<T: Send + Sync + 'static>(
	shared: Arc<Shared<T>>,
	commands: Receiver<Command>,
) -> io::Result<JoinHandle<()>> {
	thread::Builder::new()
		.name("sift-search".to_string())
		.spawn(move || worker_loop(&shared, &commands))
}

fn worker_loop<T: Send + Sync + 'static>(shared: &Shared<T>, commands: &Receiver<Command>) {
	while let Ok(command) = commands.recv() {
		match command {
			Command::Search { generation } => shared.search(generation),
			Command::Refresh => shared.refresh(),
			Command::Shutdown => break,
		}
	}
	trace!("search worker stopped");
}
