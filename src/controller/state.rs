use crate::engine::CancelToken;

/// Coarse lifecycle of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	/// No search is pending and the last result has been published.
	Idle,
	/// Work is queued: waiting out the debounce window or behind another run.
	Debouncing,
	/// A filter run is executing.
	Filtering,
}

/// Point-in-time view of the controller's search bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchState {
	pub phase: Phase,
	/// A filter run is active.
	pub searching: bool,
	/// Nothing is pending; the busy indicator should be off.
	pub idle: bool,
	/// The active run has been asked to stop.
	pub abort_requested: bool,
	/// Most recent text entered by the user.
	pub pending_text: String,
	/// Incremented on every text change.
	pub generation: u64,
}

pub(crate) struct ActiveRun {
	pub(crate) token: CancelToken,
	/// Manual refreshes run to completion regardless of typing.
	pub(crate) forced: bool,
}

pub(crate) struct GateState {
	pub(crate) phase: Phase,
	pub(crate) searching: bool,
	pub(crate) idle: bool,
	pub(crate) abort_requested: bool,
	pub(crate) pending_text: String,
	pub(crate) generation: u64,
	/// Commands sent to the worker and not yet picked up.
	pub(crate) queued: usize,
	/// The next search skips the debounce window.
	pub(crate) fresh: bool,
	pub(crate) shutdown: bool,
	pub(crate) active: Option<ActiveRun>,
}

impl GateState {
	pub(crate) fn new() -> Self {
		Self {
			phase: Phase::Idle,
			searching: false,
			idle: true,
			abort_requested: false,
			pending_text: String::new(),
			generation: 0,
			queued: 0,
			fresh: true,
			shutdown: false,
			active: None,
		}
	}

	/// Whether a search issued for `generation` is still the latest request.
	pub(crate) fn is_current(&self, generation: u64) -> bool {
		!self.shutdown && self.generation == generation
	}

	/// Ask the active keystroke run to stop. Returns whether one was running.
	pub(crate) fn abort_active(&mut self) -> bool {
		let aborted = match &self.active {
			Some(run) if !run.forced => {
				run.token.cancel();
				true
			}
			_ => false,
		};
		if aborted {
			self.abort_requested = true;
		}
		aborted
	}

	pub(crate) fn begin(&mut self, token: CancelToken, forced: bool) {
		self.phase = Phase::Filtering;
		self.searching = true;
		self.abort_requested = false;
		self.active = Some(ActiveRun { token, forced });
	}

	pub(crate) fn snapshot(&self) -> SearchState {
		SearchState {
			phase: self.phase,
			searching: self.searching,
			idle: self.idle,
			abort_requested: self.abort_requested,
			pending_text: self.pending_text.clone(),
			generation: self.generation,
		}
	}
}
