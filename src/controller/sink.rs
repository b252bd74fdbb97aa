use std::sync::Arc;

use crate::engine::ResultSet;

/// Receives controller output on the UI thread.
pub trait SearchSink<T> {
	/// Replace the displayed list with `results`.
	fn result_published(&mut self, results: &ResultSet<T>);

	/// Toggle the busy indicator.
	fn busy_changed(&mut self, _busy: bool) {}

	/// The user picked `item`; `should_close` asks the host to dismiss the list.
	fn selection_committed(&mut self, _item: &Arc<T>, _should_close: bool) {}
}

/// Messages from the search worker to the UI thread.
pub(crate) enum SearchEvent<T> {
	Published {
		generation: u64,
		results: ResultSet<T>,
		/// Manual refreshes bypass the staleness check at publish time.
		forced: bool,
	},
	Busy(bool),
}
