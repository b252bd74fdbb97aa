//! Parallel filter-and-sort pass over a snapshot of entries.
//!
//! A run fans the snapshot out to a fixed pool of scoped worker threads that
//! pull entries from a shared cursor, collects the survivors in no particular
//! order, then restores a deterministic order: original insertion index
//! first, optionally refined by a caller supplied comparator through a
//! stable sort.

mod cancel;
mod results;

use std::cmp::Ordering;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use tracing::{debug, warn};

pub use cancel::CancelToken;
pub use results::ResultSet;

use crate::error::{FilterError, panic_message};
use crate::query::Query;
use crate::store::Entry;

/// Decides whether an item survives a query. Must be callable from any thread.
pub type Predicate<T> = Arc<dyn Fn(&T, &Query) -> anyhow::Result<bool> + Send + Sync>;

/// Orders two items for display.
pub type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// Caller supplied filtering and ordering behaviour.
///
/// Without a predicate every entry passes; without a comparator results keep
/// their insertion order.
pub struct Criteria<T> {
	predicate: Option<Predicate<T>>,
	comparator: Option<Comparator<T>>,
}

impl<T> Criteria<T> {
	pub fn new() -> Self {
		Self {
			predicate: None,
			comparator: None,
		}
	}

	/// Use a fallible predicate. Errors exclude the entry and are reported.
	#[must_use]
	pub fn with_predicate<F>(mut self, predicate: F) -> Self
	where
		F: Fn(&T, &Query) -> anyhow::Result<bool> + Send + Sync + 'static,
	{
		self.predicate = Some(Arc::new(predicate));
		self
	}

	/// Use an infallible predicate.
	#[must_use]
	pub fn with_filter<F>(self, filter: F) -> Self
	where
		F: Fn(&T, &Query) -> bool + Send + Sync + 'static,
	{
		self.with_predicate(move |item, query| Ok(filter(item, query)))
	}

	#[must_use]
	pub fn with_comparator<F>(mut self, comparator: F) -> Self
	where
		F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
	{
		self.comparator = Some(Arc::new(comparator));
		self
	}

	#[must_use]
	pub fn with_shared_predicate(mut self, predicate: Option<Predicate<T>>) -> Self {
		self.predicate = predicate;
		self
	}

	#[must_use]
	pub fn with_shared_comparator(mut self, comparator: Option<Comparator<T>>) -> Self {
		self.comparator = comparator;
		self
	}

	pub fn predicate(&self) -> Option<&Predicate<T>> {
		self.predicate.as_ref()
	}

	pub fn comparator(&self) -> Option<&Comparator<T>> {
		self.comparator.as_ref()
	}
}

impl<T> Default for Criteria<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> Clone for Criteria<T> {
	fn clone(&self) -> Self {
		Self {
			predicate: self.predicate.clone(),
			comparator: self.comparator.clone(),
		}
	}
}

/// Result of a completed run together with the per-entry faults it absorbed.
#[derive(Debug)]
pub struct FilterOutcome<T> {
	pub results: ResultSet<T>,
	pub failures: Vec<FilterError>,
}

/// Runs the filter pool. Holds no state between runs.
#[derive(Debug, Clone, Copy)]
pub struct FilterEngine {
	workers: NonZeroUsize,
}

impl Default for FilterEngine {
	fn default() -> Self {
		Self::with_workers(None)
	}
}

impl FilterEngine {
	pub fn new() -> Self {
		Self::default()
	}

	/// Engine with an explicit pool size. `None` or zero means one worker per
	/// available hardware thread.
	pub fn with_workers(workers: Option<usize>) -> Self {
		let workers = workers
			.and_then(NonZeroUsize::new)
			.unwrap_or_else(|| thread::available_parallelism().unwrap_or(NonZeroUsize::MIN));
		Self { workers }
	}

	pub fn workers(&self) -> usize {
		self.workers.get()
	}

	/// Filter `entries` against `query` and return the ordered survivors.
	///
	/// Returns [`FilterError::Aborted`] when `cancel` was set before the run
	/// finished; any survivors collected up to that point are dropped.
	pub fn run<T: Send + Sync>(
		&self,
		entries: &[Entry<T>],
		query: &Query,
		criteria: &Criteria<T>,
		cancel: &CancelToken,
	) -> Result<FilterOutcome<T>, FilterError> {
		if cancel.is_cancelled() {
			return Err(FilterError::Aborted);
		}

		let (mut survivors, mut failures) = match criteria.predicate() {
			Some(predicate) if !query.is_all() => self.filter(entries, query, predicate, cancel),
			_ => ((0..entries.len()).collect(), Vec::new()),
		};

		if cancel.is_cancelled() {
			debug!(
				generation = cancel.generation(),
				collected = survivors.len(),
				"filter run aborted"
			);
			return Err(FilterError::Aborted);
		}

		survivors.sort_by_key(|&position| entries[position].original_index());

		if let Some(comparator) = criteria.comparator() {
			if let Err(err) = order_with(entries, &mut survivors, comparator) {
				warn!(%err, "falling back to insertion order");
				failures.push(err);
			}
		}

		let items = survivors
			.into_iter()
			.map(|position| Arc::clone(entries[position].item()))
			.collect();
		Ok(FilterOutcome {
			results: ResultSet::new(items),
			failures,
		})
	}

	/// Evaluate the predicate across the pool. Returns positions into
	/// `entries` in completion order, plus the failures encountered.
	fn filter<T: Send + Sync>(
		&self,
		entries: &[Entry<T>],
		query: &Query,
		predicate: &Predicate<T>,
		cancel: &CancelToken,
	) -> (Vec<usize>, Vec<FilterError>) {
		if entries.is_empty() {
			return (Vec::new(), Vec::new());
		}

		let next = AtomicUsize::new(0);
		let survivors = Mutex::new(Vec::new());
		let failures = Mutex::new(Vec::new());
		let workers = self.workers.get().min(entries.len());

		thread::scope(|scope| {
			for _ in 0..workers {
				scope.spawn(|| {
					let mut passed = Vec::new();
					let mut failed = Vec::new();
					loop {
						if cancel.is_cancelled() {
							break;
						}
						let position = next.fetch_add(1, AtomicOrdering::Relaxed);
						let Some(entry) = entries.get(position) else {
							break;
						};
						match evaluate(predicate, entry, query) {
							Ok(true) => passed.push(position),
							Ok(false) => {}
							Err(err) => {
								warn!(%err, "entry excluded");
								failed.push(err);
							}
						}
					}
					survivors
						.lock()
						.unwrap_or_else(PoisonError::into_inner)
						.extend(passed);
					failures
						.lock()
						.unwrap_or_else(PoisonError::into_inner)
						.extend(failed);
				});
			}
		});

		(
			survivors.into_inner().unwrap_or_else(PoisonError::into_inner),
			failures.into_inner().unwrap_or_else(PoisonError::into_inner),
		)
	}
}

fn evaluate<T>(predicate: &Predicate<T>, entry: &Entry<T>, query: &Query) -> Result<bool, FilterError> {
	let item: &T = entry.item();
	match panic::catch_unwind(AssertUnwindSafe(|| (**predicate)(item, query))) {
		Ok(Ok(keep)) => Ok(keep),
		Ok(Err(err)) => Err(FilterError::predicate(entry.original_index(), format!("{err:#}"))),
		Err(payload) => Err(FilterError::predicate(
			entry.original_index(),
			panic_message(payload.as_ref()),
		)),
	}
}

/// Stable sort of `survivors` by `comparator`, on top of insertion order.
///
/// The standard sort may panic when it detects an inconsistent comparator;
/// the survivors are then put back into insertion order.
fn order_with<T>(
	entries: &[Entry<T>],
	survivors: &mut [usize],
	comparator: &Comparator<T>,
) -> Result<(), FilterError> {
	let sorted = panic::catch_unwind(AssertUnwindSafe(|| {
		survivors.sort_by(|&a, &b| {
			let left: &T = entries[a].item();
			let right: &T = entries[b].item();
			(**comparator)(left, right)
		});
	}));

	match sorted {
		Ok(()) => Ok(()),
		Err(payload) => {
			survivors.sort_by_key(|&position| entries[position].original_index());
			Err(FilterError::ComparatorInconsistency {
				message: panic_message(payload.as_ref()),
			})
		}
	}
}
