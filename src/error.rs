use thiserror::Error;

/// Failures observed while filtering and ordering one search run.
///
/// None of these are fatal to the controller. Predicate failures exclude a
/// single entry, comparator inconsistencies fall back to insertion order and
/// aborted runs are silently discarded.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilterError {
	/// The predicate returned an error or panicked for one entry.
	#[error("predicate failed for entry {index}: {message}")]
	Predicate { index: usize, message: String },

	/// The comparator does not describe a consistent order.
	#[error("comparator is not a consistent order: {message}")]
	ComparatorInconsistency { message: String },

	/// The run was cancelled because a newer search superseded it.
	#[error("search run was superseded before it completed")]
	Aborted,
}

impl FilterError {
	pub fn predicate(index: usize, message: impl Into<String>) -> Self {
		Self::Predicate {
			index,
			message: message.into(),
		}
	}

	/// Whether this is the expected cancellation outcome rather than a fault.
	#[must_use]
	pub fn is_aborted(&self) -> bool {
		matches!(self, Self::Aborted)
	}
}

/// Render a caught panic payload as text.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		(*message).to_string()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"panic with non-string payload".to_string()
	}
}
