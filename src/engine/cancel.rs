use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Generation-scoped cancellation flag shared between a run and its owner.
///
/// Workers check the token before taking each entry off the queue; setting
/// it never interrupts a predicate that is already executing.
#[derive(Debug, Clone)]
pub struct CancelToken {
	generation: u64,
	cancelled: Arc<AtomicBool>,
}

impl CancelToken {
	pub fn new(generation: u64) -> Self {
		Self {
			generation,
			cancelled: Arc::new(AtomicBool::new(false)),
		}
	}

	/// Token that is never cancelled by anyone but its holder.
	pub fn detached() -> Self {
		Self::new(0)
	}

	pub const fn generation(&self) -> u64 {
		self.generation
	}

	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::Release);
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::Acquire)
	}
}
