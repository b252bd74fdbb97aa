//! Per-item-type memory of the last search text and scroll position.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Key-value store that outlives individual list widgets.
///
/// Keys are item type names as reported by
/// [`ItemKind::name`](crate::store::ItemKind::name).
pub trait SearchMemory: Send + Sync {
	fn load_last_search(&self, kind: &str) -> Option<String>;
	fn save_last_search(&self, kind: &str, text: &str);
	fn load_scroll_offset(&self, kind: &str) -> Option<f64>;
	fn save_scroll_offset(&self, kind: &str, offset: f64);
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Remembered {
	last_search: Option<String>,
	scroll_offset: Option<f64>,
}

/// Process-lifetime [`SearchMemory`] backed by a hash map.
#[derive(Debug, Default)]
pub struct InMemorySearchMemory {
	entries: Mutex<HashMap<String, Remembered>>,
}

impl InMemorySearchMemory {
	pub fn new() -> Self {
		Self::default()
	}

	fn with_entry<R>(&self, kind: &str, f: impl FnOnce(&mut Remembered) -> R) -> R {
		let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
		f(entries.entry(kind.to_string()).or_default())
	}

	fn read<R>(&self, kind: &str, f: impl FnOnce(&Remembered) -> Option<R>) -> Option<R> {
		let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
		entries.get(kind).and_then(f)
	}
}

impl SearchMemory for InMemorySearchMemory {
	fn load_last_search(&self, kind: &str) -> Option<String> {
		self.read(kind, |entry| entry.last_search.clone())
	}

	fn save_last_search(&self, kind: &str, text: &str) {
		self.with_entry(kind, |entry| entry.last_search = Some(text.to_string()));
	}

	fn load_scroll_offset(&self, kind: &str) -> Option<f64> {
		self.read(kind, |entry| entry.scroll_offset)
	}

	fn save_scroll_offset(&self, kind: &str, offset: f64) {
		self.with_entry(kind, |entry| entry.scroll_offset = Some(offset));
	}
}
