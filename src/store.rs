//! Thread-safe registry of candidate items.
//!
//! Every item is wrapped in an [`Entry`] that remembers the position it was
//! inserted at. That position never changes for the lifetime of the entry and
//! is the baseline ordering key for search results.

use std::any::TypeId;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::trace;

/// An item plus its immutable insertion-order index.
pub struct Entry<T> {
	item: Arc<T>,
	original_index: usize,
}

impl<T> Entry<T> {
	pub fn item(&self) -> &Arc<T> {
		&self.item
	}

	pub fn original_index(&self) -> usize {
		self.original_index
	}
}

impl<T> Clone for Entry<T> {
	fn clone(&self) -> Self {
		Self {
			item: Arc::clone(&self.item),
			original_index: self.original_index,
		}
	}
}

impl<T: fmt::Debug> fmt::Debug for Entry<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Entry")
			.field("item", &self.item)
			.field("original_index", &self.original_index)
			.finish()
	}
}

/// Identifies the type of items a store holds.
///
/// The name doubles as the key under which per-type search memory is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemKind {
	id: TypeId,
	name: &'static str,
}

impl ItemKind {
	pub fn of<T: 'static>() -> Self {
		Self {
			id: TypeId::of::<T>(),
			name: std::any::type_name::<T>(),
		}
	}

	pub fn id(&self) -> TypeId {
		self.id
	}

	pub fn name(&self) -> &'static str {
		self.name
	}
}

/// Immutable view of the store contents at one point in time.
pub type Snapshot<T> = Arc<[Entry<T>]>;

struct StoreInner<T> {
	entries: Vec<Entry<T>>,
	declared: Option<ItemKind>,
	/// Last snapshot handed out, reused until the next mutation.
	snapshot: Option<Snapshot<T>>,
}

impl<T: 'static> StoreInner<T> {
	fn push(&mut self, item: Arc<T>) -> usize {
		let original_index = self.entries.len();
		self.entries.push(Entry {
			item,
			original_index,
		});
		original_index
	}

	fn declare(&mut self) {
		if self.declared.is_none() {
			self.declared = Some(ItemKind::of::<T>());
		}
	}
}

/// Ordered, lock-protected collection of [`Entry`] values.
///
/// `clear`, `add`, `add_many` and `snapshot` are mutually exclusive, so a
/// snapshot never observes half of a batch.
pub struct EntryStore<T> {
	inner: Mutex<StoreInner<T>>,
}

impl<T> Default for EntryStore<T> {
	fn default() -> Self {
		Self {
			inner: Mutex::new(StoreInner {
				entries: Vec::new(),
				declared: None,
				snapshot: None,
			}),
		}
	}
}

impl<T: Send + Sync + 'static> EntryStore<T> {
	pub fn new() -> Self {
		Self::default()
	}

	fn lock(&self) -> MutexGuard<'_, StoreInner<T>> {
		// A panic while holding the lock cannot leave the vector half-pushed,
		// so a poisoned store is still consistent.
		self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	/// Remove every entry. The next insertion starts again at index 0.
	pub fn clear(&self) {
		let mut inner = self.lock();
		inner.entries.clear();
		inner.snapshot = None;
		trace!("entry store cleared");
	}

	/// Append one item, returning its original index.
	pub fn add(&self, item: T) -> usize {
		self.add_arc(Arc::new(item))
	}

	/// Append an already shared item, returning its original index.
	pub fn add_arc(&self, item: Arc<T>) -> usize {
		let mut inner = self.lock();
		inner.declare();
		inner.snapshot = None;
		inner.push(item)
	}

	/// Append a batch of items with contiguous original indices.
	///
	/// The items are collected before the lock is taken, then inserted in one
	/// critical section. Returns the index range assigned to the batch.
	pub fn add_many<I>(&self, items: I) -> std::ops::Range<usize>
	where
		I: IntoIterator<Item = T>,
	{
		let items: Vec<Arc<T>> = items.into_iter().map(Arc::new).collect();
		let mut inner = self.lock();
		let start = inner.entries.len();
		if items.is_empty() {
			return start..start;
		}

		inner.declare();
		inner.snapshot = None;
		inner.entries.reserve(items.len());
		for item in items {
			inner.push(item);
		}
		let end = inner.entries.len();
		trace!(start, end, "entry batch appended");
		start..end
	}

	/// Copy of all current entries, safe to iterate without holding the lock.
	pub fn snapshot(&self) -> Snapshot<T> {
		let mut inner = self.lock();
		if let Some(snapshot) = &inner.snapshot {
			return Arc::clone(snapshot);
		}
		let snapshot: Snapshot<T> = inner.entries.as_slice().into();
		inner.snapshot = Some(Arc::clone(&snapshot));
		snapshot
	}

	pub fn len(&self) -> usize {
		self.lock().entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.lock().entries.is_empty()
	}

	/// The item type recorded by the first insertion, if any.
	///
	/// Clearing the store keeps the declared type.
	pub fn declared_type(&self) -> Option<ItemKind> {
		self.lock().declared
	}
}
