use std::fmt;
use std::sync::Arc;

/// Ordered items produced by one completed search run.
///
/// Cloning is cheap; consumers replace their whole list with a new set
/// instead of patching it.
pub struct ResultSet<T> {
	items: Arc<[Arc<T>]>,
}

impl<T> ResultSet<T> {
	pub fn new(items: Vec<Arc<T>>) -> Self {
		Self {
			items: items.into(),
		}
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	pub fn get(&self, index: usize) -> Option<&Arc<T>> {
		self.items.get(index)
	}

	pub fn first(&self) -> Option<&Arc<T>> {
		self.items.first()
	}

	pub fn iter(&self) -> std::slice::Iter<'_, Arc<T>> {
		self.items.iter()
	}

	pub fn as_slice(&self) -> &[Arc<T>] {
		&self.items
	}
}

impl<T: Clone> ResultSet<T> {
	/// Owned copies of the items, in result order.
	pub fn to_vec(&self) -> Vec<T> {
		self.items.iter().map(|item| T::clone(item)).collect()
	}
}

impl<T> Default for ResultSet<T> {
	fn default() -> Self {
		Self::new(Vec::new())
	}
}

impl<T> Clone for ResultSet<T> {
	fn clone(&self) -> Self {
		Self {
			items: Arc::clone(&self.items),
		}
	}
}

impl<T: fmt::Debug> fmt::Debug for ResultSet<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.items.iter()).finish()
	}
}

impl<'a, T> IntoIterator for &'a ResultSet<T> {
	type Item = &'a Arc<T>;
	type IntoIter = std::slice::Iter<'a, Arc<T>>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}
