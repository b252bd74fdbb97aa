//! Incremental, cancelable filtering for searchable list widgets.
//!
//! Items are registered in an [`EntryStore`] by an [`ItemSource`]. A
//! [`SearchController`] turns keystrokes into debounced runs of the parallel
//! [`FilterEngine`] and hands finished [`ResultSet`]s to a [`SearchSink`] on
//! the caller's thread.

pub mod app_dirs;
pub mod controller;
pub mod engine;
pub mod error;
pub mod logging;
pub mod matchers;
pub mod memory;
pub mod query;
pub mod source;
pub mod store;

pub use controller::{
	DEFAULT_DEBOUNCE, Phase, Restored, SearchController, SearchControllerBuilder, SearchSink,
	SearchState,
};
pub use engine::{CancelToken, Comparator, Criteria, FilterEngine, FilterOutcome, Predicate, ResultSet};
pub use error::FilterError;
pub use memory::{InMemorySearchMemory, SearchMemory};
pub use query::{Query, normalize};
pub use source::{FilesystemOptions, FilesystemSource, ItemSource, LineSource, StaticSource};
pub use store::{Entry, EntryStore, ItemKind, Snapshot};
