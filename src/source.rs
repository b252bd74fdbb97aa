//! Producers that populate an [`EntryStore`] when a list is activated.

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use anyhow::{Context, Result, ensure};
use ignore::{DirEntry, Error as IgnoreError, WalkBuilder, WalkState};
use tracing::{debug, trace, warn};

use crate::store::EntryStore;

const MIN_BATCH_SIZE: usize = 32;
const MAX_BATCH_SIZE: usize = 1_024;

/// Supplies the candidate items of a list.
///
/// `load` runs once per activation, off the UI thread. Implementations may
/// add items in several batches; the store is cleared beforehand.
pub trait ItemSource<T>: Send + Sync {
	fn load(&self, store: &EntryStore<T>) -> Result<()>;
}

impl<T, F> ItemSource<T> for F
where
	F: Fn(&EntryStore<T>) -> Result<()> + Send + Sync,
{
	fn load(&self, store: &EntryStore<T>) -> Result<()> {
		self(store)
	}
}

/// A fixed list of items, re-added on every activation.
#[derive(Debug, Clone)]
pub struct StaticSource<T> {
	items: Vec<T>,
}

impl<T> StaticSource<T> {
	pub fn new(items: impl IntoIterator<Item = T>) -> Self {
		Self {
			items: items.into_iter().collect(),
		}
	}
}

impl<T> ItemSource<T> for StaticSource<T>
where
	T: Clone + Send + Sync + 'static,
{
	fn load(&self, store: &EntryStore<T>) -> Result<()> {
		store.add_many(self.items.iter().cloned());
		Ok(())
	}
}

/// Non-empty lines read from a reader. The reader is consumed by the first
/// activation; later activations add nothing.
pub struct LineSource {
	reader: Mutex<Option<Box<dyn BufRead + Send>>>,
}

impl LineSource {
	pub fn new(reader: impl BufRead + Send + 'static) -> Self {
		Self {
			reader: Mutex::new(Some(Box::new(reader))),
		}
	}
}

impl ItemSource<String> for LineSource {
	fn load(&self, store: &EntryStore<String>) -> Result<()> {
		let Some(mut reader) = self
			.reader
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.take()
		else {
			return Ok(());
		};

		let mut batcher = Batcher::new(store);
		let mut buf = Vec::new();
		let mut line_number = 0usize;
		loop {
			buf.clear();
			match reader.read_until(b'\n', &mut buf) {
				Ok(0) => break,
				Ok(_) => {}
				Err(err) => {
					// Lines read so far stay searchable.
					batcher.finish();
					return Err(err)
						.with_context(|| format!("failed to read input line {}", line_number + 1));
				}
			}
			line_number += 1;

			let bytes = trim_line_ending(&buf);
			if bytes.is_empty() {
				continue;
			}
			let line = match std::str::from_utf8(bytes) {
				Ok(line) => line.to_string(),
				Err(err) => {
					warn!(line = line_number, %err, "input line is not valid UTF-8");
					String::from_utf8_lossy(bytes).into_owned()
				}
			};
			batcher.push(line);
		}
		batcher.finish();
		Ok(())
	}
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
	let line = line.strip_suffix(b"\n").unwrap_or(line);
	line.strip_suffix(b"\r").unwrap_or(line)
}

/// Options controlling which files a [`FilesystemSource`] lists.
#[derive(Debug, Clone)]
pub struct FilesystemOptions {
	pub include_hidden: bool,
	pub follow_symlinks: bool,
	pub respect_ignore_files: bool,
	pub threads: Option<usize>,
	pub max_depth: Option<usize>,
	pub global_ignores: Vec<String>,
}

impl Default for FilesystemOptions {
	fn default() -> Self {
		Self {
			include_hidden: false,
			follow_symlinks: false,
			respect_ignore_files: true,
			threads: None,
			max_depth: None,
			global_ignores: vec![
				".git".to_string(),
				"node_modules".to_string(),
				"target".to_string(),
			],
		}
	}
}

/// Files below a root directory, as `/`-separated relative paths.
#[derive(Debug, Clone)]
pub struct FilesystemSource {
	root: PathBuf,
	options: FilesystemOptions,
}

impl FilesystemSource {
	pub fn new(root: impl Into<PathBuf>, options: FilesystemOptions) -> Self {
		Self {
			root: root.into(),
			options,
		}
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	fn walk(&self, tx: mpsc::Sender<String>) {
		let threads = self
			.options
			.threads
			.filter(|threads| *threads > 0)
			.unwrap_or_else(|| thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get));
		let root = Arc::new(self.root.clone());
		let global_ignores = Arc::new(self.options.global_ignores.clone());

		WalkBuilder::new(self.root.as_path())
			.hidden(!self.options.include_hidden)
			.follow_links(self.options.follow_symlinks)
			.git_ignore(self.options.respect_ignore_files)
			.git_global(self.options.respect_ignore_files)
			.git_exclude(self.options.respect_ignore_files)
			.ignore(self.options.respect_ignore_files)
			.parents(true)
			.threads(threads)
			.max_depth(self.options.max_depth)
			.build_parallel()
			.run(|| {
				let sender = tx.clone();
				let root = Arc::clone(&root);
				let global_ignores = Arc::clone(&global_ignores);
				Box::new(move |entry: Result<DirEntry, IgnoreError>| {
					let entry = match entry {
						Ok(entry) => entry,
						Err(err) => {
							debug!(%err, "skipping unreadable path");
							return WalkState::Continue;
						}
					};
					if !entry.file_type().is_some_and(|kind| kind.is_file()) {
						return WalkState::Continue;
					}

					let path = entry.path();
					let relative = path.strip_prefix(root.as_path()).unwrap_or(path);
					let ignored = relative.components().any(|component| {
						component
							.as_os_str()
							.to_str()
							.is_some_and(|name| global_ignores.iter().any(|ignore| ignore == name))
					});
					if ignored {
						return WalkState::Continue;
					}

					let display = relative.to_string_lossy().replace('\\', "/");
					if sender.send(display).is_err() {
						return WalkState::Quit;
					}
					WalkState::Continue
				})
			});
	}
}

impl ItemSource<String> for FilesystemSource {
	fn load(&self, store: &EntryStore<String>) -> Result<()> {
		ensure!(
			self.root.is_dir(),
			"search root {} is not a directory",
			self.root.display()
		);

		let (tx, rx) = mpsc::channel();
		thread::scope(|scope| {
			scope.spawn(move || self.walk(tx));

			let mut batcher = Batcher::new(store);
			for path in rx {
				batcher.push(path);
			}
			batcher.finish();
		});
		Ok(())
	}
}

/// Groups items into `add_many` calls, growing batches as the store fills.
struct Batcher<'a, T> {
	store: &'a EntryStore<T>,
	pending: Vec<T>,
	loaded: usize,
}

impl<'a, T: Send + Sync + 'static> Batcher<'a, T> {
	fn new(store: &'a EntryStore<T>) -> Self {
		Self {
			store,
			pending: Vec::new(),
			loaded: 0,
		}
	}

	fn push(&mut self, item: T) {
		self.pending.push(item);
		if self.pending.len() >= batch_size_for(self.loaded) {
			self.flush();
		}
	}

	fn flush(&mut self) {
		if self.pending.is_empty() {
			return;
		}
		let batch = std::mem::take(&mut self.pending);
		self.loaded += batch.len();
		let range = self.store.add_many(batch);
		trace!(start = range.start, end = range.end, "source batch loaded");
	}

	fn finish(mut self) {
		self.flush();
	}
}

fn batch_size_for(loaded: usize) -> usize {
	if loaded < 1_024 {
		MIN_BATCH_SIZE
	} else if loaded < 16_384 {
		256
	} else {
		MAX_BATCH_SIZE
	}
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeSet;
	use std::fs;
	use std::io::{self, BufReader, Cursor, Read};

	use super::*;

	fn items(store: &EntryStore<String>) -> Vec<String> {
		store
			.snapshot()
			.iter()
			.map(|entry| entry.item().as_ref().clone())
			.collect()
	}

	#[test]
	fn static_source_adds_items_in_order() {
		let store = EntryStore::new();
		StaticSource::new(["b", "a"]).load(&store).unwrap();
		let snapshot = store.snapshot();
		let loaded: Vec<&str> = snapshot.iter().map(|entry| **entry.item()).collect();
		assert_eq!(loaded, vec!["b", "a"]);
	}

	#[test]
	fn closures_act_as_sources() {
		let store = EntryStore::new();
		let source = |store: &EntryStore<u32>| -> Result<()> {
			store.add(7);
			store.add_many([8, 9]);
			Ok(())
		};
		source.load(&store).unwrap();
		assert_eq!(store.len(), 3);
	}

	#[test]
	fn line_source_skips_blank_lines_and_is_consumed_once() {
		let source = LineSource::new(Cursor::new("alpha\r\n\nbeta\ngamma\n"));
		let store = EntryStore::new();
		source.load(&store).unwrap();
		assert_eq!(items(&store), vec!["alpha", "beta", "gamma"]);

		store.clear();
		source.load(&store).unwrap();
		assert!(store.is_empty());
	}

	#[test]
	fn line_source_keeps_lines_that_are_not_utf8() {
		let mut input: Vec<u8> = (0..10).flat_map(|n| format!("line {n}\n").into_bytes()).collect();
		input.extend_from_slice(b"bad \xff\xfe\n");
		input.extend_from_slice(b"after\n");

		let store = EntryStore::new();
		LineSource::new(Cursor::new(input)).load(&store).unwrap();

		let loaded = items(&store);
		assert_eq!(loaded.len(), 12);
		assert_eq!(loaded[0], "line 0");
		assert_eq!(loaded[9], "line 9");
		assert!(loaded[10].starts_with("bad "));
		assert!(loaded[10].contains(char::REPLACEMENT_CHARACTER));
		assert_eq!(loaded[11], "after");
	}

	struct Unplugged;

	impl Read for Unplugged {
		fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
			Err(io::Error::other("device unplugged"))
		}
	}

	#[test]
	fn line_source_read_error_keeps_earlier_lines() {
		let reader = BufReader::new(Cursor::new(b"one\ntwo\n".to_vec()).chain(Unplugged));
		let store = EntryStore::new();

		let err = LineSource::new(reader).load(&store).unwrap_err();

		assert!(format!("{err:#}").contains("device unplugged"));
		assert_eq!(items(&store), vec!["one", "two"]);
	}

	#[test]
	fn line_source_batches_large_inputs() {
		let text: String = (0..2_000).map(|n| format!("line {n}\n")).collect();
		let store = EntryStore::new();
		LineSource::new(Cursor::new(text)).load(&store).unwrap();
		let loaded = items(&store);
		assert_eq!(loaded.len(), 2_000);
		assert_eq!(loaded[1_999], "line 1999");
	}

	#[test]
	fn filesystem_source_lists_relative_files() {
		let temp = tempfile::tempdir().unwrap();
		let root = temp.path();
		fs::create_dir_all(root.join("src/engine")).unwrap();
		fs::create_dir_all(root.join("target")).unwrap();
		fs::write(root.join("src/lib.rs"), "").unwrap();
		fs::write(root.join("src/engine/mod.rs"), "").unwrap();
		fs::write(root.join("README.md"), "").unwrap();
		fs::write(root.join("target/skip.rs"), "").unwrap();
		fs::write(root.join(".hidden"), "").unwrap();

		let store = EntryStore::new();
		FilesystemSource::new(root, FilesystemOptions::default())
			.load(&store)
			.unwrap();

		let found: BTreeSet<String> = items(&store).into_iter().collect();
		let expected: BTreeSet<String> = ["README.md", "src/engine/mod.rs", "src/lib.rs"]
			.into_iter()
			.map(String::from)
			.collect();
		assert_eq!(found, expected);
	}

	#[test]
	fn filesystem_source_rejects_missing_root() {
		let temp = tempfile::tempdir().unwrap();
		let source = FilesystemSource::new(temp.path().join("missing"), FilesystemOptions::default());
		let err = source.load(&EntryStore::new()).unwrap_err();
		assert!(err.to_string().contains("is not a directory"));
	}

	#[test]
	fn batch_sizes_grow_with_volume() {
		assert_eq!(batch_size_for(0), MIN_BATCH_SIZE);
		assert_eq!(batch_size_for(2_000), 256);
		assert_eq!(batch_size_for(20_000), MAX_BATCH_SIZE);
	}
}
