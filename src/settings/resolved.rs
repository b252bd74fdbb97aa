use std::path::PathBuf;
use std::time::Duration;

use sift::FilesystemOptions;

/// Where the candidate lines come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
	Stdin,
	File(PathBuf),
	Directory(PathBuf),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchMode {
	/// Every query token must appear as a case-insensitive substring.
	#[default]
	Substring,
	Fuzzy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
	#[default]
	Insertion,
	Alphabetical,
	Length,
}

/// Application-ready configuration derived from user input, config files and
/// defaults.
#[derive(Debug)]
pub struct ResolvedConfig {
	pub input: InputKind,
	pub filesystem: FilesystemOptions,
	pub mode: MatchMode,
	pub sort: SortOrder,
	/// Filter pool size; `None` means one worker per hardware thread.
	pub threads: Option<usize>,
	pub debounce: Duration,
	pub limit: Option<usize>,
	pub queries: Vec<String>,
}

impl ResolvedConfig {
	/// Print a human readable summary of the effective configuration to stderr.
	pub fn print_summary(&self) {
		eprintln!("Effective configuration:");
		match &self.input {
			InputKind::Stdin => eprintln!("  Input: standard input"),
			InputKind::File(path) => eprintln!("  Input: {}", path.display()),
			InputKind::Directory(root) => {
				eprintln!("  Root: {}", root.display());
				eprintln!(
					"  Include hidden: {}",
					bool_to_word(self.filesystem.include_hidden)
				);
				eprintln!(
					"  Follow symlinks: {}",
					bool_to_word(self.filesystem.follow_symlinks)
				);
				eprintln!(
					"  Respect ignore files: {}",
					bool_to_word(self.filesystem.respect_ignore_files)
				);
				match self.filesystem.max_depth {
					Some(depth) => eprintln!("  Max depth: {depth}"),
					None => eprintln!("  Max depth: unlimited"),
				}
				if !self.filesystem.global_ignores.is_empty() {
					eprintln!(
						"  Global ignores: {}",
						self.filesystem.global_ignores.join(", ")
					);
				}
			}
		}
		eprintln!("  Match mode: {:?}", self.mode);
		eprintln!("  Sort order: {:?}", self.sort);
		match self.threads {
			Some(threads) => eprintln!("  Threads: {threads}"),
			None => eprintln!("  Threads: automatic"),
		}
		eprintln!("  Debounce: {} ms", self.debounce.as_millis());
		if let Some(limit) = self.limit {
			eprintln!("  Limit: {limit}");
		}
		for query in &self.queries {
			eprintln!("  Query: {query:?}");
		}
	}
}

fn bool_to_word(value: bool) -> &'static str {
	if value { "yes" } else { "no" }
}
