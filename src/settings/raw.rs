use std::env;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail, ensure};
use serde::Deserialize;

use sift::{DEFAULT_DEBOUNCE, FilesystemOptions};

use crate::cli::CliArgs;

use super::resolved::{InputKind, MatchMode, ResolvedConfig, SortOrder};

const MAX_DEBOUNCE_MS: u64 = 10_000;

/// Mirror of the configuration file representation before CLI overrides and
/// validation are applied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(super) struct RawConfig {
	search: SearchSection,
	input: InputSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct SearchSection {
	mode: Option<String>,
	sort: Option<String>,
	threads: Option<usize>,
	debounce_ms: Option<u64>,
	limit: Option<usize>,
}

/// Where candidates come from and how directories are walked.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct InputSection {
	root: Option<PathBuf>,
	file: Option<PathBuf>,
	include_hidden: Option<bool>,
	follow_symlinks: Option<bool>,
	respect_ignore_files: Option<bool>,
	max_depth: Option<usize>,
	global_ignores: Option<Vec<String>>,
}

impl RawConfig {
	/// Apply CLI overrides on top of the raw configuration values.
	pub(super) fn apply_cli_overrides(&mut self, cli: &CliArgs) {
		if let Some(mode) = cli.mode {
			self.search.mode = Some(mode.as_str().to_string());
		}
		if let Some(sort) = cli.sort {
			self.search.sort = Some(sort.as_str().to_string());
		}
		if let Some(value) = cli.threads {
			self.search.threads = Some(value);
		}
		if let Some(value) = cli.debounce_ms {
			self.search.debounce_ms = Some(value);
		}
		if let Some(value) = cli.limit {
			self.search.limit = Some(value);
		}

		if let Some(root) = cli.root.clone() {
			self.input.root = Some(root);
		}
		if let Some(file) = cli.input.clone() {
			self.input.file = Some(file);
		}
		if let Some(value) = cli.hidden {
			self.input.include_hidden = Some(value);
		}
		if let Some(value) = cli.follow_symlinks {
			self.input.follow_symlinks = Some(value);
		}
		if let Some(value) = cli.respect_ignore_files {
			self.input.respect_ignore_files = Some(value);
		}
		if let Some(value) = cli.max_depth {
			self.input.max_depth = Some(value);
		}
		if let Some(value) = &cli.global_ignores {
			self.input.global_ignores = Some(value.clone());
		}
	}

	/// Validate the merged values and fill in defaults.
	pub(super) fn resolve(self, cli: &CliArgs) -> Result<ResolvedConfig> {
		let RawConfig { search, input } = self;

		let mode = match search.mode.as_deref() {
			None => MatchMode::default(),
			Some(value) => parse_mode(value)?,
		};
		let sort = match search.sort.as_deref() {
			None => SortOrder::default(),
			Some(value) => parse_sort(value)?,
		};

		let debounce = match search.debounce_ms {
			None => DEFAULT_DEBOUNCE,
			Some(ms) => {
				ensure!(
					ms <= MAX_DEBOUNCE_MS,
					"search.debounce_ms must be at most {MAX_DEBOUNCE_MS}, got {ms}"
				);
				Duration::from_millis(ms)
			}
		};
		if let Some(limit) = search.limit {
			ensure!(limit > 0, "search.limit must be greater than zero");
		}
		let threads = search.threads.filter(|threads| *threads > 0);

		let defaults = FilesystemOptions::default();
		let filesystem = FilesystemOptions {
			include_hidden: input.include_hidden.unwrap_or(defaults.include_hidden),
			follow_symlinks: input.follow_symlinks.unwrap_or(defaults.follow_symlinks),
			respect_ignore_files: input
				.respect_ignore_files
				.unwrap_or(defaults.respect_ignore_files),
			threads,
			max_depth: input.max_depth,
			global_ignores: input
				.global_ignores
				.map(sanitize_names)
				.unwrap_or(defaults.global_ignores),
		};

		let source = match (input.file, input.root) {
			(Some(file), _) => InputKind::File(file),
			(None, Some(root)) => InputKind::Directory(root),
			(None, None) if !std::io::stdin().is_terminal() => InputKind::Stdin,
			(None, None) => InputKind::Directory(
				env::current_dir().context("failed to determine the current directory")?,
			),
		};

		Ok(ResolvedConfig {
			input: source,
			filesystem,
			mode,
			sort,
			threads,
			debounce,
			limit: search.limit,
			queries: cli.queries.clone(),
		})
	}
}

fn parse_mode(value: &str) -> Result<MatchMode> {
	match value.trim().to_ascii_lowercase().as_str() {
		"substring" | "contains" => Ok(MatchMode::Substring),
		"fuzzy" => Ok(MatchMode::Fuzzy),
		other => bail!("unknown search.mode `{other}` (expected substring or fuzzy)"),
	}
}

fn parse_sort(value: &str) -> Result<SortOrder> {
	match value.trim().to_ascii_lowercase().as_str() {
		"insertion" | "none" => Ok(SortOrder::Insertion),
		"alphabetical" | "name" => Ok(SortOrder::Alphabetical),
		"length" => Ok(SortOrder::Length),
		other => bail!("unknown search.sort `{other}` (expected insertion, alphabetical or length)"),
	}
}

/// Trim names and drop empty entries.
fn sanitize_names(names: Vec<String>) -> Vec<String> {
	names
		.into_iter()
		.map(|name| name.trim().to_string())
		.filter(|name| !name.is_empty())
		.collect()
}
