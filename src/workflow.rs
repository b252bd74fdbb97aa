use std::fs::File;
use std::io::{self, BufReader};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, ensure};
use sift::{
	Criteria, FilesystemSource, ItemSource, LineSource, ResultSet, SearchController, SearchSink,
	matchers,
};
use tracing::{debug, info};

use crate::cli::QueryReport;
use crate::settings::{InputKind, MatchMode, ResolvedConfig, SortOrder};

const PUMP_INTERVAL: Duration = Duration::from_millis(250);

/// Feeds each configured query into a controller as if typed into a search
/// box and collects what the list would finally show.
pub(crate) struct SearchWorkflow {
	controller: SearchController<String>,
	source: Arc<dyn ItemSource<String>>,
	queries: Vec<String>,
	limit: Option<usize>,
}

impl SearchWorkflow {
	pub(crate) fn from_config(config: ResolvedConfig) -> Result<Self> {
		let ResolvedConfig {
			input,
			filesystem,
			mode,
			sort,
			threads,
			debounce,
			limit,
			queries,
		} = config;

		let controller = SearchController::builder()
			.criteria(criteria_for(mode, sort))
			.debounce(debounce)
			.workers(threads)
			.build()?;
		let source: Arc<dyn ItemSource<String>> = match input {
			InputKind::Stdin => Arc::new(LineSource::new(BufReader::new(io::stdin()))),
			InputKind::File(path) => {
				let file = File::open(&path)
					.with_context(|| format!("failed to open {}", path.display()))?;
				Arc::new(LineSource::new(BufReader::new(file)))
			}
			InputKind::Directory(root) => Arc::new(FilesystemSource::new(root, filesystem)),
		};

		Ok(Self {
			controller,
			source,
			queries,
			limit,
		})
	}

	pub(crate) fn run(self) -> Result<Vec<QueryReport>> {
		let mut sink = LatestResults::default();

		let loading = self.controller.activate(Arc::clone(&self.source))?;
		self.wait_idle(&mut sink)?;
		let loaded = join_loader(loading)?;
		info!(loaded, "candidates loaded");

		let queries = if self.queries.is_empty() {
			vec![String::new()]
		} else {
			self.queries.clone()
		};

		let mut reports = Vec::with_capacity(queries.len());
		for query in queries {
			self.type_query(&query);
			self.wait_idle(&mut sink)?;

			let results = self.controller.results();
			let shown = self.limit.unwrap_or(usize::MAX).min(results.len());
			reports.push(QueryReport {
				query,
				total: self.controller.store().len(),
				matched: results.len(),
				matches: results.iter().take(shown).map(|item| item.to_string()).collect(),
			});
		}
		debug!(published = sink.published, "workflow finished");
		Ok(reports)
	}

	/// Enter `query` one character at a time.
	fn type_query(&self, query: &str) {
		if query.is_empty() {
			self.controller.set_text("");
			return;
		}
		for (end, ch) in query.char_indices() {
			self.controller.set_text(&query[..end + ch.len_utf8()]);
		}
	}

	fn wait_idle(&self, sink: &mut LatestResults) -> Result<()> {
		while !self.controller.pump_until_idle(sink, PUMP_INTERVAL) {
			ensure!(self.controller.is_running(), "search worker stopped unexpectedly");
		}
		Ok(())
	}
}

fn criteria_for(mode: MatchMode, sort: SortOrder) -> Criteria<String> {
	let predicate = match mode {
		MatchMode::Substring => matchers::contains_tokens(),
		MatchMode::Fuzzy => matchers::fuzzy(),
	};
	let comparator = match sort {
		SortOrder::Insertion => None,
		SortOrder::Alphabetical => Some(matchers::alphabetical()),
		SortOrder::Length => Some(matchers::by_length()),
	};
	Criteria::new()
		.with_shared_predicate(Some(predicate))
		.with_shared_comparator(comparator)
}

fn join_loader(loading: JoinHandle<Result<usize>>) -> Result<usize> {
	loading
		.join()
		.map_err(|_| anyhow!("item source thread panicked"))?
		.context("failed to load candidates")
}

/// Records publications the way a list view would, keeping only the newest.
#[derive(Default)]
struct LatestResults {
	latest: ResultSet<String>,
	published: usize,
}

impl SearchSink<String> for LatestResults {
	fn result_published(&mut self, results: &ResultSet<String>) {
		self.latest = results.clone();
		self.published += 1;
		debug!(matches = self.latest.len(), "results published");
	}

	fn busy_changed(&mut self, busy: bool) {
		debug!(busy, "busy state changed");
	}
}
