use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::mpsc::sync_channel;
use std::thread;
use std::time::{Duration, Instant};

use super::*;
use crate::matchers;
use crate::memory::InMemorySearchMemory;
use crate::query::Query;
use crate::source::StaticSource;

const WAIT: Duration = Duration::from_secs(10);

#[derive(Default)]
struct Recorder {
	published: Vec<Vec<String>>,
	busy: Vec<bool>,
	selections: Vec<(String, bool)>,
}

impl Recorder {
	fn last(&self) -> Vec<String> {
		self.published.last().cloned().unwrap_or_default()
	}
}

impl SearchSink<String> for Recorder {
	fn result_published(&mut self, results: &ResultSet<String>) {
		self.published.push(results.to_vec());
	}

	fn busy_changed(&mut self, busy: bool) {
		self.busy.push(busy);
	}

	fn selection_committed(&mut self, item: &Arc<String>, should_close: bool) {
		self.selections.push((item.as_ref().clone(), should_close));
	}
}

fn fruit_store() -> Arc<EntryStore<String>> {
	let store = Arc::new(EntryStore::new());
	store.add_many(["apple", "banana", "cherry"].map(String::from));
	store
}

fn controller(debounce: Duration) -> SearchController<String> {
	SearchController::builder()
		.store(fruit_store())
		.criteria(Criteria::new().with_shared_predicate(Some(matchers::contains_tokens())))
		.debounce(debounce)
		.build()
		.unwrap()
}

/// Run one search so later ones go through the debounce window.
fn settle(controller: &SearchController<String>, sink: &mut Recorder) {
	controller.set_text("");
	assert!(controller.pump_until_idle(sink, WAIT));
}

#[test]
fn first_search_skips_debounce() {
	let controller = controller(Duration::from_secs(60));
	let mut sink = Recorder::default();

	controller.set_text("b");
	assert!(controller.pump_until_idle(&mut sink, WAIT));
	assert_eq!(sink.published, vec![vec!["banana".to_string()]]);
	assert_eq!(controller.results().to_vec(), vec!["banana".to_string()]);
}

#[test]
fn superseded_text_is_never_published() {
	let controller = controller(Duration::from_millis(200));
	let mut sink = Recorder::default();
	settle(&controller, &mut sink);
	let before = sink.published.len();

	controller.set_text("a");
	controller.set_text("ch");
	assert!(controller.pump_until_idle(&mut sink, WAIT));

	assert_eq!(sink.published.len(), before + 1);
	assert_eq!(sink.last(), vec!["cherry".to_string()]);
	let state = controller.state();
	assert_eq!(state.phase, Phase::Idle);
	assert_eq!(state.pending_text, "ch");
}

#[test]
fn typing_aborts_the_run_in_flight() {
	let started = sync_channel(1);
	let started_tx = started.0;
	let slow_calls = Arc::new(AtomicUsize::new(0));
	let calls = Arc::clone(&slow_calls);
	let predicate = move |item: &String, query: &Query| -> anyhow::Result<bool> {
		if query.tokens().iter().any(|token| token == "slow") {
			calls.fetch_add(1, AtomicOrdering::SeqCst);
			let _ = started_tx.try_send(());
			thread::sleep(Duration::from_millis(2));
			return Ok(true);
		}
		Ok(query.contained_in(item))
	};

	let store = Arc::new(EntryStore::new());
	store.add_many((0..1_000).map(|n| format!("item {n}")));
	let controller = SearchController::builder()
		.store(store)
		.criteria(Criteria::new().with_predicate(predicate))
		.debounce(Duration::from_millis(5))
		.workers(Some(1))
		.build()
		.unwrap();
	let mut sink = Recorder::default();
	settle(&controller, &mut sink);

	controller.set_text("slow");
	started.1.recv_timeout(WAIT).unwrap();
	controller.set_text("item 999");
	assert!(controller.pump_until_idle(&mut sink, WAIT));

	assert!(slow_calls.load(AtomicOrdering::SeqCst) < 1_000);
	assert_eq!(sink.last(), vec!["item 999".to_string()]);
	assert!(
		sink.published[1..].iter().all(|results| results.len() < 1_000),
		"aborted run must not publish"
	);
}

#[test]
fn busy_notifications_bracket_work() {
	let controller = controller(Duration::from_millis(10));
	let mut sink = Recorder::default();

	controller.set_text("a");
	controller.refresh();
	controller.refresh();
	assert!(controller.pump_until_idle(&mut sink, WAIT));

	assert_eq!(sink.busy.first(), Some(&true));
	assert_eq!(sink.busy.last(), Some(&false));
	assert!(sink.busy.windows(2).all(|pair| pair[0] != pair[1]));
	assert!(controller.state().idle);
}

#[test]
fn refresh_picks_up_new_entries() {
	let controller = controller(Duration::from_millis(10));
	let mut sink = Recorder::default();
	controller.set_text("an");
	assert!(controller.pump_until_idle(&mut sink, WAIT));
	assert_eq!(sink.last(), vec!["banana".to_string()]);

	controller.store().add("mango".to_string());
	controller.refresh();
	assert!(controller.pump_until_idle(&mut sink, WAIT));
	assert_eq!(sink.last(), vec!["banana".to_string(), "mango".to_string()]);
}

#[test]
fn stale_results_are_dropped_unless_forced() {
	let controller = controller(Duration::from_millis(10));
	controller.shared.lock_state().generation = 5;
	let results = ResultSet::new(vec![Arc::new("late".to_string())]);
	let send = |generation, forced| {
		controller
			.shared
			.events
			.send(SearchEvent::Published {
				generation,
				results: results.clone(),
				forced,
			})
			.unwrap();
	};

	let mut sink = Recorder::default();
	send(4, false);
	assert_eq!(controller.pump(&mut sink), 1);
	assert!(sink.published.is_empty());

	send(4, true);
	send(5, false);
	assert_eq!(controller.pump(&mut sink), 2);
	assert_eq!(sink.published.len(), 2);
	assert_eq!(controller.results().to_vec(), vec!["late".to_string()]);
}

struct Reentrant {
	controller: Arc<SearchController<String>>,
	inner: Recorder,
	accepted: Vec<bool>,
}

impl SearchSink<String> for Reentrant {
	fn result_published(&mut self, results: &ResultSet<String>) {
		if let Some(first) = results.first() {
			let accepted = self.controller.commit_selection(&mut self.inner, first, false);
			self.accepted.push(accepted);
		}
	}
}

#[test]
fn selection_is_suppressed_while_publishing() {
	let controller = Arc::new(controller(Duration::from_millis(10)));
	let mut sink = Reentrant {
		controller: Arc::clone(&controller),
		inner: Recorder::default(),
		accepted: Vec::new(),
	};

	controller.set_text("");
	assert!(controller.pump_until_idle(&mut sink, WAIT));
	assert_eq!(sink.accepted, vec![false]);
	assert!(sink.inner.selections.is_empty());

	let item = Arc::new("apple".to_string());
	assert!(controller.commit_selection(&mut sink.inner, &item, true));
	assert_eq!(sink.inner.selections, vec![("apple".to_string(), true)]);
}

#[test]
fn detach_and_attach_restore_search_per_item_type() {
	let memory: Arc<dyn SearchMemory> = Arc::new(InMemorySearchMemory::new());
	let mut sink = Recorder::default();

	let first = SearchController::builder()
		.store(fruit_store())
		.criteria(Criteria::new().with_shared_predicate(Some(matchers::contains_tokens())))
		.memory(Arc::clone(&memory))
		.build()
		.unwrap();
	assert_eq!(first.attach(), Restored::default());
	first.set_text("ban");
	assert!(first.pump_until_idle(&mut sink, WAIT));
	first.detach(Some(12.5));
	drop(first);

	let second = SearchController::builder()
		.store(fruit_store())
		.criteria(Criteria::new().with_shared_predicate(Some(matchers::contains_tokens())))
		.debounce(Duration::from_secs(60))
		.memory(memory)
		.build()
		.unwrap();
	let restored = second.attach();
	assert_eq!(restored.search_text.as_deref(), Some("ban"));
	assert_eq!(restored.scroll_offset, Some(12.5));

	let mut sink = Recorder::default();
	assert!(second.pump_until_idle(&mut sink, WAIT));
	assert_eq!(sink.last(), vec!["banana".to_string()]);
}

#[test]
fn attach_without_memory_restores_nothing() {
	let controller = controller(Duration::from_millis(10));
	assert_eq!(controller.attach(), Restored::default());
	controller.detach(Some(3.0));
	assert!(controller.state().pending_text.is_empty());
}

#[test]
fn activate_loads_source_then_publishes() {
	let controller = SearchController::<String>::builder().build().unwrap();
	controller.store().add("stale".to_string());
	let source = StaticSource::new(["one", "two", "three"].map(String::from));

	let loading = controller.activate(Arc::new(source)).unwrap();
	let mut sink = Recorder::default();
	assert!(controller.pump_until_idle(&mut sink, WAIT));

	assert_eq!(loading.join().unwrap().unwrap(), 3);
	assert_eq!(sink.last(), vec!["one", "two", "three"]);
	assert_eq!(sink.busy.first(), Some(&true));
}

#[test]
fn failing_source_still_publishes_partial_items() {
	let controller = SearchController::<String>::builder().build().unwrap();
	let source: Arc<dyn ItemSource<String>> =
		Arc::new(|store: &EntryStore<String>| -> anyhow::Result<()> {
			store.add("partial".to_string());
			anyhow::bail!("disk went away")
		});

	let loading = controller.activate(source).unwrap();
	let mut sink = Recorder::default();
	assert!(controller.pump_until_idle(&mut sink, WAIT));

	let err = loading.join().unwrap().unwrap_err();
	assert!(err.to_string().contains("disk went away"));
	assert_eq!(sink.last(), vec!["partial".to_string()]);
}

#[test]
fn panicking_source_still_reaches_idle() {
	let controller = SearchController::<String>::builder()
		.criteria(Criteria::new().with_shared_predicate(Some(matchers::contains_tokens())))
		.debounce(Duration::from_millis(5))
		.build()
		.unwrap();
	let source: Arc<dyn ItemSource<String>> =
		Arc::new(|store: &EntryStore<String>| -> anyhow::Result<()> {
			store.add("partial".to_string());
			panic!("loader crashed")
		});

	let loading = controller.activate(source).unwrap();
	let mut sink = Recorder::default();
	assert!(controller.pump_until_idle(&mut sink, WAIT));
	assert_eq!(sink.last(), vec!["partial".to_string()]);

	let err = loading.join().unwrap().unwrap_err();
	assert!(err.to_string().contains("loader crashed"));

	controller.set_text("par");
	assert!(controller.pump_until_idle(&mut sink, WAIT));
	assert!(controller.state().idle);
	assert_eq!(sink.last(), vec!["partial".to_string()]);
	assert_eq!(sink.busy.last(), Some(&false));
}

#[test]
fn pumping_stops_once_the_worker_is_gone() {
	let controller = controller(Duration::from_millis(5));
	controller.shared.commands.send(Command::Shutdown).unwrap();
	let deadline = Instant::now() + WAIT;
	while controller.is_running() && Instant::now() < deadline {
		thread::sleep(Duration::from_millis(1));
	}
	assert!(!controller.is_running());

	controller.set_text("apple");
	let mut sink = Recorder::default();
	let started = Instant::now();
	assert!(!controller.pump_until_idle(&mut sink, WAIT));
	assert!(started.elapsed() < WAIT);
	assert!(!controller.state().idle);
}

#[test]
fn rapid_typing_settles_on_final_text() {
	let controller = controller(Duration::from_millis(20));
	let mut sink = Recorder::default();
	settle(&controller, &mut sink);

	let mut text = String::new();
	for ch in "banana".chars() {
		text.push(ch);
		controller.set_text(text.clone());
		thread::sleep(Duration::from_millis(1));
	}
	assert!(controller.pump_until_idle(&mut sink, WAIT));

	assert_eq!(sink.last(), vec!["banana".to_string()]);
	let state = controller.state();
	assert_eq!(state.phase, Phase::Idle);
	assert!(!state.searching);
	assert!(state.idle);
}

#[test]
fn criteria_changes_apply_to_the_next_run() {
	let controller = controller(Duration::from_millis(10));
	let mut sink = Recorder::default();
	settle(&controller, &mut sink);
	assert_eq!(sink.last(), vec!["apple", "banana", "cherry"]);

	controller.set_criteria(Criteria::new().with_comparator(|a: &String, b: &String| b.cmp(a)));
	controller.refresh();
	assert!(controller.pump_until_idle(&mut sink, WAIT));
	assert_eq!(sink.last(), vec!["cherry", "banana", "apple"]);
}

#[test]
fn dropping_while_debouncing_returns_promptly() {
	let controller = controller(Duration::from_secs(60));
	let mut sink = Recorder::default();
	settle(&controller, &mut sink);

	controller.set_text("a");
	thread::sleep(Duration::from_millis(20));
	assert_eq!(controller.state().phase, Phase::Debouncing);

	let started = Instant::now();
	drop(controller);
	assert!(started.elapsed() < Duration::from_secs(5));
}
