//! Ready-made predicates and comparators for string-like items.

use std::cmp::Ordering;
use std::sync::Arc;

use frizbee::{Config, match_list};

use crate::engine::{Comparator, Predicate};
use crate::query::Query;

/// Every token must occur in the item, ignoring case.
pub fn contains_tokens<T>() -> Predicate<T>
where
	T: AsRef<str> + 'static,
{
	Arc::new(|item: &T, query: &Query| -> anyhow::Result<bool> {
		Ok(query.contained_in(item.as_ref()))
	})
}

/// Every non-empty token must fuzzily match the item.
///
/// Tokens tolerate a few typos depending on their length.
pub fn fuzzy<T>() -> Predicate<T>
where
	T: AsRef<str> + 'static,
{
	Arc::new(|item: &T, query: &Query| -> anyhow::Result<bool> {
		let haystack = [item.as_ref()];
		Ok(query
			.tokens()
			.iter()
			.filter(|token| !token.is_empty())
			.all(|token| {
				let config = config_for_token(token);
				match_list(token.as_str(), &haystack[..], &config)
					.iter()
					.any(|entry| entry.score > 0)
			}))
	})
}

/// Case-insensitive lexical order.
pub fn alphabetical<T>() -> Comparator<T>
where
	T: AsRef<str> + 'static,
{
	Arc::new(|a: &T, b: &T| compare_ignoring_case(a.as_ref(), b.as_ref()))
}

/// Shorter items first.
pub fn by_length<T>() -> Comparator<T>
where
	T: AsRef<str> + 'static,
{
	Arc::new(|a: &T, b: &T| a.as_ref().chars().count().cmp(&b.as_ref().chars().count()))
}

fn compare_ignoring_case(a: &str, b: &str) -> Ordering {
	a.chars()
		.flat_map(char::to_lowercase)
		.cmp(b.chars().flat_map(char::to_lowercase))
}

pub(crate) fn typo_budget(token: &str) -> u16 {
	let length = token.chars().count();
	let allowed: u16 = match length {
		0 | 1 => 0,
		2..=4 => 1,
		5..=7 => 2,
		8..=12 => 3,
		_ => 4,
	};
	match u16::try_from(length.saturating_sub(1)) {
		Ok(max_reasonable) => allowed.min(max_reasonable),
		Err(_) => allowed,
	}
}

fn config_for_token(token: &str) -> Config {
	Config {
		prefilter: true,
		max_typos: Some(typo_budget(token)),
		sort: false,
		..Config::default()
	}
}
