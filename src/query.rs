use std::sync::Arc;

/// Tokenized form of the search text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Query {
	/// No filtering: every entry passes.
	#[default]
	All,
	/// Lowercase tokens in the order they were typed. Never empty.
	Tokens(Arc<[String]>),
}

impl Query {
	#[must_use]
	pub fn is_all(&self) -> bool {
		matches!(self, Self::All)
	}

	/// Tokens of a filtering query; empty for [`Query::All`].
	pub fn tokens(&self) -> &[String] {
		match self {
			Self::All => &[],
			Self::Tokens(tokens) => tokens,
		}
	}

	/// Whether every token occurs in `haystack`, ignoring case.
	pub fn contained_in(&self, haystack: &str) -> bool {
		match self {
			Self::All => true,
			Self::Tokens(tokens) => {
				let haystack = haystack.to_lowercase();
				tokens.iter().all(|token| haystack.contains(token.as_str()))
			}
		}
	}
}

/// Turn raw search text into a [`Query`].
///
/// Blank text means no filter. Anything else is lower-cased and split on
/// single spaces; empty tokens produced by repeated or leading spaces are kept.
pub fn normalize(text: &str) -> Query {
	if text.trim().is_empty() {
		return Query::All;
	}

	let lowered = text.to_lowercase();
	let tokens: Vec<String> = lowered.split(' ').map(str::to_owned).collect();
	Query::Tokens(tokens.into())
}
