use anyhow::Result;
use serde::Serialize;

/// Matches found for one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct QueryReport {
	pub(crate) query: String,
	/// Number of candidates searched.
	pub(crate) total: usize,
	/// Number of matches, before any limit.
	pub(crate) matched: usize,
	pub(crate) matches: Vec<String>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
	query: &'a str,
	total: usize,
	matched: usize,
	shown: usize,
	matches: &'a [String],
}

/// Print matches one per line. Several reports are separated by a header.
pub(crate) fn print_plain(reports: &[QueryReport]) {
	let headed = reports.len() > 1;
	for report in reports {
		if headed {
			println!("==> {} ({}/{}) <==", report.query, report.matched, report.total);
		}
		for line in &report.matches {
			println!("{line}");
		}
	}
}

pub(crate) fn format_reports_json(reports: &[QueryReport]) -> Result<String> {
	let payload: Vec<JsonReport<'_>> = reports
		.iter()
		.map(|report| JsonReport {
			query: &report.query,
			total: report.total,
			matched: report.matched,
			shown: report.matches.len(),
			matches: &report.matches,
		})
		.collect();
	Ok(serde_json::to_string_pretty(&payload)?)
}

pub(crate) fn print_json(reports: &[QueryReport]) -> Result<()> {
	println!("{}", format_reports_json(reports)?);
	Ok(())
}
