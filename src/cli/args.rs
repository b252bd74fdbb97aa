use std::fmt::Write;
use std::path::PathBuf;

use clap::{
	ArgAction, ColorChoice, Parser, ValueEnum,
	builder::{
		BoolishValueParser, Styles,
		styling::{AnsiColor, Effects},
	},
};
use sift::app_dirs;

/// Produce the full version banner including config and data directories.
fn long_version() -> &'static str {
	let config_dir = match app_dirs::get_config_dir() {
		Ok(path) => path.display().to_string(),
		Err(err) => format!("unavailable ({err})"),
	};
	let data_dir = match app_dirs::get_data_dir() {
		Ok(path) => path.display().to_string(),
		Err(err) => format!("unavailable ({err})"),
	};

	let mut details = format!("sift {}", env!("CARGO_PKG_VERSION"));
	let _ = writeln!(details);
	let _ = writeln!(details, "config directory: {config_dir}");
	let _ = writeln!(details, "data directory: {data_dir}");

	Box::leak(details.into_boxed_str())
}

fn cli_styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Green.on_default().effects(Effects::BOLD))
		.usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
		.literal(AnsiColor::Cyan.on_default())
		.placeholder(AnsiColor::Yellow.on_default())
}

pub(crate) fn parse_cli() -> CliArgs {
	CliArgs::parse()
}

#[derive(Parser, Debug)]
#[command(
	name = "sift",
	version,
	long_version = long_version(),
	about = "Filter a list of lines or files the way a search box would",
	color = ColorChoice::Auto,
	styles = cli_styles()
)]
/// Command-line arguments accepted by the `sift` binary.
pub(crate) struct CliArgs {
	#[arg(
		short,
		long = "config",
		value_name = "FILE",
		env = "SIFT_CONFIG",
		action = ArgAction::Append,
		help = "Additional configuration file to merge (default: none)"
	)]
	pub(crate) config: Vec<PathBuf>,
	#[arg(
		short = 'n',
		long = "no-config",
		help = "Skip loading default configuration files (default: disabled)"
	)]
	pub(crate) no_config: bool,
	#[arg(
		short = 'r',
		long,
		value_name = "PATH",
		help = "List files below this directory (default: current directory)"
	)]
	pub(crate) root: Option<PathBuf>,
	#[arg(
		short = 'i',
		long,
		value_name = "FILE",
		help = "Read candidate lines from a file instead of walking a directory"
	)]
	pub(crate) input: Option<PathBuf>,
	#[arg(
		short = 'q',
		long = "query",
		value_name = "QUERY",
		action = ArgAction::Append,
		help = "Query to type into the search box; repeat for several (default: empty)"
	)]
	pub(crate) queries: Vec<String>,
	#[arg(
		short = 'm',
		long,
		value_enum,
		help = "How query tokens are matched (default: substring)"
	)]
	pub(crate) mode: Option<ModeArg>,
	#[arg(
		short = 's',
		long,
		value_enum,
		help = "Order of the matches (default: insertion)"
	)]
	pub(crate) sort: Option<SortArg>,
	#[arg(
		short = 'j',
		long,
		value_name = "NUM",
		help = "Number of filter and walker threads (default: automatic)"
	)]
	pub(crate) threads: Option<usize>,
	#[arg(
		long = "debounce-ms",
		value_name = "MS",
		help = "Delay between the last keystroke and a search (default: 150)"
	)]
	pub(crate) debounce_ms: Option<u64>,
	#[arg(
		short = 'l',
		long,
		value_name = "NUM",
		help = "Print at most this many matches per query (default: unlimited)"
	)]
	pub(crate) limit: Option<usize>,
	#[arg(
		short = 'H',
		long = "hidden",
		value_parser = BoolishValueParser::new(),
		num_args = 0..=1,
		default_missing_value = "true",
		help = "Include hidden files (default: disabled)"
	)]
	pub(crate) hidden: Option<bool>,
	#[arg(
		long = "follow-symlinks",
		value_parser = BoolishValueParser::new(),
		num_args = 0..=1,
		default_missing_value = "true",
		help = "Follow symbolic links while walking (default: disabled)"
	)]
	pub(crate) follow_symlinks: Option<bool>,
	#[arg(
		long = "respect-ignore-files",
		value_parser = BoolishValueParser::new(),
		num_args = 0..=1,
		default_missing_value = "true",
		help = "Respect .gitignore and .ignore files (default: enabled)"
	)]
	pub(crate) respect_ignore_files: Option<bool>,
	#[arg(
		short = 'd',
		long = "max-depth",
		value_name = "NUM",
		help = "Limit directory traversal depth (default: unlimited)"
	)]
	pub(crate) max_depth: Option<usize>,
	#[arg(
		long = "global-ignores",
		value_delimiter = ',',
		value_name = "NAME",
		help = "Comma-separated directory names to always skip (default: .git,node_modules,target)"
	)]
	pub(crate) global_ignores: Option<Vec<String>>,
	#[arg(
		short = 'p',
		long = "print-config",
		help = "Print the resolved configuration to stderr before running (default: disabled)"
	)]
	pub(crate) print_config: bool,
	#[arg(
		long = "log-level",
		value_name = "FILTER",
		help = "Log filter directives, e.g. `sift=debug` (default: $SIFT_LOG or warn)"
	)]
	pub(crate) log_level: Option<String>,
	#[arg(short = 'o', long = "output", value_enum, default_value_t = OutputFormat::Plain, help = "Choose how to print the matches")]
	pub(crate) output: OutputFormat,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub(crate) enum ModeArg {
	Substring,
	Fuzzy,
}

impl ModeArg {
	/// Return the string representation consumed by configuration loading.
	pub(crate) fn as_str(self) -> &'static str {
		match self {
			ModeArg::Substring => "substring",
			ModeArg::Fuzzy => "fuzzy",
		}
	}
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub(crate) enum SortArg {
	Insertion,
	Alphabetical,
	Length,
}

impl SortArg {
	pub(crate) fn as_str(self) -> &'static str {
		match self {
			SortArg::Insertion => "insertion",
			SortArg::Alphabetical => "alphabetical",
			SortArg::Length => "length",
		}
	}
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
/// Output formats supported by the CLI utility.
pub(crate) enum OutputFormat {
	Plain,
	Json,
}
