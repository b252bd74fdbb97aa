use std::env;
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use config::{Config, ConfigError, Environment, File, FileFormat, FileSourceFile, Map};

use crate::cli::CliArgs;
use sift::app_dirs;

const ENV_PREFIX: &str = "sift";

/// Layer every configuration source in ascending priority: default files,
/// files passed with `--config`, then `SIFT__` environment variables.
///
/// CLI flags sit above all of these and are applied after deserializing.
pub(super) fn build_config(cli: &CliArgs) -> Result<Config> {
	let mut builder = Config::builder();
	for file in config_files(cli) {
		builder = builder.add_source(file);
	}
	builder = builder.add_source(environment(None));

	builder.build().map_err(|err| match err {
		ConfigError::Frozen => anyhow!("configuration builder is frozen"),
		other => other.into(),
	})
}

/// Defaults are optional and skipped with `--no-config`; explicit files must
/// exist.
fn config_files(cli: &CliArgs) -> Vec<File<FileSourceFile, FileFormat>> {
	let defaults = if cli.no_config {
		Vec::new()
	} else {
		default_config_files()
	};
	let optional = defaults
		.into_iter()
		.map(|path| File::from(path).required(false));
	let explicit = cli
		.config
		.iter()
		.map(|path| File::from(path.clone()).required(true));
	optional.chain(explicit).collect()
}

/// Environment overrides. A variable named `SIFT__<SECTION>__<KEY>` sets
/// `<section>.<key>`, so `SIFT__SEARCH__DEBOUNCE_MS=40` becomes
/// `search.debounce_ms = 40`. Scalars are parsed into numbers and booleans
/// where possible and `SIFT__INPUT__GLOBAL_IGNORES` takes a comma-separated
/// list.
///
/// `vars` replaces the process environment when given.
fn environment(vars: Option<Map<String, String>>) -> Environment {
	Environment::with_prefix(ENV_PREFIX)
		.separator("__")
		.try_parsing(true)
		.list_separator(",")
		.with_list_parse_key("input.global_ignores")
		.source(vars)
}

/// Config files consulted unless `--no-config` is given, lowest priority first.
pub(super) fn default_config_files() -> Vec<PathBuf> {
	let user = app_dirs::get_config_dir()
		.ok()
		.map(|dir| dir.join("config.toml"));
	let project = env::current_dir()
		.ok()
		.into_iter()
		.flat_map(|dir| [dir.join(".sift.toml"), dir.join("sift.toml")]);
	user.into_iter().chain(project).collect()
}
