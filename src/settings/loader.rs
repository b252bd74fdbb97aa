use anyhow::{Result, anyhow};

use super::raw::RawConfig;
use super::resolved::ResolvedConfig;
use super::sources::build_config;
use crate::cli::CliArgs;

/// Load configuration by combining CLI arguments, config files and environment
/// variables.
pub fn load(cli: &CliArgs) -> Result<ResolvedConfig> {
	let builder = build_config(cli)?;
	let mut raw: RawConfig = builder
		.try_deserialize()
		.map_err(|err| anyhow!("failed to deserialize configuration: {err}"))?;
	raw.apply_cli_overrides(cli);
	raw.resolve(cli)
}

#[cfg(test)]
mod tests {
	use std::fs;
	use std::time::Duration;

	use clap::Parser;

	use super::*;
	use crate::settings::{InputKind, MatchMode, SortOrder};

	#[test]
	fn cli_flags_override_config_files() {
		let dir = tempfile::tempdir().unwrap();
		let file = dir.path().join("sift.toml");
		fs::write(
			&file,
			"[search]\nmode = \"fuzzy\"\nsort = \"length\"\ndebounce_ms = 40\n\n[input]\ninclude_hidden = true\nmax_depth = 3\n",
		)
		.unwrap();
		let file = file.display().to_string();

		let cli = CliArgs::try_parse_from([
			"sift", "--no-config", "--config", &file, "--mode", "substring", "-d", "1",
		])
		.unwrap();
		let resolved = load(&cli).unwrap();

		assert_eq!(resolved.mode, MatchMode::Substring);
		assert_eq!(resolved.sort, SortOrder::Length);
		assert_eq!(resolved.debounce, Duration::from_millis(40));
		assert!(resolved.filesystem.include_hidden);
		assert_eq!(resolved.filesystem.max_depth, Some(1));
	}

	#[test]
	fn input_file_takes_precedence_over_root() {
		let dir = tempfile::tempdir().unwrap();
		let root = dir.path().display().to_string();
		let cli = CliArgs::try_parse_from([
			"sift", "--no-config", "--root", &root, "--input", "names.txt",
		])
		.unwrap();

		let resolved = load(&cli).unwrap();
		assert_eq!(resolved.input, InputKind::File("names.txt".into()));
	}

	#[test]
	fn unknown_modes_are_rejected() {
		let dir = tempfile::tempdir().unwrap();
		let file = dir.path().join("sift.toml");
		fs::write(&file, "[search]\nmode = \"telepathic\"\n").unwrap();
		let file = file.display().to_string();

		let cli = CliArgs::try_parse_from(["sift", "--no-config", "-c", &file]).unwrap();
		let err = load(&cli).unwrap_err();
		assert!(format!("{err:#}").contains("telepathic"));
	}

	#[test]
	fn missing_explicit_config_file_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		let file = dir.path().join("absent.toml").display().to_string();
		let cli = CliArgs::try_parse_from(["sift", "--no-config", "-c", &file]).unwrap();
		assert!(load(&cli).is_err());
	}
}
