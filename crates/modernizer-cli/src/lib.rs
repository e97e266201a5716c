//! Modernizer CLI
//!
//! Front end for the modernization pipeline:
//! - Argument parsing and configuration resolution
//! - Source discovery over files and directory trees
//! - Artifact writing, one directory per unit
//!
//! API keys and `.env` files are read here, never by the library crates.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod input;
pub mod output;

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use modernizer_core::{BackendConfig, Pipeline, PipelineConfig};
use std::path::PathBuf;

/// Command-line definition
#[must_use]
pub fn command() -> Command {
    Command::new("modernizer")
        .version(modernizer_core::VERSION)
        .about("IR-first legacy code modernizer: analysis, modernization and documentation")
        .arg(
            Arg::new("paths")
                .required(true)
                .num_args(1..)
                .value_parser(value_parser!(PathBuf))
                .help("Source files or directories to process"),
        )
        .arg(
            Arg::new("out")
                .long("out")
                .short('o')
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Directory that receives the generated artifacts"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("offline")
                .long("offline")
                .action(ArgAction::SetTrue)
                .help("Never call a backend; use deterministic fallbacks only"),
        )
        .arg(
            Arg::new("language")
                .long("language")
                .help("Language of every input, overriding detection"),
        )
        .arg(
            Arg::new("max-retries")
                .long("max-retries")
                .value_parser(value_parser!(u32))
                .help("Backend calls allowed per stage"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
}

/// Parsed command-line options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    pub paths: Vec<PathBuf>,
    pub out: PathBuf,
    pub config: Option<PathBuf>,
    pub offline: bool,
    pub language: Option<String>,
    pub max_retries: Option<u32>,
    pub log_json: bool,
}

impl Options {
    /// Extract options from parsed arguments
    ///
    /// # Errors
    /// Fails if a required argument is absent.
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let paths: Vec<PathBuf> = matches
            .get_many::<PathBuf>("paths")
            .map(|v| v.cloned().collect())
            .unwrap_or_default();
        if paths.is_empty() {
            bail!("no input paths given");
        }
        let out = matches
            .get_one::<PathBuf>("out")
            .cloned()
            .context("--out is required")?;
        Ok(Self {
            paths,
            out,
            config: matches.get_one::<PathBuf>("config").cloned(),
            offline: matches.get_flag("offline"),
            language: matches.get_one::<String>("language").cloned(),
            max_retries: matches.get_one::<u32>("max-retries").copied(),
            log_json: matches.get_flag("log-json"),
        })
    }
}

/// Build the pipeline configuration for `options`
///
/// Without a config file the HTTP backend is enabled only when `api_key`
/// yields a key for the default variable or one of its aliases. `--offline` and `--max-retries`
/// override whatever was loaded.
///
/// # Errors
/// Fails if the config file cannot be loaded or the result is invalid.
pub fn resolve_config(
    options: &Options,
    api_key: impl Fn(&str) -> Option<String>,
) -> Result<(PipelineConfig, Option<String>)> {
    let mut config = match &options.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => PipelineConfig::new(),
    };

    let key = config.backend.api_key_from(api_key);
    if options.config.is_none() && key.is_some() {
        config.backend = BackendConfig::openai_compatible();
    }
    if options.offline {
        config.backend = BackendConfig::none();
    }
    if let Some(n) = options.max_retries {
        config = config.with_max_retries(n);
    }
    config.validate()?;
    Ok((config, key))
}

/// Totals for one CLI run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub units: usize,
    pub units_with_fallback: usize,
    pub backend_calls: u32,
    pub written: Vec<PathBuf>,
}

/// Discover inputs, process them and write artifacts
///
/// # Errors
/// Fails on invalid configuration, unreadable inputs or unwritable output.
pub async fn run(options: &Options, config: PipelineConfig, api_key: Option<&str>) -> Result<RunSummary> {
    let pipeline = Pipeline::from_config(config, api_key)?;
    tracing::info!(
        backend = pipeline.orchestrator().has_backend(),
        max_retries = pipeline.config().retry.max_retries,
        "pipeline ready"
    );

    let files = input::discover(&options.paths)?;
    if files.is_empty() {
        bail!("no source files found");
    }
    let units = files
        .iter()
        .map(|file| input::load_unit(file, options.language.as_deref()))
        .collect::<Result<Vec<_>>>()?;
    tracing::info!(units = units.len(), "processing");

    let results = pipeline.process_batch(&units).await;

    let mut summary = RunSummary {
        units: results.len(),
        ..RunSummary::default()
    };
    for result in &results {
        if result.provenance.any_fallback() {
            summary.units_with_fallback += 1;
        }
        summary.backend_calls += result.provenance.backend_calls();
        summary
            .written
            .push(output::write_result(&options.out, result)?);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use modernizer_core::BackendKind;

    fn parse(args: &[&str]) -> Options {
        let matches = command().try_get_matches_from(args).unwrap();
        Options::from_matches(&matches).unwrap()
    }

    #[test]
    fn parses_all_flags() {
        let options = parse(&[
            "modernizer",
            "a.py",
            "src",
            "--out",
            "build",
            "--offline",
            "--language",
            "java",
            "--max-retries",
            "5",
            "--log-json",
        ]);
        assert_eq!(options.paths, [PathBuf::from("a.py"), PathBuf::from("src")]);
        assert_eq!(options.out, PathBuf::from("build"));
        assert!(options.offline && options.log_json);
        assert_eq!(options.language.as_deref(), Some("java"));
        assert_eq!(options.max_retries, Some(5));
    }

    #[test]
    fn out_is_required() {
        assert!(command().try_get_matches_from(["modernizer", "a.py"]).is_err());
    }

    #[test]
    fn key_in_environment_enables_backend() {
        let options = parse(&["modernizer", "a.py", "-o", "out"]);
        let (config, key) = resolve_config(&options, |_| Some("sk-test".into())).unwrap();
        assert_eq!(config.backend.kind, BackendKind::OpenaiCompatible);
        assert_eq!(key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn either_key_variable_enables_backend() {
        for var in ["OPEN_ROUTER_API_KEY", "OPENROUTER_API_KEY"] {
            let options = parse(&["modernizer", "a.py", "-o", "out"]);
            let lookup = |name: &str| (name == var).then(|| "sk-test".to_string());
            let (config, key) = resolve_config(&options, lookup).unwrap();
            assert_eq!(config.backend.kind, BackendKind::OpenaiCompatible, "{var}");
            assert_eq!(key.as_deref(), Some("sk-test"));
        }
    }

    #[test]
    fn no_key_means_no_backend() {
        let options = parse(&["modernizer", "a.py", "-o", "out"]);
        let (config, _) = resolve_config(&options, |_| None).unwrap();
        assert_eq!(config.backend.kind, BackendKind::None);
    }

    #[test]
    fn offline_overrides_key() {
        let options = parse(&["modernizer", "a.py", "-o", "out", "--offline"]);
        let (config, _) = resolve_config(&options, |_| Some("sk-test".into())).unwrap();
        assert_eq!(config.backend.kind, BackendKind::None);
    }

    #[test]
    fn zero_retries_is_rejected() {
        let options = parse(&["modernizer", "a.py", "-o", "out", "--max-retries", "0"]);
        assert!(resolve_config(&options, |_| None).is_err());
    }
}
