//! Command-line arguments

use super::{CopyOptions, FileConfig};
use crate::filter::{AllOf, GlobFilter, PathFilter, RegexFilter};
use crate::logging::LogFormat;
use crate::types::CopyError;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Recursively copy a directory tree
#[derive(Debug, Parser)]
#[command(name = "treecp", version, about)]
pub struct Cli {
    /// Source file or directory
    pub source: PathBuf,

    /// Destination path
    pub destination: PathBuf,

    /// Maximum number of concurrent file operations (1-512)
    #[arg(long)]
    pub limit: Option<usize>,

    /// Only copy paths matching this regular expression
    #[arg(long)]
    pub filter: Option<String>,

    /// Exclude paths matching this glob (relative to the source)
    #[arg(long = "exclude", value_name = "GLOB")]
    pub exclude_patterns: Vec<String>,

    /// Re-include paths matching this glob even if excluded
    #[arg(long = "include", value_name = "GLOB")]
    pub include_patterns: Vec<String>,

    /// Leave existing destination files untouched
    #[arg(long)]
    pub no_clobber: bool,

    /// Copy what symlinks point at instead of the links
    #[arg(short = 'L', long)]
    pub dereference: bool,

    /// Only overwrite destination files older than their source
    #[arg(long)]
    pub modified: bool,

    /// Copy access and modification times
    #[arg(long)]
    pub preserve_timestamps: bool,

    /// Stop at the first error instead of copying everything possible
    #[arg(long, alias = "stoponerr")]
    pub stop_on_error: bool,

    /// Append failure reports to this file
    #[arg(long, value_name = "PATH")]
    pub errors_file: Option<PathBuf>,

    /// TOML file supplying defaults for the options above
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Disable the progress display
    #[arg(long)]
    pub no_progress: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

/// Everything the copy command needs, with CLI flags merged over the config file
#[derive(Debug)]
pub struct Settings {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub options: CopyOptions,
    pub show_progress: bool,
    pub verbosity: u8,
    pub log_format: LogFormatArg,
}

impl TryFrom<Cli> for Settings {
    type Error = CopyError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        let filter_pattern = cli.filter.clone().or(file.filter.clone());
        let mut exclude = file.exclude.clone();
        exclude.extend(cli.exclude_patterns.iter().cloned());
        let mut include = file.include.clone();
        include.extend(cli.include_patterns.iter().cloned());

        let mut options = CopyOptions {
            clobber: !cli.no_clobber && file.clobber.unwrap_or(true),
            dereference: cli.dereference || file.dereference.unwrap_or(false),
            modified: cli.modified || file.modified.unwrap_or(false),
            stop_on_error: cli.stop_on_error || file.stop_on_error.unwrap_or(false),
            preserve_timestamps: cli.preserve_timestamps
                || file.preserve_timestamps.unwrap_or(false),
            errors_file: cli.errors_file.clone().or(file.errors_file.clone()),
            ..CopyOptions::default()
        };
        if let Some(limit) = cli.limit.or(file.limit) {
            options.limit = limit;
        }

        let mut filters: Vec<Box<dyn PathFilter>> = Vec::new();
        if let Some(pattern) = filter_pattern {
            filters.push(Box::new(RegexFilter::new(&pattern)?));
        }
        if !exclude.is_empty() || !include.is_empty() {
            let root = std::path::absolute(&cli.source).unwrap_or_else(|_| cli.source.clone());
            filters.push(Box::new(GlobFilter::new(root, &exclude, &include)?));
        }
        match filters.len() {
            0 => {}
            1 => {
                if let Some(filter) = filters.pop() {
                    options.filter = filter.into();
                }
            }
            _ => options = options.with_filter(AllOf::new(filters)),
        }

        Ok(Settings {
            source: cli.source,
            destination: cli.destination,
            options,
            show_progress: !cli.no_progress,
            verbosity: cli.verbose,
            log_format: cli.log_format,
        })
    }
}
