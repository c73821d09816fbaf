//! Command-line interface and the sorting pipeline.
//!
//! This module handles:
//! - Argument parsing into a [`RunConfig`]
//! - Listing the source directory and applying filter rules
//! - Classification, destination planning and moving, one file at a time
//! - Logging every outcome

use crate::config::{ConfigError, DEFAULT_LOG_FILE, RunConfig, SortMode, SorterConfig};
use crate::file_category::FileMapper;
use crate::file_organizer::{FileEntry, FileOrganizer, PathPlanner, RunReport};
use crate::logging::{LOG_BACKUPS, backup_path};
use crate::output::OutputFormatter;
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Sort files into category folders by MIME type or extension.
#[derive(Debug, Parser)]
#[command(name = "filesorter", version, about)]
pub struct Cli {
    /// Source directory to sort [default: your Downloads folder]
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Target directory for the category subfolders [default: your Documents folder]
    #[arg(long)]
    pub target: Option<PathBuf>,

    /// Classification mode
    #[arg(long, value_enum, default_value_t = SortMode::Mime)]
    pub mode: SortMode,

    /// Prefix names with the file's YYYY-MM- modification month (always on in extension mode)
    #[arg(long)]
    pub rename: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Log file path
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    pub logfile: PathBuf,

    /// TOML file with filter rules and extra category mappings.
    /// Hidden files are skipped unless it sets `enable_hidden_files = true`
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Show what would be moved without touching any file
    #[arg(long)]
    pub dry_run: bool,

    /// Write a JSON report of the run to this file
    #[arg(long)]
    pub manifest: Option<PathBuf>,
}

impl Cli {
    /// Resolves defaults and builds the run configuration.
    pub fn into_run_config(self) -> Result<RunConfig, ConfigError> {
        let source = match self.source {
            Some(source) => source,
            None => default_dir(dirs::download_dir(), "Downloads")
                .ok_or(ConfigError::NoDefaultDirectory("source"))?,
        };
        let target = match self.target {
            Some(target) => target,
            None => default_dir(dirs::document_dir(), "Documents")
                .ok_or(ConfigError::NoDefaultDirectory("target"))?,
        };

        Ok(RunConfig {
            source,
            target,
            mode: self.mode,
            rename: self.rename,
            verbose: self.verbose,
            log_file: self.logfile,
            dry_run: self.dry_run,
            manifest: self.manifest,
            config_file: self.config,
        })
    }
}

fn default_dir(platform: Option<PathBuf>, home_subdir: &str) -> Option<PathBuf> {
    platform.or_else(|| dirs::home_dir().map(|home| home.join(home_subdir)))
}

/// Runs one sorting pass described by `config`.
///
/// Only configuration problems are returned as errors. Files that cannot be
/// classified or moved are logged, recorded in the report's skip list, and
/// the pass continues.
///
/// # Examples
///
/// ```no_run
/// use filesorter::cli::run;
/// use filesorter::config::RunConfig;
///
/// let report = run(&RunConfig::new("/home/me/Downloads", "/home/me/Documents")).unwrap();
/// println!("moved {} files", report.moved.len());
/// ```
pub fn run(config: &RunConfig) -> Result<RunReport, ConfigError> {
    config.validate()?;

    let sorter_config = SorterConfig::load(config.config_file.as_deref())?;
    let filters = sorter_config.compile_filters()?;
    let mapper = sorter_config.mapper();

    info!(
        "Sorting {} into {} ({:?} mode{})",
        config.source.display(),
        config.target.display(),
        config.mode,
        if config.dry_run { ", dry run" } else { "" }
    );

    let reserved = own_output_files(config);
    let files: Vec<PathBuf> = list_source_files(&config.source)?
        .into_iter()
        .filter(|path| {
            if reserved.iter().any(|own| same_file(path, own)) {
                debug!("Leaving own output file in place: {}", path.display());
                return false;
            }
            if !filters.should_include(path) {
                debug!("Excluded by filter rules: {}", path.display());
                return false;
            }
            true
        })
        .collect();

    let mut report = RunReport::new(&config.source, &config.target, config.mode, config.dry_run);
    let mut planner = PathPlanner::new(&config.target, config.prefix_enabled());
    let progress = OutputFormatter::create_progress_bar(files.len() as u64, config.verbose);

    for path in files {
        progress.set_message(
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        sort_file(&path, config, &mapper, &mut planner, &mut report);
        progress.inc(1);
    }
    progress.finish_and_clear();

    info!(
        "Finished: {} moved, {} skipped",
        report.moved.len(),
        report.skipped.len()
    );
    Ok(report)
}

/// Classifies, plans and moves a single file, recording the outcome.
fn sort_file(
    path: &Path,
    config: &RunConfig,
    mapper: &FileMapper,
    planner: &mut PathPlanner,
    report: &mut RunReport,
) {
    let classification = match mapper.classify(path, config.mode) {
        Ok(classification) => classification,
        Err(e) => {
            warn!("Skipping {}", e);
            report.record_skip(path, e);
            return;
        }
    };

    let mut entry = FileEntry::new(
        path.to_path_buf(),
        classification.category,
        classification.mime_type,
    );
    let destination = planner.plan(&mut entry);
    debug!(
        "{} [{}] -> {}",
        path.display(),
        entry.mime_type.as_deref().unwrap_or("no sniffed type"),
        destination.display()
    );

    if config.dry_run {
        info!(
            "Would move {} to {}",
            path.display(),
            destination.display()
        );
        report.record_move(&entry, destination);
        return;
    }

    match FileOrganizer::move_file(path, &destination) {
        Ok(()) => {
            info!("Moved {} to {}", path.display(), destination.display());
            report.record_move(&entry, destination);
        }
        Err(e) => {
            error!("{}", e);
            report.record_skip(path, e);
        }
    }
}

/// Lists the regular files directly inside `dir`, sorted by name.
pub fn list_source_files(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let unreadable = |e| ConfigError::SourceUnreadable {
        path: dir.to_path_buf(),
        source: e,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(unreadable)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Could not read an entry of {}: {}", dir.display(), e);
                continue;
            }
        };
        if let Ok(file_type) = entry.file_type()
            && file_type.is_file()
        {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Files the run writes itself: the log, its rotated backups and the manifest.
fn own_output_files(config: &RunConfig) -> Vec<PathBuf> {
    let mut files = vec![config.log_file.clone()];
    files.extend((1..=LOG_BACKUPS).map(|index| backup_path(&config.log_file, index)));
    files.extend(config.manifest.clone());
    files
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
