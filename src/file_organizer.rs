//! Destination planning and file moves.
//!
//! This module computes where each file goes (`target / category / [prefix]name`),
//! resolves name collisions without ever overwriting, moves files into place,
//! and records what happened in a [`RunReport`].

use crate::config::SortMode;
use crate::file_category::Category;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

/// Errors that affect a single file. The run logs them and moves on.
#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error("Failed to detect type of {}: {source}", path.display())]
    ClassificationFailed { path: PathBuf, source: io::Error },

    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreationFailed { path: PathBuf, source: io::Error },

    #[error("Failed to move {} to {}: {source}", from.display(), to.display())]
    FileMoveFailure {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    #[error("Failed to write manifest {}: {source}", path.display())]
    ManifestWriteFailed { path: PathBuf, source: io::Error },
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// One file on its way through a run.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Where the file sits in the source directory.
    pub path: PathBuf,
    /// File name as found, before any prefix or suffix.
    pub name: OsString,
    pub category: Category,
    /// Sniffed MIME type; `None` in extension mode or when nothing matched.
    pub mime_type: Option<String>,
    /// Filled in by [`PathPlanner::plan`].
    pub destination: Option<PathBuf>,
}

impl FileEntry {
    pub fn new(path: PathBuf, category: Category, mime_type: Option<String>) -> Self {
        let name = path.file_name().map(OsStr::to_os_string).unwrap_or_default();
        Self {
            path,
            name,
            category,
            mime_type,
            destination: None,
        }
    }
}

/// Returns the `YYYY-MM-` prefix for a modification time, in local time.
///
/// # Examples
///
/// ```
/// use chrono::{Local, TimeZone};
/// use filesorter::file_organizer::year_month_prefix;
///
/// let mid_march = Local.with_ymd_and_hms(2021, 3, 15, 12, 0, 0).unwrap();
/// assert_eq!(year_month_prefix(mid_march.into()), "2021-03-");
/// ```
pub fn year_month_prefix(modified: SystemTime) -> String {
    DateTime::<Local>::from(modified).format("%Y-%m-").to_string()
}

/// Appends `_{n}` to the stem of `name`, keeping the last extension.
fn suffixed_name(name: &OsStr, n: usize) -> OsString {
    let path = Path::new(name);
    let stem = path.file_stem().unwrap_or(name);
    let mut out = stem.to_os_string();
    out.push(format!("_{n}"));
    if let Some(ext) = path.extension() {
        out.push(".");
        out.push(ext);
    }
    out
}

/// Computes destination paths for a run.
///
/// Remembers every path it hands out so two files in the same run never
/// share a destination, even in a dry run where nothing lands on disk.
#[derive(Debug)]
pub struct PathPlanner {
    target: PathBuf,
    prefix: bool,
    reserved: HashSet<PathBuf>,
}

impl PathPlanner {
    pub fn new(target: impl Into<PathBuf>, prefix: bool) -> Self {
        Self {
            target: target.into(),
            prefix,
            reserved: HashSet::new(),
        }
    }

    /// The file name the entry will carry in its category folder, before
    /// collision handling.
    pub fn base_name(&self, entry: &FileEntry) -> OsString {
        if !self.prefix {
            return entry.name.clone();
        }
        let modified = fs::metadata(&entry.path)
            .and_then(|meta| meta.modified())
            .unwrap_or_else(|e| {
                tracing::warn!(
                    "Could not get mtime for {}: {}; using current time",
                    entry.path.display(),
                    e
                );
                SystemTime::now()
            });
        let mut name = OsString::from(year_month_prefix(modified));
        name.push(&entry.name);
        name
    }

    /// Plans the destination for `entry`, stores it on the entry and returns it.
    pub fn plan(&mut self, entry: &mut FileEntry) -> PathBuf {
        let folder = self.target.join(entry.category.dir_name());
        let base_name = self.base_name(entry);
        let destination = self.free_path(&folder, &base_name);
        self.reserved.insert(destination.clone());
        entry.destination = Some(destination.clone());
        destination
    }

    fn is_taken(&self, path: &Path) -> bool {
        self.reserved.contains(path) || path.symlink_metadata().is_ok()
    }

    fn free_path(&self, folder: &Path, name: &OsStr) -> PathBuf {
        let candidate = folder.join(name);
        if !self.is_taken(&candidate) {
            return candidate;
        }
        (1..)
            .map(|n| folder.join(suffixed_name(name, n)))
            .find(|path| !self.is_taken(path))
            .unwrap_or(candidate)
    }
}

/// Moves files into their planned destinations.
pub struct FileOrganizer;

impl FileOrganizer {
    /// Moves `from` to `to`, creating `to`'s parent directory when needed.
    ///
    /// A plain rename is tried first. When the two paths are on different
    /// filesystems the file is copied and the original removed; that fallback
    /// is not atomic.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use filesorter::file_organizer::FileOrganizer;
    /// use std::path::Path;
    ///
    /// match FileOrganizer::move_file(
    ///     Path::new("/home/me/Downloads/photo.png"),
    ///     Path::new("/home/me/Documents/Images/photo.png"),
    /// ) {
    ///     Ok(()) => println!("moved"),
    ///     Err(e) => eprintln!("{}", e),
    /// }
    /// ```
    pub fn move_file(from: &Path, to: &Path) -> OrganizeResult<()> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(|e| OrganizeError::DirectoryCreationFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let move_failure = |e: io::Error| OrganizeError::FileMoveFailure {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source: e,
        };

        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                tracing::debug!(
                    "{} is on another filesystem, copying instead",
                    to.display()
                );
                Self::copy_then_remove(from, to).map_err(move_failure)
            }
            Err(e) => Err(move_failure(e)),
        }
    }

    /// Copies `from` to `to`, then removes `from`. On any failure `to` is
    /// removed again and `from` is left untouched.
    fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
        if let Err(e) = fs::copy(from, to) {
            // A failed copy can leave a truncated file behind.
            let _ = fs::remove_file(to);
            return Err(e);
        }
        if let Err(e) = fs::remove_file(from) {
            let _ = fs::remove_file(to);
            return Err(e);
        }
        Ok(())
    }
}

/// A file that was moved (or would be, in a dry run).
#[derive(Debug, Clone, Serialize)]
pub struct MovedFile {
    pub source: PathBuf,
    /// Final path under the target, prefix and collision suffix included.
    pub destination: PathBuf,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// A file that was left where it was, and why.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    /// Display text of the error that stopped the file.
    pub reason: String,
}

/// Everything one run did.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// RFC 3339 timestamp of when the run started.
    pub started_at: String,
    pub source: PathBuf,
    pub target: PathBuf,
    pub mode: SortMode,
    /// When set, `moved` lists planned destinations and nothing was touched.
    pub dry_run: bool,
    /// Files moved, in the order they were processed.
    pub moved: Vec<MovedFile>,
    /// Files left in the source because classification or the move failed.
    pub skipped: Vec<SkippedFile>,
}

impl RunReport {
    pub fn new(source: &Path, target: &Path, mode: SortMode, dry_run: bool) -> Self {
        Self {
            started_at: Local::now().to_rfc3339(),
            source: source.to_path_buf(),
            target: target.to_path_buf(),
            mode,
            dry_run,
            moved: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn record_move(&mut self, entry: &FileEntry, destination: PathBuf) {
        self.moved.push(MovedFile {
            source: entry.path.clone(),
            destination,
            category: entry.category,
            mime_type: entry.mime_type.clone(),
        });
    }

    pub fn record_skip(&mut self, path: &Path, reason: impl ToString) {
        self.skipped.push(SkippedFile {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        });
    }

    /// Number of moved files per category folder.
    pub fn category_counts(&self) -> std::collections::BTreeMap<Category, usize> {
        let mut counts = std::collections::BTreeMap::new();
        for moved in &self.moved {
            *counts.entry(moved.category).or_insert(0) += 1;
        }
        counts
    }

    /// Writes the report as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> OrganizeResult<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            OrganizeError::ManifestWriteFailed {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidData, e),
            }
        })?;
        fs::write(path, json).map_err(|e| OrganizeError::ManifestWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }
}
