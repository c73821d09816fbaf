//! filesorter - sort a directory's files into category folders
//!
//! This library classifies files by sniffed MIME type or by extension, plans a
//! destination under a target directory (optionally prefixed with the file's
//! `YYYY-MM-` modification month), and moves each file there without ever
//! overwriting an existing one.

pub mod cli;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod logging;
pub mod output;

pub use cli::{Cli, run};
pub use config::{ConfigError, RunConfig, SortMode, SorterConfig};
pub use file_category::{Category, FileMapper};
pub use file_organizer::{FileOrganizer, OrganizeError, PathPlanner, RunReport};
