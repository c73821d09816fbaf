//! Run configuration, file filtering and category overrides.
//!
//! A run is described by an immutable [`RunConfig`] built from the command
//! line. An optional TOML file adds filtering rules and extra category
//! mappings:
//!
//! ```toml
//! [filters]
//! enable_hidden_files = false
//!
//! [filters.exclude]
//! filenames = ["Thumbs.db"]
//! patterns = ["*.part"]
//! extensions = ["crdownload"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//!
//! [categories.extensions]
//! heic = "Images"
//!
//! [categories.mime]
//! "application/x-custom" = "Code"
//! ```

use crate::file_category::{Category, FileMapper};
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".filesorter.toml";

/// Default log file, relative to the working directory.
pub const DEFAULT_LOG_FILE: &str = "filesorter.log";

/// Fatal errors that stop a run before any file is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Source is not a directory: {}", .0.display())]
    SourceNotDirectory(PathBuf),

    #[error("Target exists but is not a directory: {}", .0.display())]
    TargetNotDirectory(PathBuf),

    #[error("Could not determine a default {0} directory; pass it explicitly")]
    NoDefaultDirectory(&'static str),

    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("Invalid glob pattern '{0}'")]
    InvalidGlobPattern(String),

    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },

    #[error("Cannot read directory {}: {source}", path.display())]
    SourceUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot open log file {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Logging is already initialised")]
    LoggingAlreadyInitialised,

    #[error("IO error reading configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// How files are classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Sniff the content type from the file's leading bytes.
    #[default]
    Mime,
    /// Look up the lowercase file extension.
    Extension,
}

/// Everything a single run needs. Built once and never mutated.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory whose top-level files are sorted.
    pub source: PathBuf,
    /// Directory the category folders are created in.
    pub target: PathBuf,
    pub mode: SortMode,
    /// Add the `YYYY-MM-` prefix in MIME mode too.
    pub rename: bool,
    pub verbose: bool,
    pub log_file: PathBuf,
    pub dry_run: bool,
    /// Where to write the JSON run report, if anywhere.
    pub manifest: Option<PathBuf>,
    /// Explicit filter/category TOML; `None` falls back to the lookup chain.
    pub config_file: Option<PathBuf>,
}

impl RunConfig {
    /// Creates a config with defaults for everything but the two directories.
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            mode: SortMode::default(),
            rename: false,
            verbose: false,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            dry_run: false,
            manifest: None,
            config_file: None,
        }
    }

    /// Whether destination names get a `YYYY-MM-` prefix.
    ///
    /// Extension mode always renames.
    pub fn prefix_enabled(&self) -> bool {
        self.rename || self.mode == SortMode::Extension
    }

    /// Checks the source and target directories.
    ///
    /// A missing target is fine; it is created on the first move.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.source.exists() {
            return Err(ConfigError::SourceNotFound(self.source.clone()));
        }
        if !self.source.is_dir() {
            return Err(ConfigError::SourceNotDirectory(self.source.clone()));
        }
        if self.target.exists() && !self.target.is_dir() {
            return Err(ConfigError::TargetNotDirectory(self.target.clone()));
        }
        Ok(())
    }
}

/// Contents of the optional TOML configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SorterConfig {
    #[serde(default)]
    pub filters: FilterRules,

    #[serde(default)]
    pub categories: CategoryOverrides,
}

/// Root-level filter rules configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether to include hidden files (starting with "."). Defaults to false.
    #[serde(default = "default_enable_hidden_files")]
    pub enable_hidden_files: bool,

    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Rules for including files (whitelist, overrides exclude rules).
    #[serde(default)]
    pub include: IncludeRules,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            enable_hidden_files: default_enable_hidden_files(),
            exclude: ExcludeRules::default(),
            include: IncludeRules::default(),
        }
    }
}

fn default_enable_hidden_files() -> bool {
    false
}

/// Rules for excluding files from sorting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact filenames to exclude (e.g., "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns matched against the file name (e.g., "*.part").
    #[serde(default)]
    pub patterns: Vec<String>,

    /// File extensions to exclude, case-insensitive.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Regex patterns matched against the file name.
    #[serde(default)]
    pub regex: Vec<String>,
}

/// Glob patterns that override every exclude rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeRules {
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// Extra classification entries layered over the built-in tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryOverrides {
    #[serde(default)]
    pub extensions: BTreeMap<String, Category>,

    #[serde(default)]
    pub mime: BTreeMap<String, Category>,
}

impl CategoryOverrides {
    /// Applies the overrides to `mapper`, replacing built-in entries.
    pub fn apply(&self, mapper: &mut FileMapper) {
        for (ext, category) in &self.extensions {
            mapper.add_extension_mapping(ext, *category);
        }
        for (mime, category) in &self.mime {
            mapper.add_mime_mapping(mime, *category);
        }
    }
}

impl SorterConfig {
    /// Load configuration, falling back to defaults.
    ///
    /// Lookup order:
    /// 1. `config_path`, when given (must exist)
    /// 2. `.filesorter.toml` in the current directory
    /// 3. `~/.config/filesorter/config.toml`
    /// 4. built-in defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.is_file() {
            return Self::load_from_file(&local_config);
        }

        if let Some(config_dir) = dirs::home_dir().map(|home| home.join(".config")) {
            let user_config = config_dir.join("filesorter").join("config.toml");
            if user_config.is_file() {
                return Self::load_from_file(&user_config);
            }
        }

        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parses configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// Builds the category mapper with any overrides applied.
    pub fn mapper(&self) -> FileMapper {
        let mut mapper = FileMapper::default();
        self.categories.apply(&mut mapper);
        mapper
    }

    /// Compile the filter rules for matching.
    ///
    /// # Errors
    ///
    /// Returns an error if any regex or glob pattern is invalid.
    pub fn compile_filters(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(&self.filters)
    }
}

/// Pre-compiled filter rules.
pub struct CompiledFilters {
    enable_hidden_files: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
        })
        .collect()
}

impl CompiledFilters {
    fn new(rules: &FilterRules) -> Result<Self, ConfigError> {
        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            enable_hidden_files: rules.enable_hidden_files,
            exclude_filenames: rules.exclude.filenames.iter().cloned().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_patterns: compile_globs(&rules.exclude.patterns)?,
            exclude_regexes,
            include_patterns: compile_globs(&rules.include.patterns)?,
        })
    }

    /// Check if a file should be sorted.
    ///
    /// Checks run in this order, stopping at the first decision:
    /// 1. Include patterns - if matched, always include
    /// 2. Hidden file filter - if hidden and disabled, exclude
    /// 3. Exact filename match - exclude
    /// 4. File extension match - exclude
    /// 5. Glob pattern match - exclude
    /// 6. Regex pattern match - exclude
    /// 7. Default: include
    pub fn should_include(&self, file_path: &Path) -> bool {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self
            .include_patterns
            .iter()
            .any(|pattern| pattern.matches(&file_name))
        {
            return true;
        }

        if !self.enable_hidden_files && file_name.starts_with('.') {
            return false;
        }

        if self.exclude_filenames.contains(file_name.as_ref()) {
            return false;
        }

        if let Some(ext) = file_path.extension()
            && self
                .exclude_extensions
                .contains(&ext.to_string_lossy().to_lowercase())
        {
            return false;
        }

        if self
            .exclude_patterns
            .iter()
            .any(|pattern| pattern.matches(&file_name))
        {
            return false;
        }

        !self
            .exclude_regexes
            .iter()
            .any(|regex| regex.is_match(&file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn compiled(toml_src: &str) -> CompiledFilters {
        SorterConfig::parse(toml_src)
            .unwrap()
            .compile_filters()
            .unwrap()
    }

    #[test]
    fn test_prefix_enabled() {
        let mut config = RunConfig::new("/src", "/dst");
        assert!(!config.prefix_enabled());
        config.rename = true;
        assert!(config.prefix_enabled());
        config.rename = false;
        config.mode = SortMode::Extension;
        assert!(config.prefix_enabled());
    }

    #[test]
    fn test_validate_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let config = RunConfig::new(temp_dir.path().join("nope"), temp_dir.path());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SourceNotFound(_))
        ));
    }

    #[test]
    fn test_validate_source_is_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file.txt");
        fs::write(&file, "x").unwrap();
        let config = RunConfig::new(&file, temp_dir.path());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SourceNotDirectory(_))
        ));
    }

    #[test]
    fn test_validate_target_is_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file.txt");
        fs::write(&file, "x").unwrap();
        let config = RunConfig::new(temp_dir.path(), &file);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TargetNotDirectory(_))
        ));
    }

    #[test]
    fn test_validate_missing_target_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        let config = RunConfig::new(temp_dir.path(), temp_dir.path().join("later"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_hides_hidden_files() {
        let filters = SorterConfig::default().compile_filters().unwrap();
        assert!(!filters.should_include(Path::new(".DS_Store")));
        assert!(filters.should_include(Path::new("photo.jpg")));
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = SorterConfig::parse("").unwrap();
        assert!(!config.filters.enable_hidden_files);
        assert!(config.categories.extensions.is_empty());
    }

    #[test]
    fn test_hidden_files_enabled() {
        let filters = compiled("[filters]\nenable_hidden_files = true\n");
        assert!(filters.should_include(Path::new(".bashrc")));
    }

    #[test]
    fn test_exclude_rules() {
        let filters = compiled(
            r#"
[filters.exclude]
filenames = ["Thumbs.db"]
patterns = ["*.part"]
extensions = [".CRDOWNLOAD", "tmp"]
regex = ['^~\$']
"#,
        );
        assert!(!filters.should_include(Path::new("/dl/Thumbs.db")));
        assert!(!filters.should_include(Path::new("/dl/movie.mkv.part")));
        assert!(!filters.should_include(Path::new("/dl/setup.crdownload")));
        assert!(!filters.should_include(Path::new("/dl/scratch.TMP")));
        assert!(!filters.should_include(Path::new("/dl/~$report.docx")));
        assert!(filters.should_include(Path::new("/dl/report.docx")));
    }

    #[test]
    fn test_glob_matches_file_name_only() {
        let filters = compiled("[filters.exclude]\npatterns = [\"draft-?.txt\"]\n");
        assert!(!filters.should_include(Path::new("/home/user/Downloads/draft-1.txt")));
        assert!(filters.should_include(Path::new("/home/user/Downloads/draft-12.txt")));
    }

    #[test]
    fn test_include_overrides_exclude() {
        let filters = compiled(
            r#"
[filters.exclude]
extensions = ["log"]

[filters.include]
patterns = [".keep", "important.log"]
"#,
        );
        assert!(filters.should_include(Path::new(".keep")));
        assert!(filters.should_include(Path::new("important.log")));
        assert!(!filters.should_include(Path::new("debug.log")));
        assert!(!filters.should_include(Path::new(".other")));
    }

    #[test]
    fn test_invalid_patterns_are_errors() {
        let bad_regex = SorterConfig::parse("[filters.exclude]\nregex = [\"[invalid(\"]\n")
            .unwrap()
            .compile_filters();
        assert!(matches!(
            bad_regex,
            Err(ConfigError::InvalidRegexPattern { .. })
        ));

        let bad_glob = SorterConfig::parse("[filters.exclude]\npatterns = [\"[invalid\"]\n")
            .unwrap()
            .compile_filters();
        assert!(matches!(bad_glob, Err(ConfigError::InvalidGlobPattern(_))));
    }

    #[test]
    fn test_category_overrides() {
        let config = SorterConfig::parse(
            r#"
[categories.extensions]
heic = "Images"
json = "Text"
blend = "Disk_Images"

[categories.mime]
"application/x-custom" = "Code"
"#,
        )
        .unwrap();
        let mapper = config.mapper();
        assert_eq!(mapper.extension_to_category("json"), Some(Category::Text));
        assert_eq!(
            mapper.extension_to_category("blend"),
            Some(Category::DiskImages)
        );
        assert_eq!(
            mapper.mime_to_category("application/x-custom"),
            Some(Category::Code)
        );
    }

    #[test]
    fn test_unknown_category_is_invalid() {
        let result = SorterConfig::parse("[categories.extensions]\nfoo = \"../escape\"\n");
        assert!(matches!(result, Err(ConfigError::ConfigInvalid(_))));
    }

    #[test]
    fn test_explicit_missing_config_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = SorterConfig::load(Some(&temp_dir.path().join("missing.toml")));
        assert!(matches!(result, Err(ConfigError::ConfigNotFound(_))));
    }

    #[test]
    fn test_load_explicit_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("sorter.toml");
        fs::write(&path, "[filters]\nenable_hidden_files = true\n").unwrap();
        let config = SorterConfig::load(Some(&path)).unwrap();
        assert!(config.filters.enable_hidden_files);
    }
}
