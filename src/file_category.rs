//! File classification for sorting files into category folders.
//!
//! Files are classified either by sniffing their content (magic bytes, via the
//! `infer` crate) or by looking up their lowercase extension. Both paths end in
//! a [`Category`], whose folder name is fixed and filesystem-safe.
//!
//! # Examples
//!
//! ```
//! use filesorter::file_category::{Category, FileMapper};
//!
//! let mapper = FileMapper::default();
//! assert_eq!(mapper.mime_to_category("image/png"), Some(Category::Images));
//! assert_eq!(mapper.mime_to_category("audio/mpeg"), Some(Category::Music));
//! assert_eq!(mapper.extension_to_category("PDF"), Some(Category::Pdf));
//! ```

use crate::config::SortMode;
use crate::file_organizer::{OrganizeError, OrganizeResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Destination category for a file.
///
/// Each variant maps to exactly one subfolder of the target directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Images,
    Videos,
    Music,
    Compressed,
    #[serde(rename = "PDF")]
    Pdf,
    Word,
    Excel,
    Presentations,
    #[serde(rename = "Disk_Images")]
    DiskImages,
    #[serde(rename = "PCAP")]
    Pcap,
    Code,
    Text,
    Ebooks,
    Executables,
    Calendar,
    Conf,
    /// Anything that could not be classified.
    Other,
}

impl Category {
    /// Every category, in folder-name order.
    pub const ALL: [Category; 17] = [
        Category::Calendar,
        Category::Code,
        Category::Compressed,
        Category::Conf,
        Category::DiskImages,
        Category::Ebooks,
        Category::Excel,
        Category::Executables,
        Category::Images,
        Category::Music,
        Category::Other,
        Category::Pcap,
        Category::Pdf,
        Category::Presentations,
        Category::Text,
        Category::Videos,
        Category::Word,
    ];

    /// Returns the directory name for this category.
    ///
    /// # Examples
    ///
    /// ```
    /// use filesorter::file_category::Category;
    ///
    /// assert_eq!(Category::Images.dir_name(), "Images");
    /// assert_eq!(Category::DiskImages.dir_name(), "Disk_Images");
    /// assert_eq!(Category::Other.dir_name(), "Other");
    /// ```
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Images => "Images",
            Category::Videos => "Videos",
            Category::Music => "Music",
            Category::Compressed => "Compressed",
            Category::Pdf => "PDF",
            Category::Word => "Word",
            Category::Excel => "Excel",
            Category::Presentations => "Presentations",
            Category::DiskImages => "Disk_Images",
            Category::Pcap => "PCAP",
            Category::Code => "Code",
            Category::Text => "Text",
            Category::Ebooks => "Ebooks",
            Category::Executables => "Executables",
            Category::Calendar => "Calendar",
            Category::Conf => "Conf",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// The outcome of classifying one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    /// The sniffed MIME type, if content sniffing ran and recognised the file.
    pub mime_type: Option<String>,
}

/// Maps MIME types and file extensions to categories.
///
/// Lookups are case-insensitive. MIME lookups try the exact type first and
/// then the major-type families (`image/`, `video/`, `audio/`).
#[derive(Debug, Clone)]
pub struct FileMapper {
    mime_map: HashMap<String, Category>,
    mime_prefixes: Vec<(String, Category)>,
    extension_map: HashMap<String, Category>,
}

impl FileMapper {
    /// Creates a new `FileMapper` with all standard mappings.
    pub fn new() -> Self {
        let mut mapper = Self {
            mime_map: HashMap::new(),
            mime_prefixes: Vec::new(),
            extension_map: HashMap::new(),
        };
        mapper.populate_standard_mappings();
        mapper
    }

    fn populate_standard_mappings(&mut self) {
        // Major-type families
        self.add_mime_prefix("image/", Category::Images);
        self.add_mime_prefix("video/", Category::Videos);
        self.add_mime_prefix("audio/", Category::Music);

        // Archives
        for mime in [
            "application/zip",
            "application/x-tar",
            "application/gzip",
            "application/x-gzip",
            "application/x-bzip2",
            "application/x-xz",
            "application/zstd",
            "application/x-7z-compressed",
            "application/x-rar-compressed",
            "application/vnd.rar",
        ] {
            self.add_mime_mapping(mime, Category::Compressed);
        }

        self.add_mime_mapping("application/pdf", Category::Pdf);

        // Office documents
        self.add_mime_mapping("application/msword", Category::Word);
        self.add_mime_mapping(
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            Category::Word,
        );
        self.add_mime_mapping("application/rtf", Category::Word);
        self.add_mime_mapping("application/vnd.oasis.opendocument.text", Category::Word);
        self.add_mime_mapping("application/vnd.ms-excel", Category::Excel);
        self.add_mime_mapping(
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Category::Excel,
        );
        self.add_mime_mapping(
            "application/vnd.oasis.opendocument.spreadsheet",
            Category::Excel,
        );
        self.add_mime_mapping("application/vnd.ms-powerpoint", Category::Presentations);
        self.add_mime_mapping(
            "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            Category::Presentations,
        );
        self.add_mime_mapping(
            "application/vnd.oasis.opendocument.presentation",
            Category::Presentations,
        );

        // Disk images and captures
        self.add_mime_mapping("application/x-iso9660-image", Category::DiskImages);
        self.add_mime_mapping("application/x-apple-diskimage", Category::DiskImages);
        self.add_mime_mapping("application/vnd.tcpdump.pcap", Category::Pcap);
        self.add_mime_mapping("application/x-pcapng", Category::Pcap);

        // Code and text
        self.add_mime_mapping("text/x-python", Category::Code);
        self.add_mime_mapping("application/javascript", Category::Code);
        self.add_mime_mapping("text/html", Category::Code);
        self.add_mime_mapping("text/css", Category::Code);
        self.add_mime_mapping("text/x-shellscript", Category::Code);
        self.add_mime_mapping("application/x-sh", Category::Code);
        self.add_mime_mapping("application/wasm", Category::Code);
        self.add_mime_mapping("text/plain", Category::Text);
        self.add_mime_mapping("text/markdown", Category::Text);

        self.add_mime_mapping("application/epub+zip", Category::Ebooks);
        self.add_mime_mapping("application/x-mobipocket-ebook", Category::Ebooks);

        // Executables
        for mime in [
            "application/x-msdownload",
            "application/vnd.microsoft.portable-executable",
            "application/x-executable",
            "application/x-mach-binary",
            "application/vnd.debian.binary-package",
            "application/x-rpm",
            "application/vnd.android.package-archive",
        ] {
            self.add_mime_mapping(mime, Category::Executables);
        }

        self.add_mime_mapping("text/calendar", Category::Calendar);

        // Extensions
        let table: &[(&[&str], Category)] = &[
            (
                &[
                    "png", "jpg", "jpeg", "gif", "bmp", "tif", "tiff", "webp", "svg", "ico",
                    "heic", "heif", "avif", "raw", "cr2", "nef",
                ],
                Category::Images,
            ),
            (
                &[
                    "mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "m4v", "mpg", "mpeg", "3gp",
                ],
                Category::Videos,
            ),
            (
                &["mp3", "wav", "flac", "aac", "ogg", "oga", "m4a", "wma", "opus", "aiff", "mid"],
                Category::Music,
            ),
            (
                &["zip", "tar", "gz", "tgz", "bz2", "xz", "zst", "7z", "rar"],
                Category::Compressed,
            ),
            (&["pdf"], Category::Pdf),
            (&["doc", "docx", "odt", "rtf"], Category::Word),
            (&["xls", "xlsx", "ods", "csv"], Category::Excel),
            (&["ppt", "pptx", "odp", "key"], Category::Presentations),
            (&["iso", "dmg", "img", "vhd", "vmdk"], Category::DiskImages),
            (&["pcap", "pcapng", "cap"], Category::Pcap),
            (
                &[
                    "py", "js", "ts", "html", "htm", "css", "sh", "bash", "rs", "c", "h", "cpp",
                    "hpp", "java", "go", "rb", "php", "json", "xml", "yaml", "yml", "toml", "sql",
                ],
                Category::Code,
            ),
            (&["txt", "md", "log", "rst"], Category::Text),
            (&["epub", "mobi", "azw", "azw3", "fb2"], Category::Ebooks),
            (
                &["exe", "msi", "bat", "deb", "rpm", "apk", "appimage", "bin"],
                Category::Executables,
            ),
            (&["ics", "ical", "vcs"], Category::Calendar),
            (&["conf", "cfg", "ini", "env"], Category::Conf),
        ];
        for (extensions, category) in table {
            for ext in *extensions {
                self.add_extension_mapping(ext, *category);
            }
        }
    }

    /// Adds an exact MIME type to category mapping.
    pub fn add_mime_mapping(&mut self, mime: &str, category: Category) {
        self.mime_map.insert(mime.to_lowercase(), category);
    }

    /// Adds a MIME prefix (such as `image/`) to category mapping.
    pub fn add_mime_prefix(&mut self, prefix: &str, category: Category) {
        self.mime_prefixes.push((prefix.to_lowercase(), category));
    }

    /// Adds a file extension to category mapping. A leading dot is ignored.
    pub fn add_extension_mapping(&mut self, ext: &str, category: Category) {
        self.extension_map
            .insert(ext.trim_start_matches('.').to_lowercase(), category);
    }

    /// Maps a MIME type to a category.
    ///
    /// # Examples
    ///
    /// ```
    /// use filesorter::file_category::{Category, FileMapper};
    ///
    /// let mapper = FileMapper::default();
    /// assert_eq!(mapper.mime_to_category("image/x-canon-cr2"), Some(Category::Images));
    /// assert_eq!(mapper.mime_to_category("application/pdf"), Some(Category::Pdf));
    /// assert_eq!(mapper.mime_to_category("unknown/type"), None);
    /// ```
    pub fn mime_to_category(&self, mime_type: &str) -> Option<Category> {
        let mime = mime_type.to_lowercase();
        if let Some(category) = self.mime_map.get(&mime) {
            return Some(*category);
        }
        self.mime_prefixes
            .iter()
            .find(|(prefix, _)| mime.starts_with(prefix.as_str()))
            .map(|(_, category)| *category)
    }

    /// Maps a file extension to a category.
    pub fn extension_to_category(&self, ext: &str) -> Option<Category> {
        self.extension_map.get(&ext.to_lowercase()).copied()
    }

    /// Maps a path's extension to a category, `Other` when absent or unknown.
    pub fn categorize_by_extension(&self, path: &Path) -> Category {
        path.extension()
            .and_then(|ext| self.extension_to_category(&ext.to_string_lossy()))
            .unwrap_or(Category::Other)
    }

    /// Determines the category for a file given its sniffed MIME type and path.
    ///
    /// The MIME type wins when it is mapped; otherwise the extension is used,
    /// and `Category::Other` is the final fallback.
    pub fn categorize(&self, mime_type: Option<&str>, path: &Path) -> Category {
        if let Some(mime) = mime_type
            && let Some(category) = self.mime_to_category(mime)
        {
            return category;
        }
        self.categorize_by_extension(path)
    }

    /// Classifies the file at `path` according to `mode`.
    ///
    /// Extension mode never touches the file. MIME mode reads the file header,
    /// so an unreadable file yields [`OrganizeError::ClassificationFailed`].
    pub fn classify(&self, path: &Path, mode: SortMode) -> OrganizeResult<Classification> {
        match mode {
            SortMode::Extension => Ok(Classification {
                category: self.categorize_by_extension(path),
                mime_type: None,
            }),
            SortMode::Mime => {
                let kind = infer::get_from_path(path).map_err(|e| {
                    OrganizeError::ClassificationFailed {
                        path: path.to_path_buf(),
                        source: e,
                    }
                })?;
                let mime_type = kind.map(|k| k.mime_type().to_string());
                Ok(Classification {
                    category: self.categorize(mime_type.as_deref(), path),
                    mime_type,
                })
            }
        }
    }
}

impl Default for FileMapper {
    fn default() -> Self {
        Self::new()
    }
}
