use crate::error::{Error, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directories that never hold documented production code.
const SKIPPED_DIRS: &[&str] = &["target", "tests", "benches", "examples"];

/// File scanner for traversing source trees.
///
/// The `FileScanner` recursively walks through a directory to find all source files with a
/// given extension. It automatically skips directories that should be ignored, such as `target`,
/// test and example directories, and hidden directories (those starting with `.`), as well as
/// test files like `tests.rs` or `parser_test.rs`.
///
/// # Example
///
/// ```no_run
/// use apidoc_from_source::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./my-project/src"), "rs");
/// let result = scanner.scan().unwrap();
/// println!("Found {} source files", result.source_files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
    extension: String,
}

/// Result of directory scanning operation.
///
/// Contains the list of discovered source files and any warnings encountered during scanning.
pub struct ScanResult {
    /// Paths of all discovered source files, sorted
    pub source_files: Vec<PathBuf>,
    /// Warning messages for any issues encountered (e.g., inaccessible directories)
    pub warnings: Vec<String>,
}

impl FileScanner {
    /// Creates a new `FileScanner` for the specified root directory.
    ///
    /// # Arguments
    ///
    /// * `root_path` - The root directory to scan
    /// * `extension` - Extension of the files to collect, without the dot
    pub fn new(root_path: PathBuf, extension: &str) -> Self {
        Self {
            root_path,
            extension: extension.to_string(),
        }
    }

    /// Scans the directory tree and collects all matching files.
    ///
    /// This method recursively traverses the directory tree starting from the root path. It
    /// automatically skips:
    /// - The `target`, `tests`, `benches` and `examples` directories
    /// - Hidden directories (starting with `.`)
    /// - Test files (`tests.rs`, `*_test.rs`, `*_tests.rs`)
    ///
    /// If any directories or files cannot be accessed, warnings are logged and added to
    /// the result, but scanning continues. Files are returned in path order so that
    /// document order is stable across runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the root path is not a directory.
    pub fn scan(&self) -> Result<ScanResult> {
        if !self.root_path.is_dir() {
            return Err(Error::InvalidArgument(format!(
                "项目路径不是目录: {}",
                self.root_path.display()
            )));
        }

        let mut source_files = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.root_path)
            .into_iter()
            .filter_entry(|e| {
                // Don't filter the root directory itself
                if e.path() == self.root_path {
                    return true;
                }

                let file_name = e.file_name().to_string_lossy();
                let is_hidden = file_name.starts_with('.');
                let is_skipped_dir =
                    e.file_type().is_dir() && SKIPPED_DIRS.contains(&&*file_name);

                !is_hidden && !is_skipped_dir
            })
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();

                    if path.is_file() && self.is_source_file(path) {
                        source_files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    // Record warning for inaccessible directories/files
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        source_files.sort();
        debug!(
            "Found {} source files under {}",
            source_files.len(),
            self.root_path.display()
        );

        Ok(ScanResult {
            source_files,
            warnings,
        })
    }

    fn is_source_file(&self, path: &Path) -> bool {
        if path.extension().and_then(|s| s.to_str()) != Some(self.extension.as_str()) {
            return false;
        }
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        !(stem == "tests" || stem.ends_with("_test") || stem.ends_with("_tests"))
    }
}
