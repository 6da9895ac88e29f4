//! Source file selection and deployment packages.

use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A file picked for upload or packaging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Location on disk.
    pub path: PathBuf,
    /// Path relative to the selection root, `/`-separated.
    pub key: String,
}

/// Selects files under a root with include and exclude globs.
///
/// Include globs are relative to the root; `.` selects the whole root.
/// Matched directories are walked recursively. A file is excluded when an
/// exclude glob matches its relative path or its base name.
#[derive(Debug, Clone)]
pub struct SourceSelector {
    root: PathBuf,
    include: Vec<String>,
    exclude: Vec<Pattern>,
}

impl SourceSelector {
    /// Select everything under `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            include: vec![".".to_string()],
            exclude: Vec::new(),
        }
    }

    /// Replace the include globs. Empty entries are ignored; no entries
    /// keeps the whole root.
    #[must_use]
    pub fn include(mut self, patterns: &[String]) -> Self {
        let patterns: Vec<String> = patterns
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        if !patterns.is_empty() {
            self.include = patterns;
        }
        self
    }

    /// Add exclude globs. Empty entries are ignored.
    ///
    /// # Errors
    ///
    /// Returns error if a pattern is not a valid glob.
    pub fn exclude(mut self, patterns: &[String]) -> Result<Self> {
        for raw in patterns.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
            let pattern = Pattern::new(raw).with_context(|| format!("Invalid exclude pattern '{raw}'"))?;
            self.exclude.push(pattern);
        }
        Ok(self)
    }

    /// Root the keys are relative to.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Matching files, sorted by key and de-duplicated.
    ///
    /// # Errors
    ///
    /// Returns error if a glob is invalid or the file system cannot be read.
    pub fn select(&self) -> Result<Vec<SourceFile>> {
        let mut files = BTreeMap::new();

        for include in &self.include {
            for matched in self.expand(include)? {
                if matched.is_dir() {
                    debug!(dir = %matched.display(), "Walking directory");
                    for entry in WalkDir::new(&matched).sort_by_file_name() {
                        let entry = entry
                            .with_context(|| format!("Failed to walk {}", matched.display()))?;
                        if !entry.file_type().is_dir() {
                            self.consider(entry.path(), &mut files)?;
                        }
                    }
                } else {
                    self.consider(&matched, &mut files)?;
                }
            }
        }

        info!(root = %self.root.display(), count = files.len(), "Selected source files");
        Ok(files
            .into_iter()
            .map(|(key, path)| SourceFile { path, key })
            .collect())
    }

    fn expand(&self, include: &str) -> Result<Vec<PathBuf>> {
        let include = include.trim_start_matches("./");
        if include.is_empty() || include == "." {
            return Ok(vec![self.root.clone()]);
        }

        let root = Pattern::escape(&self.root.to_string_lossy());
        let pattern = format!("{}/{include}", root.trim_end_matches('/'));
        let entries = glob::glob_with(&pattern, MATCH_OPTIONS)
            .with_context(|| format!("Invalid include pattern '{include}'"))?;

        let mut matches = Vec::new();
        for entry in entries {
            matches.push(entry.context("Failed to read include match")?);
        }
        if matches.is_empty() {
            debug!(pattern = %include, "Include pattern matched nothing");
        }
        Ok(matches)
    }

    fn consider(&self, path: &Path, files: &mut BTreeMap<String, PathBuf>) -> Result<()> {
        let key = self.relative_key(path)?;
        let base_name = key.rsplit('/').next().unwrap_or(&key);

        let excluded = self.exclude.iter().any(|pattern| {
            pattern.matches_with(&key, MATCH_OPTIONS) || pattern.matches_with(base_name, MATCH_OPTIONS)
        });
        if excluded {
            debug!(file = %key, "Excluded");
        } else {
            files.entry(key).or_insert_with(|| path.to_path_buf());
        }
        Ok(())
    }

    fn relative_key(&self, path: &Path) -> Result<String> {
        let relative = path.strip_prefix(&self.root).with_context(|| {
            format!("{} is outside of {}", path.display(), self.root.display())
        })?;

        let segments: Vec<String> = relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        Ok(segments.join("/"))
    }
}

/// Pack files into an in-memory deflated zip archive.
///
/// Entry names are the file keys. Unix permissions are preserved.
///
/// # Errors
///
/// Returns error if a file cannot be read or the archive cannot be written.
pub fn build_zip(files: &[SourceFile]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for file in files {
        let contents =
            fs::read(&file.path).with_context(|| format!("Failed to read {}", file.path.display()))?;

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(file_mode(&file.path)?);

        writer
            .start_file(file.key.as_str(), options)
            .with_context(|| format!("Failed to add {} to archive", file.key))?;
        writer.write_all(&contents)?;
        debug!(file = %file.key, bytes = contents.len(), "Added to archive");
    }

    let archive = writer.finish().context("Failed to finish archive")?.into_inner();
    info!(files = files.len(), bytes = archive.len(), "Archive built");
    Ok(archive)
}

#[cfg(unix)]
fn file_mode(path: &Path) -> Result<u32> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::metadata(path).with_context(|| format!("Failed to stat {}", path.display()))?;
    Ok(metadata.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn file_mode(_path: &Path) -> Result<u32> {
    Ok(0o644)
}
