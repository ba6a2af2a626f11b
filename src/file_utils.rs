use anyhow::{Result, Context, anyhow};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::NamedTempFile;
use walkdir::WalkDir;

// @module: File and directory utilities

/// Size and modification time of a file, used to tell a replaced file from an unchanged one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSignature {
    pub size: u64,
    pub modified: SystemTime,
}

/// A directory listing entry
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub path: PathBuf,
    pub signature: FileSignature,
}

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {}", path.display()))?;
        }
        Ok(())
    }

    // @generates: Output path for translated subtitle
    // @params: input_file, output_dir, target_language, extension
    pub fn generate_output_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_file: P1,
        output_dir: P2,
        target_language: &str,
        extension: &str,
    ) -> PathBuf {
        let stem = input_file.as_ref().file_stem().unwrap_or_default();

        let output_filename = format!(
            "{}.{}.{}",
            stem.to_string_lossy(),
            target_language.to_lowercase(),
            extension
        );

        output_dir.as_ref().join(output_filename)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        let bytes = fs::read(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))?;
        // Subtitle files in the wild are not always valid UTF-8
        Ok(String::from_utf8(bytes)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()))
    }

    /// Delete a file, succeeding when it is already gone
    pub fn remove_if_exists<P: AsRef<Path>>(path: P) -> Result<()> {
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove file: {:?}", path.as_ref())),
        }
    }

    /// Write a string through a temporary file in the same directory, then rename it into place.
    ///
    /// Readers never observe a half-written file.
    pub fn write_atomic<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let path = path.as_ref();
        let parent = path.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Self::ensure_dir(parent)?;

        let mut temp = NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temporary file in {}", parent.display()))?;
        temp.write_all(content.as_bytes())
            .with_context(|| format!("Failed to write temporary file for {}", path.display()))?;
        temp.as_file().sync_all()?;
        temp.persist(path)
            .map_err(|e| anyhow!("Failed to move translated file into place at {}: {}", path.display(), e.error))?;

        Ok(())
    }

    /// Size and modification time of a file
    pub fn signature<P: AsRef<Path>>(path: P) -> Result<FileSignature> {
        let metadata = fs::metadata(&path)
            .with_context(|| format!("Failed to read metadata: {:?}", path.as_ref()))?;
        Ok(FileSignature {
            size: metadata.len(),
            modified: metadata.modified()?,
        })
    }

    /// List files with a specific extension directly inside a directory, with their signatures
    pub fn list_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<FileInfo>> {
        let extension = extension.trim_start_matches('.');
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).min_depth(1).max_depth(1).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            let matches_extension = path.extension()
                .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension));
            if !path.is_file() || !matches_extension {
                continue;
            }

            // Files may vanish between listing and stat
            if let Ok(signature) = Self::signature(path) {
                result.push(FileInfo {
                    path: path.to_path_buf(),
                    signature,
                });
            }
        }

        Ok(result)
    }
}
