//! Input manager for handling different file types

use crate::error::{FindCandidateError, Result};
use crate::input::file_detector::{has_extension, FileType};
use crate::input::text_extractor::{MarkdownExtractor, PdfExtractor, PlainTextExtractor, TextExtractor};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A CV file discovered in the input folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvFile {
    pub path: PathBuf,
    pub file_name: String,
}

impl CvFile {
    pub fn new(path: PathBuf) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        Self { path, file_name }
    }

    /// File name without its extension
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.file_name.clone())
    }
}

pub struct InputManager {
    cache: HashMap<String, String>,
    enable_cache: bool,
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
            enable_cache: true,
        }
    }

    pub fn with_cache(mut self, enable: bool) -> Self {
        self.enable_cache = enable;
        self
    }

    pub async fn extract_text(&mut self, path: &Path) -> Result<String> {
        let path_str = path.to_string_lossy().to_string();

        if self.enable_cache {
            if let Some(cached_text) = self.cache.get(&path_str) {
                debug!("Using cached text for: {}", path.display());
                return Ok(cached_text.clone());
            }
        }

        if !path.exists() {
            return Err(FindCandidateError::InvalidInput(
                format!("File does not exist: {}", path.display())
            ));
        }

        let file_type = self.detect_file_type(path)?;

        let text = match file_type {
            FileType::Pdf => {
                info!("Extracting text from PDF: {}", path.display());
                PdfExtractor.extract(path).await?
            },
            FileType::Text => {
                info!("Reading plain text file: {}", path.display());
                PlainTextExtractor.extract(path).await?
            },
            FileType::Markdown => {
                info!("Processing markdown file: {}", path.display());
                MarkdownExtractor.extract(path).await?
            },
            FileType::Unknown => {
                return Err(FindCandidateError::UnsupportedFormat(
                    format!("Unsupported file type for: {}", path.display())
                ));
            }
        };

        if self.enable_cache {
            self.cache.insert(path_str, text.clone());
        }

        Ok(text)
    }

    /// List the CV files directly inside `folder`, sorted by file name.
    pub fn discover_cvs(&self, folder: &Path, extensions: &[String]) -> Result<Vec<CvFile>> {
        if !folder.is_dir() {
            return Err(FindCandidateError::CvFolderNotFound(folder.to_path_buf()));
        }

        let mut cvs = Vec::new();
        for entry in std::fs::read_dir(folder)? {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type()?.is_file() {
                continue;
            }
            if has_extension(&path, extensions) {
                cvs.push(CvFile::new(path));
            } else {
                debug!("Skipping non-CV file: {}", path.display());
            }
        }

        if cvs.is_empty() {
            return Err(FindCandidateError::NoCvsFound(folder.to_path_buf()));
        }

        cvs.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        for cv in &cvs {
            info!("Processing CV: {}", cv.file_name);
        }

        Ok(cvs)
    }

    /// Resolve the job description from inline text or a file. Inline text wins.
    pub async fn load_job_description(&mut self, text: Option<&str>, file: Option<&Path>) -> Result<String> {
        let description = match (text, file) {
            (Some(text), _) => text.to_string(),
            (None, Some(path)) => self.extract_text(path).await?,
            (None, None) => {
                return Err(FindCandidateError::InvalidInput(
                    "A job description is required (--job or --job-file)".to_string(),
                ))
            }
        };

        let trimmed = description.trim();
        if trimmed.is_empty() {
            return Err(FindCandidateError::InvalidInput(
                "Job description is empty".to_string(),
            ));
        }

        Ok(trimmed.to_string())
    }

    fn detect_file_type(&self, path: &Path) -> Result<FileType> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| FindCandidateError::InvalidInput(
                format!("File has no extension: {}", path.display())
            ))?;

        Ok(FileType::from_extension(extension))
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }
}
