//! Error handling for the candidate finder

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FindCandidateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF extraction error: {0}")]
    PdfExtraction(String),

    #[error("Text processing error: {0}")]
    TextProcessing(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("File format not supported: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("CV folder not found: {}", .0.display())]
    CvFolderNotFound(PathBuf),

    #[error("No CV files found in {}", .0.display())]
    NoCvsFound(PathBuf),

    #[error("None of the {0} CV files could be read")]
    NoUsableCvs(usize),

    #[error("Network error: {0}")]
    Network(String),

    #[error("LLM API error (status {status}): {message}")]
    LlmApi { status: u16, message: String },

    #[error("LLM inference error: {0}")]
    LlmInference(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Knowledge base error: {0}")]
    KnowledgeBase(String),

    #[error("Output formatting error: {0}")]
    OutputFormatting(String),
}

pub type Result<T> = std::result::Result<T, FindCandidateError>;

/// Convert anyhow errors to our custom error type
impl From<anyhow::Error> for FindCandidateError {
    fn from(err: anyhow::Error) -> Self {
        FindCandidateError::Processing(err.to_string())
    }
}

impl From<reqwest::Error> for FindCandidateError {
    fn from(err: reqwest::Error) -> Self {
        FindCandidateError::Network(err.to_string())
    }
}

impl From<askama::Error> for FindCandidateError {
    fn from(err: askama::Error) -> Self {
        FindCandidateError::OutputFormatting(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_errors_name_the_path() {
        let err = FindCandidateError::NoCvsFound(PathBuf::from("./CV"));
        assert_eq!(err.to_string(), "No CV files found in ./CV");

        let err = FindCandidateError::CvFolderNotFound(PathBuf::from("/missing"));
        assert!(err.to_string().contains("/missing"));
    }

    #[test]
    fn test_llm_api_error_display() {
        let err = FindCandidateError::LlmApi { status: 401, message: "bad key".to_string() };
        assert_eq!(err.to_string(), "LLM API error (status 401): bad key");
    }
}
