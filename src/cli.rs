//! CLI interface for find-candidate

use crate::config::OutputFormat;
use clap::{ArgGroup, Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "find-candidate")]
#[command(about = "Rank CVs against a job description")]
#[command(long_about = "Extract candidate profiles from a folder of CVs, compare them with a job description \
using skill matching, term similarity and an optional LLM, and write a ranked report")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rank the CVs in a folder against a job description
    #[command(group(ArgGroup::new("job_source").required(true).args(["job", "job_file"])))]
    Rank {
        /// Job description text
        #[arg(short, long)]
        job: Option<String>,

        /// Path to a job description file (TXT, MD, PDF)
        #[arg(long)]
        job_file: Option<PathBuf>,

        /// Folder containing the CVs
        #[arg(long)]
        cv_folder: Option<PathBuf>,

        /// Where to write the report
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report format: markdown, json
        #[arg(short, long)]
        format: Option<String>,

        /// Skip LLM analysis (keywords + similarity only)
        #[arg(long)]
        no_llm: bool,

        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,

        /// Number of candidates to recommend
        #[arg(short, long)]
        top: Option<usize>,
    },

    /// Extract candidate profiles and print them as JSON
    Extract {
        /// Folder containing the CVs
        #[arg(long)]
        cv_folder: Option<PathBuf>,

        /// Heuristic extraction only
        #[arg(long)]
        no_llm: bool,
    },

    /// Show or reset configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Reset configuration to defaults
    Reset,

    /// Print the configuration file path
    Path,
}

/// Parse and validate output format
pub fn parse_output_format(format: &str) -> Result<OutputFormat, String> {
    match format.to_lowercase().as_str() {
        "markdown" | "md" => Ok(OutputFormat::Markdown),
        "json" => Ok(OutputFormat::Json),
        _ => Err(format!("Invalid output format: {}. Supported: markdown, json", format)),
    }
}

/// Validate file extension
pub fn validate_file_extension(path: &Path, allowed_extensions: &[&str]) -> Result<(), String> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => {
            if allowed_extensions.contains(&ext.to_lowercase().as_str()) {
                Ok(())
            } else {
                Err(format!(
                    "Unsupported file extension: .{}. Allowed: {}",
                    ext,
                    allowed_extensions.join(", ")
                ))
            }
        }
        None => Err("File has no extension".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_requires_a_job() {
        assert!(Cli::try_parse_from(["find-candidate", "rank"]).is_err());
        assert!(Cli::try_parse_from(["find-candidate", "rank", "--job", "x", "--job-file", "job.txt"]).is_err());

        let cli = Cli::try_parse_from(["find-candidate", "-v", "rank", "--job", "Rust developer", "--top", "2"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Rank { job, top, no_llm, .. } => {
                assert_eq!(job.as_deref(), Some("Rust developer"));
                assert_eq!(top, Some(2));
                assert!(!no_llm);
            }
            _ => panic!("expected rank command"),
        }
    }

    #[test]
    fn test_parse_output_format() {
        assert_eq!(parse_output_format("MD").unwrap(), OutputFormat::Markdown);
        assert_eq!(parse_output_format("json").unwrap(), OutputFormat::Json);
        assert!(parse_output_format("html").is_err());
    }

    #[test]
    fn test_validate_file_extension() {
        assert!(validate_file_extension(Path::new("job.TXT"), &["txt", "md"]).is_ok());
        assert!(validate_file_extension(Path::new("job.docx"), &["txt", "md"]).is_err());
        assert!(validate_file_extension(Path::new("job"), &["txt"]).is_err());
    }
}
