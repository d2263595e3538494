//! find-candidate: rank CVs against a job description

pub mod cli;
pub mod config;
pub mod error;
pub mod input;
pub mod knowledge;
pub mod llm;
pub mod output;
pub mod pipeline;
pub mod processing;

pub use config::Config;
pub use error::{FindCandidateError, Result};
