//! Configuration management for the candidate finder

use crate::error::{FindCandidateError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub agents: AgentsConfig,
    pub tasks: TasksConfig,
    pub processing: ProcessingConfig,
    pub scoring: ScoringConfig,
    pub input: InputConfig,
    pub knowledge: KnowledgeConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub enabled: bool,
    pub model: String,
    pub base_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    /// Upper bound on candidates sent to the matching agent in one request
    pub max_candidates: usize,
    /// Let the extraction agent refine heuristic profiles (one request per CV)
    pub refine_profiles: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    pub cv_extraction: AgentConfig,
    pub cv_matching: AgentConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub role: String,
    pub goal: String,
    pub backstory: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TasksConfig {
    pub extract_cv_details: TaskConfig,
    pub compare_cv_with_job_description: TaskConfig,
    pub generate_final_report: TaskConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    pub description: String,
    pub expected_output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub fuzzy_threshold: f32,
    /// Extra skills appended to the built-in skill database
    pub extra_skills: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub keyword_weight: f32,
    pub similarity_weight: f32,
    pub llm_weight: f32,
    pub min_recommend_score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub cv_folder: PathBuf,
    pub cv_extensions: Vec<String>,
    pub enable_cache: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    pub collection_name: String,
    pub persist: bool,
    /// Overrides the default data directory location
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output_path: PathBuf,
    pub format: OutputFormat,
    pub top_n: usize,
    pub color_output: bool,
    pub include_summaries: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Markdown,
    Json,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "gpt-4".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.2,
            max_tokens: 1500,
            timeout_secs: 120,
            max_retries: 3,
            retry_base_delay_ms: 1000,
            max_candidates: 10,
            refine_profiles: true,
        }
    }
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            cv_extraction: AgentConfig {
                role: "CV Extraction and Summarization AI".to_string(),
                goal: "Extract key details from CV documents and store structured summaries.".to_string(),
                backstory: "An AI assistant for recruiters, extracting and organizing resume data.".to_string(),
            },
            cv_matching: AgentConfig {
                role: "CV Matching AI".to_string(),
                goal: "Compare extracted CV details with the given job description to find the most suitable candidate.".to_string(),
                backstory: "An AI hiring assistant that analyzes and ranks resumes based on job requirements.".to_string(),
            },
        }
    }
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            extract_cv_details: TaskConfig {
                description: "Extract and summarize details from {cv_file}.\n\n<CV>\n{cv_text}\n</CV>".to_string(),
                expected_output: "Structured CV details including Name, Skills, Experience, and Education. \
Respond with a single JSON object with the keys \"name\", \"email\", \"phone\", \"skills\" (array of strings), \
\"experience\" (array of strings), \"education\" (array of strings), \"years_of_experience\" (number or null) \
and \"summary\" (string).".to_string(),
            },
            compare_cv_with_job_description: TaskConfig {
                description: "Compare the extracted CVs with the job description below and identify the most suitable candidates.\n\n\
<JOB DESCRIPTION>\n{job_description}\n</JOB DESCRIPTION>\n\n<CANDIDATES>\n{candidates}\n</CANDIDATES>".to_string(),
                expected_output: "Ranked list of candidates with reasoning for selection. \
Respond with a single JSON object {\"rankings\": [{\"id\": string, \"score\": number from 0 to 100, \
\"strengths\": [string], \"weaknesses\": [string], \"reasoning\": string}]} using only the candidate ids given above.".to_string(),
            },
            generate_final_report: TaskConfig {
                description: "Generate a final report summarizing the best-matched CVs along with their strengths and weaknesses.\n\n\
<JOB DESCRIPTION>\n{job_description}\n</JOB DESCRIPTION>\n\n<RANKING>\n{candidates}\n</RANKING>".to_string(),
                expected_output: "A short markdown summary (at most three paragraphs) of the most suitable candidates \
with a final recommendation. Do not repeat the ranking table.".to_string(),
            },
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 50,
            fuzzy_threshold: 0.85,
            extra_skills: Vec::new(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            keyword_weight: 0.4,
            similarity_weight: 0.2,
            llm_weight: 0.4,
            min_recommend_score: 0.5,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            cv_folder: PathBuf::from("./CV"),
            cv_extensions: vec!["pdf".to_string()],
            enable_cache: true,
        }
    }
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            collection_name: "cv_database".to_string(),
            persist: false,
            dir: None,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("report.md"),
            format: OutputFormat::Markdown,
            top_n: 3,
            color_output: true,
            include_summaries: true,
        }
    }
}

impl Config {
    /// Load configuration from an explicit path, or from the default location.
    ///
    /// A missing default file is created with the default settings; a missing
    /// explicit file is an error.
    pub fn load(custom_path: Option<&Path>) -> Result<Self> {
        let config = match custom_path {
            Some(path) => {
                if !path.exists() {
                    return Err(FindCandidateError::Configuration(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                Self::from_file(path)?
            }
            None => {
                let path = Self::config_path();
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    let config = Self::default();
                    if let Err(e) = config.save_to(&path) {
                        log::warn!("Could not write default config to {}: {}", path.display(), e);
                    }
                    config
                }
            }
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| FindCandidateError::Configuration(format!("Failed to parse config: {}", e)))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| FindCandidateError::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// The file `load` reads: the explicit path when given, else the default location
    pub fn resolve_path(custom_path: Option<&Path>) -> PathBuf {
        custom_path.map_or_else(Self::config_path, Path::to_path_buf)
    }

    /// Overwrite the config file with defaults without reading the current one.
    pub fn reset(custom_path: Option<&Path>) -> Result<PathBuf> {
        let path = Self::resolve_path(custom_path);
        Self::default().save_to(&path)?;
        Ok(path)
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("find-candidate")
            .join("config.toml")
    }

    /// Directory holding persisted knowledge base collections
    pub fn knowledge_dir(&self) -> PathBuf {
        match &self.knowledge.dir {
            Some(dir) => dir.clone(),
            None => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("find-candidate")
                .join("knowledge"),
        }
    }

    pub fn knowledge_file(&self) -> PathBuf {
        self.knowledge_dir()
            .join(format!("{}.json", self.knowledge.collection_name))
    }

    pub fn validate(&self) -> Result<()> {
        let s = &self.scoring;
        if s.keyword_weight < 0.0 || s.similarity_weight < 0.0 || s.llm_weight < 0.0 {
            return Err(FindCandidateError::Configuration(
                "Scoring weights must not be negative".to_string(),
            ));
        }
        if s.keyword_weight + s.similarity_weight <= 0.0 {
            return Err(FindCandidateError::Configuration(
                "keyword_weight and similarity_weight must not both be zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&s.min_recommend_score) {
            return Err(FindCandidateError::Configuration(
                "min_recommend_score must be between 0 and 1".to_string(),
            ));
        }
        if self.processing.chunk_size <= self.processing.chunk_overlap {
            return Err(FindCandidateError::Configuration(
                "chunk_size must be greater than chunk_overlap".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.processing.fuzzy_threshold) {
            return Err(FindCandidateError::Configuration(
                "fuzzy_threshold must be between 0 and 1".to_string(),
            ));
        }
        if self.input.cv_extensions.is_empty() {
            return Err(FindCandidateError::Configuration(
                "At least one CV file extension is required".to_string(),
            ));
        }
        if self.knowledge.collection_name.trim().is_empty() {
            return Err(FindCandidateError::Configuration(
                "Knowledge collection name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.llm.model, "gpt-4");
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.knowledge.collection_name, "cv_database");
        assert_eq!(config.input.cv_extensions, vec!["pdf".to_string()]);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml(
            r#"
[llm]
model = "gpt-4o-mini"

[scoring]
llm_weight = 0.0
"#,
        )
        .unwrap();

        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.max_retries, 3);
        assert_eq!(config.scoring.llm_weight, 0.0);
        assert_eq!(config.scoring.keyword_weight, 0.4);
        assert_eq!(config.report.format, OutputFormat::Markdown);
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let mut config = Config::default();
        config.scoring.keyword_weight = 0.0;
        config.scoring.similarity_weight = 0.0;
        assert!(config.validate().is_err());

        config.scoring.keyword_weight = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.report.top_n = 7;
        config.save_to(&path).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.report.top_n, 7);
    }

    #[test]
    fn test_reset_repairs_an_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[scoring]\nkeyword_weight = \"lots\"\n").unwrap();
        assert!(Config::load(Some(&path)).is_err());

        let written = Config::reset(Some(&path)).unwrap();

        assert_eq!(written, path);
        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.report.top_n, Config::default().report.top_n);
    }

    #[test]
    fn test_resolve_path_prefers_explicit_file() {
        let custom = Path::new("/tmp/custom-find-candidate.toml");
        assert_eq!(Config::resolve_path(Some(custom)), custom.to_path_buf());
        assert_eq!(Config::resolve_path(None), Config::config_path());
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let result = Config::load(Some(Path::new("/definitely/not/here.toml")));
        assert!(matches!(result, Err(FindCandidateError::Configuration(_))));
    }
}
