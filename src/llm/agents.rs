//! Agent roles and prompt templates

use crate::config::{AgentConfig, LlmConfig, TaskConfig, TasksConfig};
use crate::error::{FindCandidateError, Result};
use crate::llm::client::{LlmProvider, LlmRequest};
use log::debug;
use serde::de::DeserializeOwned;

/// An LLM-driven task executor with a fixed persona
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub role: String,
    pub goal: String,
    pub backstory: String,
}

impl From<&AgentConfig> for Agent {
    fn from(config: &AgentConfig) -> Self {
        Self {
            role: config.role.clone(),
            goal: config.goal.clone(),
            backstory: config.backstory.clone(),
        }
    }
}

impl Agent {
    pub fn system_prompt(&self) -> String {
        format!(
            "You are {}. Goal: {}. Background: {}",
            self.role,
            self.goal.trim_end_matches('.'),
            self.backstory
        )
    }

    /// Run a prompt and return the raw completion text
    pub async fn run(&self, provider: &dyn LlmProvider, prompt: String, llm: &LlmConfig, json_mode: bool) -> Result<String> {
        let request = LlmRequest {
            system: self.system_prompt(),
            prompt,
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
            json_mode,
        };

        debug!("{} -> {} ({} prompt chars)", self.role, provider.model_name(), request.prompt.len());
        let response = provider.complete(&request).await?;
        Ok(response.text)
    }

    /// Run a prompt and decode the JSON object in the completion
    pub async fn run_json<T: DeserializeOwned>(&self, provider: &dyn LlmProvider, prompt: String, llm: &LlmConfig) -> Result<T> {
        let text = self.run(provider, prompt, llm, true).await?;
        let json = parse_json_block(&text)?;
        Ok(serde_json::from_str(json)?)
    }
}

/// Task prompts rendered from configured descriptions and expected outputs
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    tasks: TasksConfig,
}

impl PromptTemplates {
    pub fn new(tasks: &TasksConfig) -> Self {
        Self { tasks: tasks.clone() }
    }

    pub fn extract_cv_details(&self, cv_file: &str, cv_text: &str) -> String {
        Self::render_task(&self.tasks.extract_cv_details, &[("cv_file", cv_file), ("cv_text", cv_text)])
    }

    pub fn compare_cv_with_job_description(&self, job_description: &str, candidates: &str) -> String {
        Self::render_task(
            &self.tasks.compare_cv_with_job_description,
            &[("job_description", job_description), ("candidates", candidates)],
        )
    }

    pub fn generate_final_report(&self, job_description: &str, candidates: &str) -> String {
        Self::render_task(
            &self.tasks.generate_final_report,
            &[("job_description", job_description), ("candidates", candidates)],
        )
    }

    fn render_task(task: &TaskConfig, params: &[(&str, &str)]) -> String {
        format!(
            "{}\n\nExpected output: {}",
            render(&task.description, params),
            render(&task.expected_output, params)
        )
    }
}

/// Substitute `{name}` placeholders. Unknown placeholders are left as they are.
pub fn render(template: &str, params: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let key_end = after.find('}');
        let key = key_end.map(|end| &after[..end]);

        match key.and_then(|k| params.iter().find(|(name, _)| *name == k)) {
            Some((name, value)) => {
                out.push_str(value);
                rest = &after[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Locate the JSON object in a completion: the whole text, a fenced
/// ```json block, or the outermost `{...}` span.
pub fn parse_json_block(text: &str) -> Result<&str> {
    let trimmed = text.trim();
    if trimmed.starts_with('{') && serde_json::from_str::<serde_json::Value>(trimmed).is_ok() {
        return Ok(trimmed);
    }

    if let Some(start) = trimmed.find("```json") {
        let body = &trimmed[start + "```json".len()..];
        if let Some(end) = body.find("```") {
            return Ok(body[..end].trim());
        }
    }

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if end > start => Ok(&trimmed[start..=end]),
        _ => Err(FindCandidateError::LlmInference(
            "completion does not contain a JSON object".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_system_prompt() {
        let config = Config::default();
        let agent = Agent::from(&config.agents.cv_matching);
        assert_eq!(
            agent.system_prompt(),
            "You are CV Matching AI. Goal: Compare extracted CV details with the given job description to find the most suitable candidate. Background: An AI hiring assistant that analyzes and ranks resumes based on job requirements."
        );
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        let rendered = render("Hi {name}, see {unknown} and {{json}}", &[("name", "Ada")]);
        assert_eq!(rendered, "Hi Ada, see {unknown} and {{json}}");
    }

    #[test]
    fn test_task_prompts_include_inputs() {
        let templates = PromptTemplates::new(&Config::default().tasks);
        let prompt = templates.compare_cv_with_job_description("Frontend developer", "[{\"id\":\"a\"}]");

        assert!(prompt.contains("Frontend developer"));
        assert!(prompt.contains("[{\"id\":\"a\"}]"));
        assert!(prompt.contains("\"rankings\""));
        assert!(!prompt.contains("{job_description}"));

        let prompt = templates.extract_cv_details("jane.pdf", "Jane Roe, React");
        assert!(prompt.contains("jane.pdf"));
        assert!(prompt.contains("Jane Roe, React"));
    }

    #[test]
    fn test_parse_json_block() {
        assert_eq!(parse_json_block(" {\"a\": 1} ").unwrap(), "{\"a\": 1}");
        assert_eq!(
            parse_json_block("Here you go:\n```json\n{\"a\": 1}\n```\nthanks").unwrap(),
            "{\"a\": 1}"
        );
        assert_eq!(parse_json_block("Result: {\"a\": {\"b\": 2}} done").unwrap(), "{\"a\": {\"b\": 2}}");
        assert!(parse_json_block("no json here").is_err());
    }
}
