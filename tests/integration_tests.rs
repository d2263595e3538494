//! Integration tests for find-candidate

use find_candidate::config::{Config, OutputFormat};
use find_candidate::input::InputManager;
use find_candidate::llm::OpenAiClient;
use find_candidate::output::RankingReport;
use find_candidate::pipeline::{Crew, CrewInputs};
use find_candidate::FindCandidateError;
use mockito::Matcher;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const CV_FOLDER: &str = "tests/fixtures/cvs";

fn test_config() -> Config {
    let mut config = Config::default();
    config.input.cv_extensions = vec!["txt".to_string(), "md".to_string()];
    config.llm.enabled = false;
    config.llm.refine_profiles = false;
    config
}

async fn job_description() -> String {
    InputManager::new()
        .load_job_description(None, Some(Path::new("tests/fixtures/job.txt")))
        .await
        .unwrap()
}

fn inputs(job_description: String, cv_folder: &Path, output_path: Option<PathBuf>) -> CrewInputs {
    CrewInputs {
        job_description,
        cv_folder: cv_folder.to_path_buf(),
        output_path,
    }
}

fn chat_completion(content: &str) -> String {
    json!({
        "choices": [{"message": {"role": "assistant", "content": content}}],
        "usage": {"prompt_tokens": 100, "completion_tokens": 20, "total_tokens": 120}
    })
    .to_string()
}

#[tokio::test]
async fn test_text_extraction_from_markdown() {
    let mut manager = InputManager::new();
    let text = manager
        .extract_text(Path::new("tests/fixtures/sample_resume.md"))
        .await
        .unwrap();

    assert!(text.contains("John Doe"));
    assert!(text.contains("Node.js"));
    // Should not contain markdown formatting
    assert!(!text.contains("**"));
    assert!(!text.contains("##"));
}

#[tokio::test]
async fn test_caching_functionality() {
    let mut manager = InputManager::new();
    let path = Path::new("tests/fixtures/cvs/maria_garcia.txt");

    let text1 = manager.extract_text(path).await.unwrap();
    assert_eq!(manager.cache_size(), 1);

    let text2 = manager.extract_text(path).await.unwrap();
    assert_eq!(text1, text2);
    assert_eq!(manager.cache_size(), 1);
}

#[tokio::test]
async fn test_unsupported_file_type() {
    let mut manager = InputManager::new();
    let result = manager.extract_text(Path::new("tests/fixtures/cvs/notes.xyz")).await;
    assert!(matches!(result, Err(FindCandidateError::UnsupportedFormat(_))));
}

#[tokio::test]
async fn test_rank_without_llm_writes_markdown_report() {
    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join("reports").join("report.md");
    let mut crew = Crew::new(test_config(), None).unwrap();

    let output = crew
        .kickoff(inputs(job_description().await, Path::new(CV_FOLDER), Some(report_path.clone())))
        .await
        .unwrap();

    let report = &output.report;
    assert_eq!(report.candidates.len(), 2);
    assert_eq!(report.candidates[0].profile.name, "Maria Garcia");
    assert_eq!(report.candidates[1].profile.name, "Tom Baker");
    assert!(report.candidates[0].scores.overall > report.candidates[1].scores.overall);
    assert!(report.candidates[0].matched_skills.contains(&"react".to_string()));
    assert!(report.candidates[1].missing_skills.contains(&"javascript".to_string()));
    assert_eq!(report.recommended, vec!["maria-garcia"]);
    assert!(report.model.is_none());

    let written = std::fs::read_to_string(&report_path).unwrap();
    assert_eq!(written, output.rendered);
    assert!(written.contains("# Candidate Ranking Report"));
    assert!(written.contains("Maria Garcia"));
}

#[tokio::test]
async fn test_rank_json_report() {
    let mut config = test_config();
    config.report.format = OutputFormat::Json;
    let mut crew = Crew::new(config, None).unwrap();

    let output = crew
        .kickoff(inputs(job_description().await, Path::new(CV_FOLDER), None))
        .await
        .unwrap();

    let parsed: RankingReport = serde_json::from_str(&output.rendered).unwrap();
    assert_eq!(parsed.candidates.len(), 2);
    assert_eq!(parsed.candidates[0].rank, 1);
    assert_eq!(parsed.recommended, output.report.recommended);
}

#[tokio::test]
async fn test_rank_with_mocked_llm() {
    let mut server = mockito::Server::new_async().await;
    let ranking = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::Regex("CANDIDATES".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(chat_completion(
            &json!({"rankings": [
                {"id": "tom-baker", "score": 92, "strengths": ["Strong Git workflow"], "weaknesses": [], "reasoning": "Solid engineer"},
                {"id": "maria-garcia", "score": 40, "strengths": [], "weaknesses": ["Asks for a high salary"]},
                {"id": "nobody", "score": 99}
            ]})
            .to_string(),
        ))
        .expect(1)
        .create_async()
        .await;
    let summary = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::Regex("RANKING".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(chat_completion("Tom Baker edges ahead on the LLM review."))
        .expect(1)
        .create_async()
        .await;

    let mut config = test_config();
    config.llm.enabled = true;
    let client = OpenAiClient::new(&server.url(), "test-key".to_string(), "gpt-4", 5)
        .unwrap()
        .with_retries(0, 1);
    let mut crew = Crew::new(config, Some(Arc::new(client))).unwrap();

    let report = crew
        .kickoff(inputs(job_description().await, Path::new(CV_FOLDER), None))
        .await
        .unwrap()
        .report;

    ranking.assert_async().await;
    summary.assert_async().await;

    let tom = report.candidates.iter().find(|c| c.profile.id == "tom-baker").unwrap();
    let maria = report.candidates.iter().find(|c| c.profile.id == "maria-garcia").unwrap();
    assert!((tom.scores.llm.unwrap() - 0.92).abs() < 1e-6);
    assert!((maria.scores.llm.unwrap() - 0.4).abs() < 1e-6);
    assert_eq!(tom.strengths, vec!["Strong Git workflow"]);
    assert_eq!(maria.weaknesses, vec!["Asks for a high salary"]);
    // Maria keeps heuristic strengths when the model gives none
    assert!(!maria.strengths.is_empty());
    assert_eq!(report.model.as_deref(), Some("gpt-4"));
    assert_eq!(report.summary.as_deref(), Some("Tom Baker edges ahead on the LLM review."));
    assert!(report.warnings.iter().any(|w| w.contains("'nobody'")));
}

#[tokio::test]
async fn test_llm_server_error_falls_back_to_heuristics() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(500)
        .with_body(r#"{"error": {"message": "internal error"}}"#)
        .create_async()
        .await;

    let client = OpenAiClient::new(&server.url(), "test-key".to_string(), "gpt-4", 5)
        .unwrap()
        .with_retries(0, 1);
    let mut crew = Crew::new(test_config(), Some(Arc::new(client))).unwrap();

    let report = crew
        .kickoff(inputs(job_description().await, Path::new(CV_FOLDER), None))
        .await
        .unwrap()
        .report;

    assert_eq!(report.candidates[0].profile.name, "Maria Garcia");
    assert!(report.candidates.iter().all(|c| c.scores.llm.is_none()));
    assert!(report.summary.is_none());
    assert!(report.warnings.iter().any(|w| w.contains("heuristic scores used")));
}

#[tokio::test]
async fn test_missing_cv_folder() {
    let dir = tempfile::tempdir().unwrap();
    let mut crew = Crew::new(test_config(), None).unwrap();

    let result = crew
        .kickoff(inputs(job_description().await, &dir.path().join("missing"), None))
        .await;

    assert!(matches!(result, Err(FindCandidateError::CvFolderNotFound(_))));
}

#[tokio::test]
async fn test_default_config_only_accepts_pdf() {
    let mut crew = Crew::new(Config::default(), None).unwrap();

    let result = crew
        .kickoff(inputs(job_description().await, Path::new(CV_FOLDER), None))
        .await;

    assert!(matches!(result, Err(FindCandidateError::NoCvsFound(_))));
}

#[tokio::test]
async fn test_unreadable_cv_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("broken.pdf"), b"this is not a pdf").unwrap();
    std::fs::copy(
        "tests/fixtures/cvs/maria_garcia.txt",
        dir.path().join("maria_garcia.txt"),
    )
    .unwrap();

    let mut config = test_config();
    config.input.cv_extensions = vec!["pdf".to_string(), "txt".to_string()];
    let mut crew = Crew::new(config, None).unwrap();

    let report = crew
        .kickoff(inputs(job_description().await, dir.path(), None))
        .await
        .unwrap()
        .report;

    assert_eq!(report.candidates.len(), 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].file_name, "broken.pdf");
}

#[tokio::test]
async fn test_persisted_knowledge_base() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config();
    config.knowledge.persist = true;
    config.knowledge.dir = Some(dir.path().to_path_buf());
    let knowledge_file = config.knowledge_file();
    let mut crew = Crew::new(config, None).unwrap();

    crew.kickoff(inputs(job_description().await, Path::new(CV_FOLDER), None))
        .await
        .unwrap();

    assert_eq!(crew.knowledge().len(), 2);
    assert!(knowledge_file.exists());

    let mut restored = find_candidate::knowledge::KnowledgeBase::new("cv_database", 512, 50);
    restored.load(&knowledge_file).await.unwrap();
    assert!(restored.get("maria-garcia").is_some());
    assert_eq!(restored.search("react typescript", 1)[0].id, "maria-garcia");
}
