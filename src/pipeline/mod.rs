//! Sequential crew: extract → compare → validate → report

pub mod scoring;
pub mod validation;

use crate::config::Config;
use crate::error::{FindCandidateError, Result};
use crate::input::{CvFile, InputManager};
use crate::knowledge::KnowledgeBase;
use crate::llm::{Agent, LlmProvider, OpenAiClient, PromptTemplates};
use crate::output::{render_report, write_report, RankedCandidate, RankingReport, ScoreBreakdown, SkippedCv};
use crate::processing::document::{Document, DocumentType};
use crate::processing::text_processor::TextProcessor;
use crate::processing::{CandidateProfile, ExtractedFields, ProfileExtractor, SkillCoverage, SkillMatcher};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use validation::{validate_rankings, LlmRankings, ValidatedRanking};

/// CV text beyond this many characters is not sent to the extraction agent
const MAX_PROMPT_CV_CHARS: usize = 12_000;

/// Keywords used as requirements when a job description names no known skills
const MAX_KEYWORD_REQUIREMENTS: usize = 10;

/// The pipeline steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Task {
    ExtractCvDetails,
    CompareCvWithJobDescription,
    ValidateRankings,
    GenerateFinalReport,
}

impl Task {
    pub const SEQUENCE: [Task; 4] = [
        Task::ExtractCvDetails,
        Task::CompareCvWithJobDescription,
        Task::ValidateRankings,
        Task::GenerateFinalReport,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Task::ExtractCvDetails => "extract_cv_details",
            Task::CompareCvWithJobDescription => "compare_cv_with_job_description",
            Task::ValidateRankings => "validate_rankings",
            Task::GenerateFinalReport => "generate_final_report",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CrewInputs {
    pub job_description: String,
    pub cv_folder: PathBuf,
    /// Where to write the rendered report; nothing is written when `None`
    pub output_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskOutput {
    pub task: Task,
    pub summary: String,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone)]
pub struct CrewOutput {
    pub report: RankingReport,
    pub rendered: String,
    pub task_outputs: Vec<TaskOutput>,
}

/// A CV that made it through extraction
struct ExtractedCv {
    profile: CandidateProfile,
    text: String,
}

struct Comparison {
    id: String,
    keyword_score: f32,
    similarity_score: f32,
    coverage: SkillCoverage,
}

#[derive(Serialize)]
struct CandidateBrief<'a> {
    id: &'a str,
    name: &'a str,
    skills: &'a [String],
    years_of_experience: Option<u32>,
    summary: String,
}

/// State handed from one task to the next
struct RunState {
    inputs: CrewInputs,
    started: Instant,
    cvs: Vec<ExtractedCv>,
    skipped: Vec<SkippedCv>,
    warnings: Vec<String>,
    job_requirements: Vec<String>,
    comparisons: Vec<Comparison>,
    raw_rankings: Option<Vec<Value>>,
    sent_ids: Vec<String>,
    rankings: BTreeMap<String, ValidatedRanking>,
    report: Option<RankingReport>,
    rendered: String,
}

impl RunState {
    fn new(inputs: CrewInputs) -> Self {
        Self {
            inputs,
            started: Instant::now(),
            cvs: Vec::new(),
            skipped: Vec::new(),
            warnings: Vec::new(),
            job_requirements: Vec::new(),
            comparisons: Vec::new(),
            raw_rankings: None,
            sent_ids: Vec::new(),
            rankings: BTreeMap::new(),
            report: None,
            rendered: String::new(),
        }
    }
}

/// Runs the candidate-ranking tasks in order
pub struct Crew {
    config: Config,
    provider: Option<Arc<dyn LlmProvider>>,
    extraction_agent: Agent,
    matching_agent: Agent,
    templates: PromptTemplates,
    input_manager: InputManager,
    extractor: ProfileExtractor,
    knowledge: KnowledgeBase,
    text_processor: TextProcessor,
    show_progress: bool,
}

impl Crew {
    /// Build a crew with an explicit provider. `None` runs heuristics only.
    pub fn new(config: Config, provider: Option<Arc<dyn LlmProvider>>) -> Result<Self> {
        config.validate()?;

        let mut skill_matcher = SkillMatcher::with_custom_skills(config.processing.extra_skills.clone())?;
        skill_matcher.set_fuzzy_threshold(config.processing.fuzzy_threshold);

        Ok(Self {
            extraction_agent: Agent::from(&config.agents.cv_extraction),
            matching_agent: Agent::from(&config.agents.cv_matching),
            templates: PromptTemplates::new(&config.tasks),
            input_manager: InputManager::new().with_cache(config.input.enable_cache),
            extractor: ProfileExtractor::new(
                skill_matcher,
                config.processing.chunk_size,
                config.processing.chunk_overlap,
            ),
            knowledge: KnowledgeBase::from_config(&config.knowledge, &config.processing),
            text_processor: TextProcessor::new(),
            provider,
            config,
            show_progress: false,
        })
    }

    /// Build a crew whose provider is the configured OpenAI-compatible endpoint
    pub fn from_config(config: Config) -> Result<Self> {
        let provider: Option<Arc<dyn LlmProvider>> = if config.llm.enabled {
            Some(Arc::new(OpenAiClient::from_config(&config.llm)?))
        } else {
            None
        };
        Self::new(config, provider)
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// Run every task in order and return the final report
    pub async fn kickoff(&mut self, inputs: CrewInputs) -> Result<CrewOutput> {
        if inputs.job_description.trim().is_empty() {
            return Err(FindCandidateError::InvalidInput("Job description is empty".to_string()));
        }

        let mut state = RunState::new(inputs);
        let mut task_outputs = Vec::with_capacity(Task::SEQUENCE.len());

        for task in Task::SEQUENCE {
            match self.execute(task, &mut state).await {
                Ok(output) => task_outputs.push(output),
                Err(e) => {
                    warn!("Task {} failed: {}", task.name(), e);
                    self.cleanup();
                    return Err(e);
                }
            }
        }

        if !self.config.knowledge.persist {
            self.knowledge.reset();
        }
        self.extractor.reset_ids();

        let report = state
            .report
            .take()
            .ok_or_else(|| FindCandidateError::Processing("report task produced no report".to_string()))?;

        Ok(CrewOutput {
            report,
            rendered: state.rendered,
            task_outputs,
        })
    }

    /// Run only the extraction task, returning the profiles and skipped files
    pub async fn extract_profiles(&mut self, cv_folder: PathBuf) -> Result<(Vec<CandidateProfile>, Vec<SkippedCv>)> {
        let mut state = RunState::new(CrewInputs {
            job_description: String::new(),
            cv_folder,
            output_path: None,
        });

        let result = self.execute(Task::ExtractCvDetails, &mut state).await;
        self.cleanup();
        result?;

        let profiles = state.cvs.into_iter().map(|cv| cv.profile).collect();
        Ok((profiles, state.skipped))
    }

    async fn execute(&mut self, task: Task, state: &mut RunState) -> Result<TaskOutput> {
        info!("▶ Task {} started", task.name());
        let started = Instant::now();

        let summary = match task {
            Task::ExtractCvDetails => self.extract_cv_details(state).await?,
            Task::CompareCvWithJobDescription => self.compare_cv_with_job_description(state).await?,
            Task::ValidateRankings => self.validate_rankings(state),
            Task::GenerateFinalReport => self.generate_final_report(state).await?,
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!("✓ Task {} finished in {}ms: {}", task.name(), elapsed_ms, summary);

        Ok(TaskOutput { task, summary, elapsed_ms })
    }

    /// Best-effort cleanup after a failed or extract-only run
    fn cleanup(&mut self) {
        if !self.config.knowledge.persist {
            self.knowledge.reset();
        }
        self.extractor.reset_ids();
        self.input_manager.clear_cache();
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let bar = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar
    }

    async fn extract_cv_details(&mut self, state: &mut RunState) -> Result<String> {
        let cv_files = self
            .input_manager
            .discover_cvs(&state.inputs.cv_folder, &self.config.input.cv_extensions)?;
        let total = cv_files.len();

        self.knowledge.reset();
        let bar = self.progress_bar(total);

        for cv in cv_files {
            bar.set_message(cv.file_name.clone());

            let text = match self.input_manager.extract_text(&cv.path).await {
                Ok(text) if !text.trim().is_empty() => text,
                Ok(_) => {
                    Self::skip(state, &cv, "no extractable text".to_string());
                    bar.inc(1);
                    continue;
                }
                Err(e) => {
                    Self::skip(state, &cv, e.to_string());
                    bar.inc(1);
                    continue;
                }
            };

            let mut profile = self.extractor.extract(&cv, &text)?;

            if let Some(provider) = self.provider.as_deref().filter(|_| self.config.llm.refine_profiles) {
                if let Err(e) = self.refine_profile(provider, &mut profile, &cv, &text).await {
                    warn!("LLM extraction failed for {}: {}", cv.file_name, e);
                    state
                        .warnings
                        .push(format!("Profile for {} uses heuristic extraction: {}", cv.file_name, e));
                }
            }

            self.knowledge.insert(profile.clone(), &text)?;
            state.cvs.push(ExtractedCv { profile, text });
            bar.inc(1);
        }
        bar.finish_and_clear();

        if state.cvs.is_empty() {
            return Err(FindCandidateError::NoUsableCvs(total));
        }

        if self.config.knowledge.persist {
            self.knowledge.save(&self.config.knowledge_file()).await?;
        }

        Ok(format!("extracted {} profiles, skipped {}", state.cvs.len(), state.skipped.len()))
    }

    fn skip(state: &mut RunState, cv: &CvFile, reason: String) {
        warn!("Skipping {}: {}", cv.file_name, reason);
        state.skipped.push(SkippedCv {
            file_name: cv.file_name.clone(),
            path: cv.path.clone(),
            reason,
        });
    }

    async fn refine_profile(
        &self,
        provider: &dyn LlmProvider,
        profile: &mut CandidateProfile,
        cv: &CvFile,
        text: &str,
    ) -> Result<()> {
        let cv_text: String = text.chars().take(MAX_PROMPT_CV_CHARS).collect();
        let prompt = self.templates.extract_cv_details(&cv.file_name, &cv_text);
        let fields: ExtractedFields = self
            .extraction_agent
            .run_json(provider, prompt, &self.config.llm)
            .await?;
        profile.merge_extracted(fields);
        Ok(())
    }

    async fn compare_cv_with_job_description(&mut self, state: &mut RunState) -> Result<String> {
        let job = state.inputs.job_description.as_str();
        let matcher = self.extractor.skill_matcher();
        state.job_requirements = matcher.job_requirements(job);
        if state.job_requirements.is_empty() {
            let processed = Document::new(job.to_string(), "job description".to_string(), DocumentType::JobDescription)
                .process(self.config.processing.chunk_size, self.config.processing.chunk_overlap)?;
            state.job_requirements = processed.keywords.into_iter().take(MAX_KEYWORD_REQUIREMENTS).collect();
            info!("No known skills in the job description; using {} keywords", state.job_requirements.len());
        }
        debug!("Job requirements: {:?}", state.job_requirements);

        state.comparisons = state
            .cvs
            .iter()
            .map(|cv| {
                let coverage = matcher.coverage(&state.job_requirements, &cv.profile.skills, &cv.text);
                Comparison {
                    id: cv.profile.id.clone(),
                    keyword_score: coverage.score,
                    similarity_score: self.knowledge.similarity(&cv.profile.id, job),
                    coverage,
                }
            })
            .collect();

        let Some(provider) = self.provider.as_deref() else {
            return Ok(format!(
                "compared {} candidates against {} requirements",
                state.comparisons.len(),
                state.job_requirements.len()
            ));
        };

        // The LLM sees the strongest candidates by heuristic score
        let mut shortlist: Vec<&Comparison> = state.comparisons.iter().collect();
        shortlist.sort_by(|a, b| {
            let score_a = scoring::combined_score(&self.config.scoring, a.keyword_score, a.similarity_score, None);
            let score_b = scoring::combined_score(&self.config.scoring, b.keyword_score, b.similarity_score, None);
            score_b.total_cmp(&score_a).then_with(|| a.id.cmp(&b.id))
        });
        shortlist.truncate(self.config.llm.max_candidates);
        if shortlist.is_empty() {
            state
                .warnings
                .push("No candidates sent for LLM ranking (llm.max_candidates is 0); heuristic scores used".to_string());
            return Ok(format!(
                "compared {} candidates against {} requirements, none sent to {}",
                state.comparisons.len(),
                state.job_requirements.len(),
                provider.model_name()
            ));
        }
        state.sent_ids = shortlist.iter().map(|c| c.id.clone()).collect();

        let briefs: Vec<CandidateBrief> = state
            .sent_ids
            .iter()
            .filter_map(|id| state.cvs.iter().find(|cv| &cv.profile.id == id))
            .map(|cv| CandidateBrief {
                id: &cv.profile.id,
                name: &cv.profile.name,
                skills: &cv.profile.skills,
                years_of_experience: cv.profile.years_of_experience,
                // Contact details never leave the machine
                summary: self.text_processor.remove_pii(&cv.profile.summary),
            })
            .collect();
        let candidates = serde_json::to_string(&briefs)?;
        let sent = briefs.len();

        let prompt = self.templates.compare_cv_with_job_description(job, &candidates);
        match self
            .matching_agent
            .run_json::<LlmRankings>(provider, prompt, &self.config.llm)
            .await
        {
            Ok(response) => {
                info!("LLM returned {} rankings", response.rankings.len());
                state.raw_rankings = Some(response.rankings);
            }
            Err(e) => {
                warn!("LLM ranking failed, falling back to heuristic scores: {}", e);
                state
                    .warnings
                    .push(format!("LLM ranking unavailable, heuristic scores used: {}", e));
                state.sent_ids.clear();
            }
        }

        Ok(format!(
            "compared {} candidates against {} requirements, {} sent to {}",
            state.comparisons.len(),
            state.job_requirements.len(),
            sent,
            provider.model_name()
        ))
    }

    fn validate_rankings(&self, state: &mut RunState) -> String {
        let Some(raw) = state.raw_rankings.take() else {
            return "no LLM rankings to validate".to_string();
        };

        let received = raw.len();
        let validation = validate_rankings(raw, &state.sent_ids);

        for warning in &validation.warnings {
            warn!("{}", warning);
        }
        let warning_count = validation.warnings.len();
        state.warnings.extend(validation.warnings);
        state.rankings = validation.rankings;

        format!(
            "kept {} of {} LLM rankings, {} warnings",
            state.rankings.len(),
            received,
            warning_count
        )
    }

    async fn generate_final_report(&mut self, state: &mut RunState) -> Result<String> {
        let weights = &self.config.scoring;
        let mut candidates = Vec::with_capacity(state.comparisons.len());

        for comparison in &state.comparisons {
            let Some(cv) = state.cvs.iter().find(|cv| cv.profile.id == comparison.id) else {
                continue;
            };
            let ranking = state.rankings.get(&comparison.id);
            let llm = ranking.map(|r| r.score);

            let strengths = ranking
                .map(|r| r.strengths.clone())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| {
                    scoring::heuristic_strengths(&cv.profile, &comparison.coverage, comparison.similarity_score)
                });
            let weaknesses = ranking
                .map(|r| r.weaknesses.clone())
                .filter(|w| !w.is_empty())
                .unwrap_or_else(|| scoring::heuristic_weaknesses(&cv.profile, &comparison.coverage));

            candidates.push(RankedCandidate {
                rank: 0,
                profile: cv.profile.clone(),
                scores: ScoreBreakdown {
                    keyword: comparison.keyword_score,
                    similarity: comparison.similarity_score,
                    llm,
                    overall: scoring::combined_score(weights, comparison.keyword_score, comparison.similarity_score, llm),
                },
                strengths,
                weaknesses,
                reasoning: ranking.and_then(|r| r.reasoning.clone()),
                matched_skills: comparison.coverage.matched.clone(),
                missing_skills: comparison.coverage.missing.clone(),
            });
        }

        let candidates = scoring::rank_candidates(candidates);
        let recommended =
            scoring::select_recommended(&candidates, self.config.report.top_n, weights.min_recommend_score);

        let model = if state.rankings.is_empty() {
            None
        } else {
            self.provider.as_deref().map(|p| p.model_name().to_string())
        };

        let mut report = RankingReport {
            generated_at: Utc::now(),
            job_description: state.inputs.job_description.clone(),
            job_requirements: state.job_requirements.clone(),
            cv_folder: state.inputs.cv_folder.clone(),
            model,
            candidates,
            skipped: state.skipped.clone(),
            warnings: Vec::new(),
            recommended,
            summary: None,
            processing_time_ms: 0,
        };

        if let Some(provider) = self.provider.as_deref().filter(|_| !state.rankings.is_empty()) {
            match self.write_summary(provider, &report).await {
                Ok(summary) => report.summary = Some(summary),
                Err(e) => {
                    warn!("LLM report summary failed: {}", e);
                    state.warnings.push(format!("Report summary unavailable: {}", e));
                }
            }
        }

        report.warnings = state.warnings.clone();
        report.processing_time_ms = state.started.elapsed().as_millis() as u64;

        let rendered = render_report(&report, self.config.report.format, self.config.report.include_summaries)?;
        if let Some(path) = &state.inputs.output_path {
            write_report(&rendered, path)?;
        }

        let summary = format!(
            "ranked {} candidates, {} recommended",
            report.candidates.len(),
            report.recommended.len()
        );
        state.rendered = rendered;
        state.report = Some(report);
        Ok(summary)
    }

    async fn write_summary(&self, provider: &dyn LlmProvider, report: &RankingReport) -> Result<String> {
        let ranking: Vec<Value> = report
            .candidates
            .iter()
            .take(self.config.llm.max_candidates)
            .map(|c| {
                serde_json::json!({
                    "rank": c.rank,
                    "id": c.profile.id,
                    "name": c.profile.name,
                    "overall_score": (c.scores.overall * 100.0).round(),
                    "strengths": c.strengths,
                    "weaknesses": c.weaknesses,
                    "recommended": report.is_recommended(&c.profile.id),
                })
            })
            .collect();

        let prompt = self
            .templates
            .generate_final_report(&report.job_description, &serde_json::to_string(&ranking)?);
        let text = self
            .matching_agent
            .run(provider, prompt, &self.config.llm, false)
            .await?;
        Ok(text.trim().to_string())
    }
}
