//! Ranking report structures

use crate::processing::CandidateProfile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Final output of a ranking run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingReport {
    pub generated_at: DateTime<Utc>,
    pub job_description: String,
    pub job_requirements: Vec<String>,
    pub cv_folder: PathBuf,
    /// Model used for LLM scoring, if any
    pub model: Option<String>,
    /// Ranked best first
    pub candidates: Vec<RankedCandidate>,
    pub skipped: Vec<SkippedCv>,
    pub warnings: Vec<String>,
    /// Ids of the recommended candidates, best first
    pub recommended: Vec<String>,
    /// Narrative summary written by the matching agent
    pub summary: Option<String>,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub rank: usize,
    pub profile: CandidateProfile,
    pub scores: ScoreBreakdown,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub reasoning: Option<String>,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
}

/// All scores are in 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub keyword: f32,
    pub similarity: f32,
    pub llm: Option<f32>,
    pub overall: f32,
}

/// A CV that could not be used
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedCv {
    pub file_name: String,
    pub path: PathBuf,
    pub reason: String,
}

impl RankingReport {
    pub fn is_recommended(&self, id: &str) -> bool {
        self.recommended.iter().any(|r| r == id)
    }

    pub fn recommended_candidates(&self) -> impl Iterator<Item = &RankedCandidate> {
        self.candidates.iter().filter(|c| self.is_recommended(&c.profile.id))
    }

    pub fn best(&self) -> Option<&RankedCandidate> {
        self.candidates.first()
    }
}

/// Score as a whole percentage, e.g. "82%"
pub fn percent(score: f32) -> String {
    format!("{:.0}%", (score * 100.0).clamp(0.0, 100.0))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommended_lookup() {
        let report = fixtures::report();
        assert!(report.is_recommended("jane-roe"));
        assert!(!report.is_recommended("john-smith"));
        assert_eq!(report.recommended_candidates().count(), 1);
        assert_eq!(report.best().map(|c| c.profile.name.as_str()), Some("Jane Roe"));
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0.824), "82%");
        assert_eq!(percent(1.2), "100%");
        assert_eq!(percent(0.0), "0%");
    }
}
