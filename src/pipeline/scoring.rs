//! Score combination, ranking and recommendation

use crate::config::ScoringConfig;
use crate::output::RankedCandidate;
use crate::processing::{CandidateProfile, SkillCoverage};

const LISTED_SKILLS: usize = 6;

/// Weighted overall score in 0..=1.
///
/// Without an LLM score the keyword and similarity weights are renormalised
/// to sum to 1.
pub fn combined_score(weights: &ScoringConfig, keyword_score: f32, similarity_score: f32, llm_score: Option<f32>) -> f32 {
    let score = if let Some(llm) = llm_score {
        let total_weight = weights.keyword_weight + weights.similarity_weight + weights.llm_weight;
        if total_weight <= 0.0 {
            return 0.0;
        }
        (keyword_score * weights.keyword_weight
            + similarity_score * weights.similarity_weight
            + llm * weights.llm_weight)
            / total_weight
    } else {
        let total_weight = weights.keyword_weight + weights.similarity_weight;
        if total_weight <= 0.0 {
            return 0.0;
        }
        let adjusted_kw_weight = weights.keyword_weight / total_weight;
        let adjusted_sim_weight = weights.similarity_weight / total_weight;

        keyword_score * adjusted_kw_weight + similarity_score * adjusted_sim_weight
    };

    score.clamp(0.0, 1.0)
}

/// Sort best first and assign ranks 1..n.
///
/// Ties on the overall score go to the higher keyword score, then to the name
/// in alphabetical order.
pub fn rank_candidates(mut candidates: Vec<RankedCandidate>) -> Vec<RankedCandidate> {
    candidates.sort_by(|a, b| {
        b.scores
            .overall
            .total_cmp(&a.scores.overall)
            .then_with(|| b.scores.keyword.total_cmp(&a.scores.keyword))
            .then_with(|| a.profile.name.cmp(&b.profile.name))
            .then_with(|| a.profile.id.cmp(&b.profile.id))
    });

    for (i, candidate) in candidates.iter_mut().enumerate() {
        candidate.rank = i + 1;
    }
    candidates
}

/// Ids of the top `top_n` ranked candidates whose overall score reaches `min_score`
pub fn select_recommended(ranked: &[RankedCandidate], top_n: usize, min_score: f32) -> Vec<String> {
    ranked
        .iter()
        .take(top_n)
        .filter(|c| c.scores.overall >= min_score)
        .map(|c| c.profile.id.clone())
        .collect()
}

/// Strengths derived from skill coverage and profile facts
pub fn heuristic_strengths(profile: &CandidateProfile, coverage: &SkillCoverage, similarity: f32) -> Vec<String> {
    let mut strengths = Vec::new();
    let required = coverage.matched.len() + coverage.missing.len();

    if !coverage.matched.is_empty() {
        strengths.push(format!(
            "Covers {} of {} key requirements: {}",
            coverage.matched.len(),
            required,
            list_preview(&coverage.matched)
        ));
    }
    if let Some(years) = profile.years_of_experience.filter(|y| *y >= 5) {
        strengths.push(format!("{} years of experience", years));
    }
    if similarity >= 0.3 {
        strengths.push("Strong overall overlap with the job description".to_string());
    }
    strengths
}

/// Weaknesses derived from skill coverage and profile facts
pub fn heuristic_weaknesses(profile: &CandidateProfile, coverage: &SkillCoverage) -> Vec<String> {
    let mut weaknesses = Vec::new();

    if !coverage.missing.is_empty() {
        if coverage.matched.is_empty() {
            weaknesses.push("None of the key requirements appear in the CV".to_string());
        }
        weaknesses.push(format!("Missing: {}", list_preview(&coverage.missing)));
    }
    if profile.years_of_experience.is_none() {
        weaknesses.push("Years of experience not stated".to_string());
    }
    weaknesses
}

fn list_preview(items: &[String]) -> String {
    let mut preview = items.iter().take(LISTED_SKILLS).cloned().collect::<Vec<_>>().join(", ");
    if items.len() > LISTED_SKILLS {
        preview.push_str(&format!(" and {} more", items.len() - LISTED_SKILLS));
    }
    preview
}
