//! Skill keyword matching: exact (Aho-Corasick) and fuzzy (Jaro-Winkler / Levenshtein)

use crate::error::{FindCandidateError, Result};
use aho_corasick::{AhoCorasick, MatchKind};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::OnceLock;
use strsim::{jaro_winkler, levenshtein};

/// Skill matcher backed by a skill database
pub struct SkillMatcher {
    exact_matcher: AhoCorasick,
    skill_database: Vec<String>,
    fuzzy_threshold: f32,
    tech_skills: HashSet<String>,
    soft_skills: HashSet<String>,
    role_keywords: HashSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillMatch {
    pub skill: String,
    pub positions: Vec<usize>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzyMatch {
    pub skill: String,
    pub matched_text: String,
    pub similarity_score: f32,
    pub algorithm: FuzzyAlgorithm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FuzzyAlgorithm {
    JaroWinkler,
    Levenshtein,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkillCategory {
    Technical,
    Soft,
    RoleSpecific,
    Domain,
}

/// How well a candidate covers the job requirements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillCoverage {
    pub matched: Vec<String>,
    pub missing: Vec<String>,
    /// Category-weighted share of requirements covered, 0.0 to 1.0
    pub score: f32,
}

/// Shorter over longer term length below which two terms never fuzzy-match
const MIN_FUZZY_LENGTH_RATIO: f32 = 0.8;

fn requirement_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:required|must have|should have|experience (?:with|in)|knowledge of|proficient (?:with|in)|familiarity with|skilled in)\s*:?\s*([^.!?\n]+)")
            .expect("Invalid requirement regex")
    })
}

impl SkillMatcher {
    /// Create a new skill matcher with the default skill database
    pub fn new() -> Result<Self> {
        Self::with_custom_skills(Vec::new())
    }

    /// Create a skill matcher with additional skills
    pub fn with_custom_skills(additional_skills: Vec<String>) -> Result<Self> {
        let mut skill_database = Self::default_skill_database();
        skill_database.extend(
            additional_skills
                .into_iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty()),
        );
        skill_database.sort();
        skill_database.dedup();

        let exact_matcher = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostLongest)
            .build(&skill_database)
            .map_err(|e| FindCandidateError::Processing(format!("Failed to build skill matcher: {}", e)))?;

        Ok(Self {
            exact_matcher,
            skill_database,
            fuzzy_threshold: 0.85,
            tech_skills: Self::default_tech_skills(),
            soft_skills: Self::default_soft_skills(),
            role_keywords: Self::default_role_keywords(),
        })
    }

    /// Find exact, word-bounded skill mentions in text
    pub fn find_exact_matches(&self, text: &str) -> Vec<SkillMatch> {
        let mut matches: HashMap<&str, SkillMatch> = HashMap::new();

        for mat in self.exact_matcher.find_iter(text) {
            if !Self::is_word_bounded(text, mat.start(), mat.end()) {
                continue;
            }
            let skill = self.skill_database[mat.pattern().as_usize()].as_str();
            let entry = matches.entry(skill).or_insert_with(|| SkillMatch {
                skill: skill.to_string(),
                positions: Vec::new(),
                count: 0,
            });
            entry.positions.push(mat.start());
            entry.count += 1;
        }

        let mut matches: Vec<SkillMatch> = matches.into_values().collect();
        matches.sort_by(|a, b| a.skill.cmp(&b.skill));
        matches
    }

    /// Match boundaries must not sit inside a word. A trailing plural 's' is allowed.
    fn is_word_bounded(text: &str, start: usize, end: usize) -> bool {
        let before_ok = text[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());

        let mut rest = text[end..].chars();
        let after_ok = match rest.next() {
            None => true,
            Some('s') | Some('S') => rest.next().map_or(true, |c| !c.is_alphanumeric()),
            Some(c) => !c.is_alphanumeric(),
        };

        before_ok && after_ok
    }

    /// Find near-miss spellings of single-word skills
    pub fn find_fuzzy_matches(&self, text: &str) -> Vec<FuzzyMatch> {
        let mut fuzzy_matches = Vec::new();
        let exact: HashSet<String> = self
            .find_exact_matches(text)
            .into_iter()
            .map(|m| m.skill)
            .collect();

        let mut seen_words = HashSet::new();
        for word in text.split_whitespace() {
            let clean_word = Self::clean_word(word).to_lowercase();
            if clean_word.chars().count() < 4 || !seen_words.insert(clean_word.clone()) {
                continue;
            }

            for skill in &self.skill_database {
                if skill.contains(' ') || skill.len() < 4 || exact.contains(skill) || &clean_word == skill {
                    continue;
                }

                if let Some((similarity_score, algorithm)) = self.spelling_similarity(&clean_word, skill) {
                    fuzzy_matches.push(FuzzyMatch {
                        skill: skill.clone(),
                        matched_text: clean_word.clone(),
                        similarity_score,
                        algorithm,
                    });
                }
            }
        }

        // Best match per skill
        fuzzy_matches.sort_by(|a, b| {
            a.skill
                .cmp(&b.skill)
                .then_with(|| b.similarity_score.total_cmp(&a.similarity_score))
        });
        fuzzy_matches.dedup_by(|a, b| a.skill == b.skill);
        fuzzy_matches
    }

    /// Whether `word` reads as a misspelling of `skill`.
    ///
    /// Terms of clearly different length never match, so "java" is not
    /// "javascript".
    fn spelling_similarity(&self, word: &str, skill: &str) -> Option<(f32, FuzzyAlgorithm)> {
        let word_len = word.chars().count();
        let skill_len = skill.chars().count();
        let (shorter, longer) = (word_len.min(skill_len), word_len.max(skill_len));
        if shorter == 0 || (shorter as f32 / longer as f32) < MIN_FUZZY_LENGTH_RATIO {
            return None;
        }

        let jw = jaro_winkler(word, skill) as f32;
        if jw >= self.fuzzy_threshold {
            return Some((jw, FuzzyAlgorithm::JaroWinkler));
        }

        let similarity = 1.0 - levenshtein(word, skill) as f32 / longer as f32;
        (similarity >= self.fuzzy_threshold).then_some((similarity, FuzzyAlgorithm::Levenshtein))
    }

    /// Canonical (lowercase) skills mentioned in the text, sorted
    pub fn skills_in(&self, text: &str) -> Vec<String> {
        self.find_exact_matches(text)
            .into_iter()
            .map(|m| m.skill)
            .collect()
    }

    /// Skills and requirement terms named by a job description
    pub fn job_requirements(&self, job_text: &str) -> Vec<String> {
        let mut requirements: BTreeSet<String> = self.skills_in(job_text).into_iter().collect();

        for cap in requirement_regex().captures_iter(job_text) {
            let Some(fragment) = cap.get(1) else { continue };
            for part in fragment
                .as_str()
                .split(|c| matches!(c, ',' | ';' | '/' | '|' | '(' | ')'))
                .flat_map(|p| p.split(" and "))
                .flat_map(|p| p.split(" or "))
            {
                let term = part.trim().trim_start_matches("and ").trim().to_lowercase();
                let words = term.split_whitespace().count();
                if term.len() < 2 || words == 0 || words > 3 {
                    continue;
                }
                if !term.chars().any(|c| c.is_alphabetic()) {
                    continue;
                }
                // Prefer canonical skills inside the fragment when there are any
                let inner = self.skills_in(&term);
                if inner.is_empty() {
                    requirements.insert(term);
                } else {
                    requirements.extend(inner);
                }
            }
        }

        requirements.into_iter().collect()
    }

    /// Score how well `candidate_skills` and `candidate_text` cover `required`.
    ///
    /// Technical requirements weigh 1.0, everything else 0.5. An empty
    /// requirement list scores 0.
    pub fn coverage(&self, required: &[String], candidate_skills: &[String], candidate_text: &str) -> SkillCoverage {
        let skills: HashSet<String> = candidate_skills.iter().map(|s| s.to_lowercase()).collect();
        let text_lower = candidate_text.to_lowercase();

        let mut matched = Vec::new();
        let mut missing = Vec::new();
        let mut total_weight = 0.0;
        let mut matched_weight = 0.0;

        for requirement in required {
            let req = requirement.to_lowercase();
            let weight = match self.categorize(&req) {
                SkillCategory::Technical => 1.0,
                _ => 0.5,
            };
            total_weight += weight;

            let found = skills.contains(&req)
                || Self::contains_bounded(&text_lower, &req)
                || skills
                    .iter()
                    .any(|s| s.len() >= 4 && self.spelling_similarity(s, &req).is_some());

            if found {
                matched_weight += weight;
                matched.push(requirement.clone());
            } else {
                missing.push(requirement.clone());
            }
        }

        let score = if total_weight > 0.0 { matched_weight / total_weight } else { 0.0 };

        SkillCoverage { matched, missing, score }
    }

    fn contains_bounded(haystack: &str, needle: &str) -> bool {
        haystack
            .match_indices(needle)
            .any(|(start, m)| Self::is_word_bounded(haystack, start, start + m.len()))
    }

    pub fn categorize(&self, skill: &str) -> SkillCategory {
        let skill = skill.to_lowercase();
        if self.tech_skills.contains(&skill) {
            SkillCategory::Technical
        } else if self.soft_skills.contains(&skill) {
            SkillCategory::Soft
        } else if self.role_keywords.contains(&skill) {
            SkillCategory::RoleSpecific
        } else {
            SkillCategory::Domain
        }
    }

    fn clean_word(word: &str) -> String {
        word.chars()
            .filter(|c| c.is_alphanumeric() || *c == '+' || *c == '#' || *c == '.')
            .collect::<String>()
            .trim_matches('.')
            .to_string()
    }

    fn default_tech_skills() -> HashSet<String> {
        [
            // Programming languages
            "rust", "python", "javascript", "typescript", "java", "c++", "c#", "golang", "ruby",
            "php", "swift", "kotlin", "scala", "haskell", "clojure", "matlab", "sql",

            // Web
            "react", "vue", "angular", "svelte", "html", "css", "sass", "tailwind",
            "bootstrap", "jquery", "webpack", "vite", "babel", "node.js", "express.js",
            "next.js", "nuxt", "gatsby", "remix", "redux", "graphql", "rest api", "grpc",
            "responsive design", "accessibility", "figma",

            // Backend / infrastructure
            "docker", "kubernetes", "aws", "azure", "gcp", "terraform", "ansible",
            "jenkins", "gitlab", "github", "ci/cd", "devops", "microservices", "api",
            "redis", "elasticsearch", "nginx", "linux", "git",

            // Databases
            "postgresql", "mysql", "mongodb", "cassandra", "dynamodb", "sqlite",
            "oracle", "sql server", "neo4j",

            // Data / ML
            "machine learning", "deep learning", "tensorflow", "pytorch", "scikit-learn",
            "pandas", "numpy", "spark", "hadoop", "kafka", "airflow",

            // Testing
            "jest", "pytest", "junit", "selenium", "cypress", "unit testing", "tdd",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn default_soft_skills() -> HashSet<String> {
        [
            "leadership", "communication", "teamwork", "problem solving", "critical thinking",
            "creativity", "adaptability", "time management", "project management",
            "collaboration", "mentoring", "coaching", "presentation", "negotiation",
            "customer service", "analytical", "detail oriented", "agile", "scrum",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn default_role_keywords() -> HashSet<String> {
        [
            "software engineer", "developer", "architect", "full stack", "frontend",
            "front-end", "backend", "back-end", "sre", "data scientist", "ml engineer",
            "product manager", "designer", "ux", "ui", "analyst", "consultant",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn default_skill_database() -> Vec<String> {
        let mut skills: Vec<String> = Vec::new();
        skills.extend(Self::default_tech_skills());
        skills.extend(Self::default_soft_skills());
        skills.extend(Self::default_role_keywords());
        skills.extend(
            ["kanban", "jira", "confluence", "bash", "powershell", "storybook", "web components"]
                .iter()
                .map(|s| s.to_string()),
        );
        skills
    }

    /// Set fuzzy matching threshold (0.0 to 1.0)
    pub fn set_fuzzy_threshold(&mut self, threshold: f32) {
        self.fuzzy_threshold = threshold.clamp(0.0, 1.0);
    }

    pub fn fuzzy_threshold(&self) -> f32 {
        self.fuzzy_threshold
    }

    pub fn skill_count(&self) -> usize {
        self.skill_database.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skill_matcher_creation() {
        let matcher = SkillMatcher::new().unwrap();
        assert!(matcher.skill_count() > 50);
        assert_eq!(matcher.fuzzy_threshold(), 0.85);
    }

    #[test]
    fn test_exact_matching_respects_word_boundaries() {
        let matcher = SkillMatcher::new().unwrap();
        let skills = matcher.skills_in("Built React apps in JavaScript; reactive design. Used Java, CSS and APIs.");

        assert!(skills.contains(&"react".to_string()));
        assert!(skills.contains(&"javascript".to_string()));
        assert!(skills.contains(&"java".to_string()));
        assert!(skills.contains(&"css".to_string()));
        assert!(skills.contains(&"api".to_string()));
        // "reactive" only counts once as the standalone "React"
        let react = matcher
            .find_exact_matches("React and reactive")
            .into_iter()
            .find(|m| m.skill == "react")
            .unwrap();
        assert_eq!(react.count, 1);
    }

    #[test]
    fn test_fuzzy_matching() {
        let matcher = SkillMatcher::new().unwrap();
        let matches = matcher.find_fuzzy_matches("I know Pythonn and Kubernets very well.");

        assert!(matches.iter().any(|m| m.skill == "python"));
        assert!(matches.iter().any(|m| m.skill == "kubernetes"));
    }

    #[test]
    fn test_fuzzy_matching_ignores_prefix_words() {
        let matcher = SkillMatcher::new().unwrap();
        let matches = matcher.find_fuzzy_matches("Backend engineer writing Java services.");
        assert!(!matches.iter().any(|m| m.skill == "javascript"));

        let misspelt = matcher.find_fuzzy_matches("Pythonn");
        assert!(misspelt.iter().any(|m| m.skill == "python"));
    }

    #[test]
    fn test_coverage_does_not_confuse_java_and_javascript() {
        let matcher = SkillMatcher::new().unwrap();

        let coverage = matcher.coverage(&["javascript".to_string()], &["java".to_string()], "Java");
        assert!(coverage.matched.is_empty());
        assert_eq!(coverage.missing, vec!["javascript"]);
        assert_eq!(coverage.score, 0.0);

        let reverse = matcher.coverage(&["java".to_string()], &["javascript".to_string()], "JavaScript");
        assert_eq!(reverse.missing, vec!["java"]);

        let typo = matcher.coverage(&["kubernetes".to_string()], &["kubernets".to_string()], "");
        assert_eq!(typo.matched, vec!["kubernetes"]);
    }

    #[test]
    fn test_job_requirements() {
        let matcher = SkillMatcher::new().unwrap();
        let job = "Frontend developer. Must have: HTML, CSS and JavaScript. Experience with design systems.";
        let requirements = matcher.job_requirements(job);

        assert!(requirements.contains(&"html".to_string()));
        assert!(requirements.contains(&"css".to_string()));
        assert!(requirements.contains(&"javascript".to_string()));
        assert!(requirements.contains(&"frontend".to_string()));
        assert!(requirements.contains(&"design systems".to_string()));
    }

    #[test]
    fn test_coverage() {
        let matcher = SkillMatcher::new().unwrap();
        let required = vec!["html".to_string(), "css".to_string(), "javascript".to_string(), "communication".to_string()];
        let candidate = vec!["html".to_string(), "css".to_string()];

        let coverage = matcher.coverage(&required, &candidate, "Strong communication with designers");

        assert_eq!(coverage.matched, vec!["html", "css", "communication"]);
        assert_eq!(coverage.missing, vec!["javascript"]);
        // (1 + 1 + 0.5) / (1 + 1 + 1 + 0.5)
        assert!((coverage.score - 2.5 / 3.5).abs() < 1e-6);

        let empty = matcher.coverage(&[], &candidate, "");
        assert_eq!(empty.score, 0.0);
    }

    #[test]
    fn test_categorize() {
        let matcher = SkillMatcher::new().unwrap();
        assert_eq!(matcher.categorize("React"), SkillCategory::Technical);
        assert_eq!(matcher.categorize("leadership"), SkillCategory::Soft);
        assert_eq!(matcher.categorize("frontend"), SkillCategory::RoleSpecific);
        assert_eq!(matcher.categorize("design systems"), SkillCategory::Domain);
    }
}
