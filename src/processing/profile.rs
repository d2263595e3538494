//! Candidate profile extraction from CV text

use crate::error::Result;
use crate::input::CvFile;
use crate::processing::document::{Document, DocumentType, ProcessedDocument, SectionType};
use crate::processing::skill_matcher::SkillMatcher;
use crate::processing::text_processor::{find_email, find_phone};
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use std::sync::OnceLock;

const MAX_EXPERIENCE_LINES: usize = 10;
const MAX_EDUCATION_LINES: usize = 5;
const SUMMARY_CHARS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionSource {
    Heuristic,
    Llm,
}

/// Structured record of one CV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub id: String,
    pub file_name: String,
    pub path: PathBuf,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub skills: Vec<String>,
    pub experience: Vec<String>,
    pub education: Vec<String>,
    pub years_of_experience: Option<u32>,
    pub summary: String,
    pub source: ExtractionSource,
    pub word_count: usize,
}

/// Fields an extraction agent may return. Everything is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExtractedFields {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub skills: Vec<String>,
    pub experience: Vec<String>,
    pub education: Vec<String>,
    pub years_of_experience: Option<f32>,
    pub summary: Option<String>,
}

fn years_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(\d{1,2})\s*\+?\s*(?:years?|yrs?)\b").expect("Invalid years regex"))
}

pub struct ProfileExtractor {
    skill_matcher: SkillMatcher,
    chunk_size: usize,
    chunk_overlap: usize,
    used_ids: HashSet<String>,
}

impl ProfileExtractor {
    pub fn new(skill_matcher: SkillMatcher, chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            skill_matcher,
            chunk_size,
            chunk_overlap,
            used_ids: HashSet::new(),
        }
    }

    pub fn skill_matcher(&self) -> &SkillMatcher {
        &self.skill_matcher
    }

    /// Build a heuristic profile for a CV. Ids stay unique for the lifetime of the extractor.
    pub fn extract(&mut self, cv: &CvFile, text: &str) -> Result<CandidateProfile> {
        let document = Document::new(text.to_string(), cv.path.to_string_lossy().to_string(), DocumentType::Cv)
            .process(self.chunk_size, self.chunk_overlap)?;

        let id = self.allocate_id(&cv.stem());
        let name = Self::find_name(text).unwrap_or_else(|| cv.stem());
        let skills = self.collect_skills(text, &document);
        let experience = Self::section_lines(&document, &SectionType::Experience, MAX_EXPERIENCE_LINES);
        let education = Self::section_lines(&document, &SectionType::Education, MAX_EDUCATION_LINES);
        let summary = document
            .section(&SectionType::Summary)
            .map(|s| s.content.as_str())
            .filter(|s| !s.is_empty())
            .map(truncate_chars)
            .unwrap_or_else(|| truncate_chars(text));

        debug!("Extracted profile {} ({} skills)", id, skills.len());

        Ok(CandidateProfile {
            id,
            file_name: cv.file_name.clone(),
            path: cv.path.clone(),
            name,
            email: find_email(text),
            phone: find_phone(text),
            skills,
            experience,
            education,
            years_of_experience: Self::find_years(text),
            summary,
            source: ExtractionSource::Heuristic,
            word_count: document.original.metadata.word_count,
        })
    }

    /// Forget allocated ids, e.g. between pipeline runs
    pub fn reset_ids(&mut self) {
        self.used_ids.clear();
    }

    fn allocate_id(&mut self, stem: &str) -> String {
        let base = slugify(stem);
        let mut id = base.clone();
        let mut suffix = 2;
        while self.used_ids.contains(&id) {
            id = format!("{}-{}", base, suffix);
            suffix += 1;
        }
        self.used_ids.insert(id.clone());
        id
    }

    fn find_name(text: &str) -> Option<String> {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .take(5)
            .find(|line| {
                let words: Vec<&str> = line.split_whitespace().collect();
                (2..=5).contains(&words.len())
                    && !line.contains('@')
                    && !line.chars().any(|c| c.is_ascii_digit())
                    && Document::classify_header(line).is_none()
                    && words.iter().all(|w| {
                        w.chars().all(|c| c.is_alphabetic() || matches!(c, '-' | '.' | '\''))
                    })
            })
            .map(str::to_string)
    }

    fn find_years(text: &str) -> Option<u32> {
        years_regex()
            .captures_iter(text)
            .filter_map(|cap| cap.get(1)?.as_str().parse::<u32>().ok())
            .max()
    }

    fn collect_skills(&self, text: &str, document: &ProcessedDocument) -> Vec<String> {
        let mut skills: BTreeSet<String> = self.skill_matcher.skills_in(text).into_iter().collect();

        let skills_section = document.section(&SectionType::Skills);
        if let Some(section) = skills_section {
            for item in section.content.split(|c| matches!(c, ',' | ';' | '|' | '\n' | '•')) {
                let item = item.trim().trim_start_matches(['-', '*']).trim().to_lowercase();
                let words = item.split_whitespace().count();
                if !item.is_empty() && words <= 4 && item.len() <= 40 {
                    skills.insert(item);
                }
            }
        }

        // Misspelt skills, looked up in the skills section when there is one
        let fuzzy_source = skills_section.map_or(text, |section| section.content.as_str());
        for fuzzy in self.skill_matcher.find_fuzzy_matches(fuzzy_source) {
            debug!("Fuzzy skill '{}' for '{}' ({:?})", fuzzy.skill, fuzzy.matched_text, fuzzy.algorithm);
            skills.insert(fuzzy.skill);
        }

        skills.into_iter().collect()
    }

    fn section_lines(document: &ProcessedDocument, section_type: &SectionType, max: usize) -> Vec<String> {
        document
            .section(section_type)
            .map(|section| {
                section
                    .content
                    .lines()
                    .map(|l| l.trim().trim_start_matches(['-', '*', '•']).trim())
                    .filter(|l| !l.is_empty())
                    .take(max)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl CandidateProfile {
    /// Refine a heuristic profile with fields returned by the extraction agent.
    ///
    /// Empty heuristic fields are filled, skill lists are unioned. A name that
    /// fell back to the file stem is replaced.
    pub fn merge_extracted(&mut self, fields: ExtractedFields) {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        if let Some(name) = fields.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
            if self.name.is_empty() || self.name == stem {
                self.name = name;
            }
        }
        if self.email.is_none() {
            self.email = fields.email.filter(|e| !e.trim().is_empty());
        }
        if self.phone.is_none() {
            self.phone = fields.phone.filter(|p| !p.trim().is_empty());
        }

        let mut skills: BTreeSet<String> = self.skills.drain(..).collect();
        skills.extend(
            fields
                .skills
                .into_iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty()),
        );
        self.skills = skills.into_iter().collect();

        if self.experience.is_empty() {
            self.experience = fields.experience.into_iter().take(MAX_EXPERIENCE_LINES).collect();
        }
        if self.education.is_empty() {
            self.education = fields.education.into_iter().take(MAX_EDUCATION_LINES).collect();
        }
        if self.years_of_experience.is_none() {
            self.years_of_experience = fields
                .years_of_experience
                .filter(|y| y.is_finite() && *y >= 0.0)
                .map(|y| y.round() as u32);
        }
        if self.summary.trim().is_empty() {
            if let Some(summary) = fields.summary {
                self.summary = truncate_chars(&summary);
            }
        }

        self.source = ExtractionSource::Llm;
    }
}

/// Lowercase, non-alphanumeric runs collapsed to '-'
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        "cv".to_string()
    } else {
        slug
    }
}

fn truncate_chars(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(SUMMARY_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CV: &str = "Jane Roe\njane.roe@example.com | (555) 123-4567\n\nSummary\nFrontend developer with 6+ years building accessible web apps.\n\nExperience\n- Acme Corp, Senior Frontend Developer (2019-2024)\n- Beta Ltd, Web Developer\n\nEducation\nBSc Computer Science\n\nSkills\nReact, TypeScript, CSS, Design Systems";

    fn extractor() -> ProfileExtractor {
        ProfileExtractor::new(SkillMatcher::new().unwrap(), 512, 50)
    }

    #[test]
    fn test_heuristic_extraction() {
        let mut extractor = extractor();
        let cv = CvFile::new(PathBuf::from("CV/Jane_Roe.pdf"));
        let profile = extractor.extract(&cv, CV).unwrap();

        assert_eq!(profile.id, "jane-roe");
        assert_eq!(profile.name, "Jane Roe");
        assert_eq!(profile.email.as_deref(), Some("jane.roe@example.com"));
        assert!(profile.phone.is_some());
        assert_eq!(profile.years_of_experience, Some(6));
        assert_eq!(profile.experience.len(), 2);
        assert_eq!(profile.experience[0], "Acme Corp, Senior Frontend Developer (2019-2024)");
        assert_eq!(profile.education, vec!["BSc Computer Science"]);
        assert!(profile.summary.starts_with("Frontend developer with 6+ years"));
        assert!(profile.skills.contains(&"react".to_string()));
        assert!(profile.skills.contains(&"design systems".to_string()));
        assert_eq!(profile.source, ExtractionSource::Heuristic);

        let mut sorted = profile.skills.clone();
        sorted.sort();
        assert_eq!(sorted, profile.skills);
    }

    #[test]
    fn test_misspelt_skills_are_recognised() {
        let mut extractor = extractor();
        let cv = CvFile::new(PathBuf::from("CV/sam.txt"));
        let profile = extractor
            .extract(&cv, "Sam Lee\n\nSkills\nPythonn, Kubernets, Java")
            .unwrap();

        assert!(profile.skills.contains(&"python".to_string()));
        assert!(profile.skills.contains(&"kubernetes".to_string()));
        assert!(profile.skills.contains(&"java".to_string()));
        assert!(!profile.skills.contains(&"javascript".to_string()));
    }

    #[test]
    fn test_name_falls_back_to_stem() {
        let mut extractor = extractor();
        let cv = CvFile::new(PathBuf::from("CV/candidate_7.txt"));
        let profile = extractor.extract(&cv, "react developer since 2015, 10 years").unwrap();

        assert_eq!(profile.name, "candidate_7");
        assert_eq!(profile.years_of_experience, Some(10));
    }

    #[test]
    fn test_ids_are_unique() {
        let mut extractor = extractor();
        let a = extractor.extract(&CvFile::new(PathBuf::from("a/John Smith.pdf")), "x").unwrap();
        let b = extractor.extract(&CvFile::new(PathBuf::from("b/john-smith.pdf")), "x").unwrap();
        let c = extractor.extract(&CvFile::new(PathBuf::from("c/JOHN_SMITH.txt")), "x").unwrap();

        assert_eq!(a.id, "john-smith");
        assert_eq!(b.id, "john-smith-2");
        assert_eq!(c.id, "john-smith-3");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Jane  Roe (2024)"), "jane-roe-2024");
        assert_eq!(slugify("___"), "cv");
    }

    #[test]
    fn test_merge_extracted_fields() {
        let mut extractor = extractor();
        let cv = CvFile::new(PathBuf::from("CV/cand.txt"));
        let mut profile = extractor.extract(&cv, "2 projects with react").unwrap();
        assert_eq!(profile.name, "cand");

        profile.merge_extracted(ExtractedFields {
            name: Some("Sam Lee".to_string()),
            skills: vec!["Vue".to_string(), "react".to_string()],
            education: vec!["MSc".to_string()],
            years_of_experience: Some(4.4),
            ..Default::default()
        });

        assert_eq!(profile.name, "Sam Lee");
        assert_eq!(profile.skills, vec!["react", "vue"]);
        assert_eq!(profile.education, vec!["MSc"]);
        assert_eq!(profile.years_of_experience, Some(4));
        assert_eq!(profile.source, ExtractionSource::Llm);
    }
}
