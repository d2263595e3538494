//! Document ingestion: text normalisation, section detection, skill matching and profiles

pub mod document;
pub mod profile;
pub mod skill_matcher;
pub mod text_processor;

pub use profile::{CandidateProfile, ExtractedFields, ExtractionSource, ProfileExtractor};
pub use skill_matcher::{SkillCoverage, SkillMatcher};
