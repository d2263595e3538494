//! Document structures and processing

use crate::error::{FindCandidateError, Result};
use crate::processing::text_processor::TextProcessor;
use serde::{Deserialize, Serialize};

const MAX_KEYWORDS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub file_path: String,
    pub document_type: DocumentType,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    Cv,
    JobDescription,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub sections: Vec<SectionInfo>,
    pub word_count: usize,
    pub character_count: usize,
}

/// Byte range of a detected section. `start_index` points past the header line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionInfo {
    pub start_index: usize,
    pub end_index: usize,
    pub section_type: SectionType,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionType {
    Skills,
    Experience,
    Education,
    Summary,
    Projects,
    Certifications,
    Requirements,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub content: String,
    pub start_index: usize,
    pub end_index: usize,
    pub section_type: Option<SectionType>,
    pub chunk_id: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedDocument {
    pub original: Document,
    pub chunks: Vec<DocumentChunk>,
    pub sections: Vec<DocumentSection>,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSection {
    pub section_type: SectionType,
    pub content: String,
    pub start_index: usize,
    pub end_index: usize,
}

const SECTION_PATTERNS: &[(&str, &[&str])] = &[
    ("skills", &["skills", "technical skills", "core competencies", "expertise", "technologies", "tech stack"]),
    ("experience", &["experience", "work experience", "professional experience", "employment", "employment history", "work history", "career"]),
    ("education", &["education", "academic background", "qualifications", "academic"]),
    ("summary", &["summary", "profile", "objective", "about", "about me", "overview"]),
    ("projects", &["projects", "portfolio", "notable projects"]),
    ("certifications", &["certifications", "certificates", "licenses"]),
    ("requirements", &["requirements", "qualifications required", "what you bring", "must have", "responsibilities"]),
];

impl Document {
    pub fn new(
        content: String,
        file_path: String,
        document_type: DocumentType,
    ) -> Self {
        let word_count = content.split_whitespace().count();
        let character_count = content.chars().count();

        Self {
            content,
            file_path,
            document_type,
            metadata: DocumentMetadata {
                title: None,
                sections: Vec::new(),
                word_count,
                character_count,
            },
        }
    }

    /// Extract the document title from the first few lines
    pub fn extract_title(&mut self) {
        for line in self.content.lines().take(5) {
            let trimmed = line.trim();
            if trimmed.len() > 3
                && trimmed.len() < 100
                && !trimmed.contains('@')
                && !trimmed.starts_with('-')
                && Self::classify_header(trimmed).is_none()
            {
                self.metadata.title = Some(trimmed.to_string());
                break;
            }
        }
    }

    /// Classify a line as a section header, if it is one.
    ///
    /// Headers are short lines equal to a known pattern, optionally ending in ':'
    /// or starting with the pattern (e.g. "Skills & Tools").
    pub fn classify_header(line: &str) -> Option<SectionType> {
        let lowered = line.trim().trim_start_matches('#').trim().to_lowercase();
        let lowered = lowered.trim_end_matches(':').trim();
        if lowered.is_empty() || lowered.split_whitespace().count() > 4 {
            return None;
        }

        for (name, patterns) in SECTION_PATTERNS {
            for pattern in patterns.iter() {
                let starts = lowered.starts_with(pattern)
                    && lowered[pattern.len()..]
                        .chars()
                        .next()
                        .map_or(true, |c| !c.is_alphanumeric());
                if lowered == *pattern || starts {
                    return Some(Self::section_type_for(name));
                }
            }
        }
        None
    }

    fn section_type_for(name: &str) -> SectionType {
        match name {
            "skills" => SectionType::Skills,
            "experience" => SectionType::Experience,
            "education" => SectionType::Education,
            "summary" => SectionType::Summary,
            "projects" => SectionType::Projects,
            "certifications" => SectionType::Certifications,
            "requirements" => SectionType::Requirements,
            other => SectionType::Other(other.to_string()),
        }
    }

    /// Detect sections in the document. A section runs from its header line
    /// to the next header line or the end of the document.
    pub fn detect_sections(&mut self) {
        let mut headers: Vec<(usize, usize, SectionType)> = Vec::new();
        let mut offset = 0;

        for line in self.content.split_inclusive('\n') {
            if let Some(section_type) = Self::classify_header(line) {
                headers.push((offset, offset + line.len(), section_type));
            }
            offset += line.len();
        }

        let total = self.content.len();
        self.metadata.sections = headers
            .iter()
            .enumerate()
            .map(|(i, (_, body_start, section_type))| {
                let end_index = headers.get(i + 1).map(|h| h.0).unwrap_or(total);
                SectionInfo {
                    start_index: *body_start,
                    end_index,
                    section_type: section_type.clone(),
                }
            })
            .collect();
    }

    /// Create chunks from the document
    pub fn create_chunks(&self, chunk_size: usize, overlap: usize) -> Result<Vec<DocumentChunk>> {
        if chunk_size <= overlap {
            return Err(FindCandidateError::TextProcessing(
                "Chunk size must be greater than overlap".to_string(),
            ));
        }

        let mut chunks = Vec::new();
        let content_chars: Vec<char> = self.content.chars().collect();
        let total_length = content_chars.len();

        if total_length == 0 {
            return Ok(chunks);
        }

        // char index -> byte offset, for section lookup
        let byte_offsets: Vec<usize> = self.content.char_indices().map(|(b, _)| b).collect();

        let step_size = chunk_size - overlap;
        let mut start = 0;
        let mut chunk_id = 0;

        while start < total_length {
            let end = std::cmp::min(start + chunk_size, total_length);

            // Break at a word or sentence boundary when possible
            let mut actual_end = end;
            if end < total_length {
                for i in (start..end).rev() {
                    let c = content_chars[i];
                    if c.is_whitespace() || c == '.' || c == '!' || c == '?' {
                        actual_end = i + 1;
                        break;
                    }
                }
            }

            let chunk_content: String = content_chars[start..actual_end].iter().collect();
            let trimmed = chunk_content.trim();

            if !trimmed.is_empty() {
                chunks.push(DocumentChunk {
                    content: trimmed.to_string(),
                    start_index: start,
                    end_index: actual_end,
                    section_type: self.section_type_at(byte_offsets[start]),
                    chunk_id,
                });
                chunk_id += 1;
            }

            start += step_size;
        }

        Ok(chunks)
    }

    fn section_type_at(&self, byte_position: usize) -> Option<SectionType> {
        self.metadata
            .sections
            .iter()
            .find(|s| byte_position >= s.start_index && byte_position < s.end_index)
            .map(|s| s.section_type.clone())
    }

    /// Convert to processed document with chunks and sections
    pub fn process(mut self, chunk_size: usize, overlap: usize) -> Result<ProcessedDocument> {
        self.extract_title();
        self.detect_sections();

        let chunks = self.create_chunks(chunk_size, overlap)?;
        let sections = self.extract_sections();
        let keywords = self.extract_keywords();

        Ok(ProcessedDocument {
            original: self,
            chunks,
            sections,
            keywords,
        })
    }

    fn extract_sections(&self) -> Vec<DocumentSection> {
        self.metadata
            .sections
            .iter()
            .map(|info| DocumentSection {
                section_type: info.section_type.clone(),
                content: self.content[info.start_index..info.end_index].trim().to_string(),
                start_index: info.start_index,
                end_index: info.end_index,
            })
            .collect()
    }

    fn extract_keywords(&self) -> Vec<String> {
        TextProcessor::new().extract_keywords(&self.content, MAX_KEYWORDS)
    }
}

impl ProcessedDocument {
    /// Content of the first section of the given type
    pub fn section(&self, section_type: &SectionType) -> Option<&DocumentSection> {
        self.sections.iter().find(|s| &s.section_type == section_type)
    }
}

impl std::fmt::Display for SectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SectionType::Skills => write!(f, "Skills"),
            SectionType::Experience => write!(f, "Experience"),
            SectionType::Education => write!(f, "Education"),
            SectionType::Summary => write!(f, "Summary"),
            SectionType::Projects => write!(f, "Projects"),
            SectionType::Certifications => write!(f, "Certifications"),
            SectionType::Requirements => write!(f, "Requirements"),
            SectionType::Other(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CV: &str = "Jane Roe\nFrontend Developer\n\nSummary:\nBuilds accessible web apps\n\nExperience\nAcme Corp - React developer\n\nSkills:\nReact, TypeScript, CSS";

    #[test]
    fn test_document_creation() {
        let doc = Document::new(CV.to_string(), "jane.pdf".to_string(), DocumentType::Cv);

        assert_eq!(doc.document_type, DocumentType::Cv);
        assert!(doc.metadata.word_count > 0);
    }

    #[test]
    fn test_header_classification() {
        assert_eq!(Document::classify_header("Skills:"), Some(SectionType::Skills));
        assert_eq!(Document::classify_header("## Work Experience"), Some(SectionType::Experience));
        assert_eq!(Document::classify_header("EDUCATION"), Some(SectionType::Education));
        assert_eq!(Document::classify_header("Skillset mastery in many things"), None);
        assert_eq!(Document::classify_header("Experienced developer with a long sentence"), None);
    }

    #[test]
    fn test_section_detection_and_bounds() {
        let processed = Document::new(CV.to_string(), "jane.pdf".to_string(), DocumentType::Cv)
            .process(512, 50)
            .unwrap();

        assert_eq!(processed.original.metadata.title.as_deref(), Some("Jane Roe"));
        assert_eq!(processed.sections.len(), 3);

        let skills = processed.section(&SectionType::Skills).unwrap();
        assert_eq!(skills.content, "React, TypeScript, CSS");

        let experience = processed.section(&SectionType::Experience).unwrap();
        assert_eq!(experience.content, "Acme Corp - React developer");
    }

    #[test]
    fn test_chunking() {
        let content = "This is a test document with enough content to create multiple chunks when we set a small chunk size.".to_string();
        let doc = Document::new(content, "test.txt".to_string(), DocumentType::Cv);

        let chunks = doc.create_chunks(50, 10).unwrap();
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.content.chars().count() <= 50));
    }

    #[test]
    fn test_chunking_rejects_bad_overlap() {
        let doc = Document::new("abc".to_string(), "t.txt".to_string(), DocumentType::Cv);
        assert!(matches!(doc.create_chunks(10, 10), Err(FindCandidateError::TextProcessing(_))));
    }
}
