//! Term-vector store with cosine search and JSON persistence

use crate::config::{KnowledgeConfig, ProcessingConfig};
use crate::error::{FindCandidateError, Result};
use crate::processing::document::{Document, DocumentType};
use crate::processing::text_processor::TextProcessor;
use crate::processing::CandidateProfile;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;

/// Sparse, L2-normalised term-frequency vector
pub type TermVector = BTreeMap<String, f32>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    pub profile: CandidateProfile,
    pub terms: TermVector,
    pub chunks: Vec<TermVector>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    collection_name: String,
    records: BTreeMap<String, KnowledgeRecord>,
}

pub struct KnowledgeBase {
    collection_name: String,
    records: BTreeMap<String, KnowledgeRecord>,
    processor: TextProcessor,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl KnowledgeBase {
    pub fn new(collection_name: impl Into<String>, chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            collection_name: collection_name.into(),
            records: BTreeMap::new(),
            processor: TextProcessor::new(),
            chunk_size,
            chunk_overlap,
        }
    }

    pub fn from_config(knowledge: &KnowledgeConfig, processing: &ProcessingConfig) -> Self {
        Self::new(
            knowledge.collection_name.clone(),
            processing.chunk_size,
            processing.chunk_overlap,
        )
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&KnowledgeRecord> {
        self.records.get(id)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &CandidateProfile> {
        self.records.values().map(|r| &r.profile)
    }

    /// Index a profile with its CV text. An existing record with the same id is replaced.
    pub fn insert(&mut self, profile: CandidateProfile, text: &str) -> Result<()> {
        let terms = self.vectorize(text);
        let chunks = Document::new(text.to_string(), profile.path.to_string_lossy().to_string(), DocumentType::Cv)
            .create_chunks(self.chunk_size, self.chunk_overlap)?
            .iter()
            .map(|chunk| self.vectorize(&chunk.content))
            .filter(|v| !v.is_empty())
            .collect();

        debug!("Indexed {} into {}", profile.id, self.collection_name);
        self.records
            .insert(profile.id.clone(), KnowledgeRecord { profile, terms, chunks });
        Ok(())
    }

    /// Records most similar to the query, best first. Ties resolve by id.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<SearchHit> {
        if top_k == 0 {
            return Vec::new();
        }

        let query_vector = self.vectorize(query);
        let mut hits: Vec<SearchHit> = self
            .records
            .iter()
            .map(|(id, record)| SearchHit {
                id: id.clone(),
                score: Self::record_score(record, &query_vector),
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(top_k);
        hits
    }

    /// Similarity of a single record to the query; 0 for unknown ids
    pub fn similarity(&self, id: &str, query: &str) -> f32 {
        match self.records.get(id) {
            Some(record) => Self::record_score(record, &self.vectorize(query)),
            None => 0.0,
        }
    }

    fn record_score(record: &KnowledgeRecord, query: &TermVector) -> f32 {
        let document = cosine_similarity(&record.terms, query);
        let best_chunk = record
            .chunks
            .iter()
            .map(|chunk| cosine_similarity(chunk, query))
            .fold(None, |best: Option<f32>, s| Some(best.map_or(s, |b| b.max(s))));

        match best_chunk {
            Some(chunk) => 0.5 * document + 0.5 * chunk,
            None => document,
        }
    }

    fn vectorize(&self, text: &str) -> TermVector {
        let mut vector = self.processor.term_frequencies(text);
        let norm = vector.values().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in vector.values_mut() {
                *value /= norm;
            }
        }
        vector
    }

    /// Empty the collection
    pub fn reset(&mut self) {
        self.records.clear();
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let snapshot = Snapshot {
            collection_name: self.collection_name.clone(),
            records: self.records.clone(),
        };
        let content = serde_json::to_string_pretty(&snapshot)?;
        fs::write(path, content).await?;

        info!("Saved {} records to {}", self.records.len(), path.display());
        Ok(())
    }

    /// Replace the in-memory records with the ones stored at `path`
    pub async fn load(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path).await?;
        let snapshot: Snapshot = serde_json::from_str(&content)?;

        if snapshot.collection_name != self.collection_name {
            return Err(FindCandidateError::KnowledgeBase(format!(
                "{} holds collection '{}', expected '{}'",
                path.display(),
                snapshot.collection_name,
                self.collection_name
            )));
        }

        self.records = snapshot.records;
        info!("Loaded {} records from {}", self.records.len(), path.display());
        Ok(())
    }
}

/// Cosine similarity of two sparse vectors
pub fn cosine_similarity(a: &TermVector, b: &TermVector) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot_product: f32 = small
        .iter()
        .filter_map(|(term, x)| large.get(term).map(|y| x * y))
        .sum();
    let norm_a: f32 = a.values().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.values().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}
