//! In-process knowledge base of candidate records

pub mod store;

pub use store::{cosine_similarity, KnowledgeBase, KnowledgeRecord, SearchHit, TermVector};
