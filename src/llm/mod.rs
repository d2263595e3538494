//! LLM integration: provider client, agents and prompt templates

pub mod agents;
pub mod client;

pub use agents::{parse_json_block, Agent, PromptTemplates};
pub use client::{LlmProvider, LlmRequest, LlmResponse, OpenAiClient, TokenUsage};
