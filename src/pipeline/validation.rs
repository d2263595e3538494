//! Sanitising the matching agent's rankings

use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Response shape requested from the matching agent.
///
/// Entries stay untyped so one malformed entry cannot sink the whole response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LlmRankings {
    #[serde(default)]
    pub rankings: Vec<Value>,
}

/// One ranking entry as returned by the model, before validation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawRanking {
    id: Option<Value>,
    score: Option<Value>,
    strengths: Option<Value>,
    weaknesses: Option<Value>,
    reasoning: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRanking {
    /// 0.0..=1.0
    pub score: f32,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validation {
    pub rankings: BTreeMap<String, ValidatedRanking>,
    pub warnings: Vec<String>,
}

impl RawRanking {
    fn id(&self) -> Option<String> {
        let id = match self.id.as_ref()? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!id.is_empty()).then_some(id)
    }

    /// Numeric score, accepting numbers and numeric strings such as "85" or "85%"
    fn numeric_score(&self) -> Option<f64> {
        let score = match self.score.as_ref()? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
            _ => None,
        }?;
        score.is_finite().then_some(score)
    }
}

/// Keep only well-formed rankings for the candidates that were sent to the model.
///
/// Ids outside `sent_ids` are dropped, the first entry per id wins, scores are
/// clamped to 0..100 and scaled to 0..1. Sent candidates the model did not
/// rank are reported as warnings and keep no LLM score.
pub fn validate_rankings(raw: Vec<Value>, sent_ids: &[String]) -> Validation {
    let sent: BTreeSet<&str> = sent_ids.iter().map(String::as_str).collect();
    let mut validation = Validation::default();

    for (position, value) in raw.into_iter().enumerate() {
        let entry = match serde_json::from_value::<RawRanking>(value) {
            Ok(entry) => entry,
            Err(_) => {
                validation
                    .warnings
                    .push(format!("LLM ranking entry {} is not an object and was ignored", position + 1));
                continue;
            }
        };

        let Some(id) = entry.id() else {
            validation.warnings.push("LLM ranking entry without a candidate id was ignored".to_string());
            continue;
        };

        if !sent.contains(id.as_str()) {
            validation
                .warnings
                .push(format!("LLM ranking ignored unknown candidate id '{}'", id));
            continue;
        }
        if validation.rankings.contains_key(&id) {
            validation
                .warnings
                .push(format!("LLM ranked '{}' more than once; kept the first entry", id));
            continue;
        }

        let Some(score) = entry.numeric_score() else {
            validation
                .warnings
                .push(format!("LLM ranking for '{}' had no usable score", id));
            continue;
        };

        let clamped = score.clamp(0.0, 100.0);
        if clamped != score {
            validation
                .warnings
                .push(format!("LLM score {} for '{}' clamped to {}", score, id, clamped));
        }

        let strengths = text_list(entry.strengths, &id, "strengths", &mut validation.warnings);
        let weaknesses = text_list(entry.weaknesses, &id, "weaknesses", &mut validation.warnings);
        let reasoning = match entry.reasoning {
            Some(Value::String(s)) => Some(s.trim().to_string()).filter(|r| !r.is_empty()),
            Some(Value::Null) | None => None,
            Some(other) => {
                validation
                    .warnings
                    .push(format!("LLM reasoning for '{}' was not text and was ignored", id));
                log::debug!("Unusable reasoning: {}", other);
                None
            }
        };

        validation.rankings.insert(
            id,
            ValidatedRanking {
                score: (clamped / 100.0) as f32,
                strengths,
                weaknesses,
                reasoning,
            },
        );
    }

    for id in sent_ids {
        if !validation.rankings.contains_key(id) {
            validation
                .warnings
                .push(format!("LLM did not rank '{}'; heuristic score used", id));
        }
    }

    validation
}

/// A list of strings from an array, a single string or null
fn text_list(value: Option<Value>, id: &str, field: &str, warnings: &mut Vec<String>) -> Vec<String> {
    let items = match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => vec![s],
        Some(Value::Array(values)) => {
            let total = values.len();
            let items: Vec<String> = values
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect();
            if items.len() < total {
                warnings.push(format!("LLM {} for '{}' contained non-text items", field, id));
            }
            items
        }
        Some(_) => {
            warnings.push(format!("LLM {} for '{}' were not a list and were ignored", field, id));
            Vec::new()
        }
    };

    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
