//! Report formatters: markdown, JSON and console

use crate::config::OutputFormat;
use crate::error::{FindCandidateError, Result};
use crate::output::report::{percent, RankedCandidate, RankingReport};
use askama::Template;
use colored::{Color, Colorize};
use log::info;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Trait for formatting ranking reports
pub trait OutputFormatter {
    fn format_report(&self, report: &RankingReport) -> Result<String>;
    fn supports_format(&self) -> OutputFormat;
}

/// Console summary with optional colors
pub struct ConsoleFormatter {
    use_colors: bool,
}

/// JSON formatter for structured output
pub struct JsonFormatter {
    pretty: bool,
}

/// Markdown formatter for the report file
pub struct MarkdownFormatter {
    include_summaries: bool,
}

#[derive(Template)]
#[template(
    source = r#"# Candidate Ranking Report

Generated: {{ generated_at }} | CVs ranked: {{ candidate_count }} | Scoring: {{ scoring }}

## Job Description

{{ job_summary }}

**Key requirements:** {{ requirements }}

## Recommendation

{{ recommendation }}
{% if has_summary %}
## Summary

{{ summary }}
{% endif %}
## Ranking

| Rank | Candidate | File | Overall | Keywords | Similarity | LLM |
|---:|---|---|---:|---:|---:|---:|
{% for row in rows -%}
| {{ row.rank }} | {{ row.name }}{% if row.recommended %} ⭐{% endif %} | {{ row.file_name }} | {{ row.overall }} | {{ row.keyword }} | {{ row.similarity }} | {{ row.llm }} |
{% endfor %}
## Candidate Details
{% for row in rows %}
### {{ row.rank }}. {{ row.name }}

- **File:** {{ row.file_name }}
- **Contact:** {{ row.contact }}
- **Experience:** {{ row.years }}
- **Matched skills:** {{ row.matched }}
- **Missing skills:** {{ row.missing }}
{% if include_summaries %}- **Summary:** {{ row.summary }}
{% endif %}
**Strengths**

{{ row.strengths }}

**Weaknesses**

{{ row.weaknesses }}
{% if row.has_reasoning %}
**Reasoning:** {{ row.reasoning }}
{% endif %}{% endfor %}{% if has_skipped %}
## Skipped Files

{{ skipped }}
{% endif %}{% if has_warnings %}
## Validation Warnings

{{ warnings }}
{% endif %}
---
Generated by find-candidate v{{ version }} in {{ processing_time }}ms
"#,
    ext = "md",
    escape = "none"
)]
struct MarkdownTemplate {
    generated_at: String,
    candidate_count: usize,
    scoring: String,
    job_summary: String,
    requirements: String,
    recommendation: String,
    has_summary: bool,
    summary: String,
    rows: Vec<MarkdownRow>,
    include_summaries: bool,
    has_skipped: bool,
    skipped: String,
    has_warnings: bool,
    warnings: String,
    version: String,
    processing_time: u64,
}

struct MarkdownRow {
    rank: usize,
    name: String,
    file_name: String,
    recommended: bool,
    overall: String,
    keyword: String,
    similarity: String,
    llm: String,
    contact: String,
    years: String,
    matched: String,
    missing: String,
    summary: String,
    strengths: String,
    weaknesses: String,
    has_reasoning: bool,
    reasoning: String,
}

impl MarkdownFormatter {
    pub fn new(include_summaries: bool) -> Self {
        Self { include_summaries }
    }

    fn create_template_data(&self, report: &RankingReport) -> MarkdownTemplate {
        let rows = report
            .candidates
            .iter()
            .map(|c| Self::row(c, report.is_recommended(&c.profile.id)))
            .collect();

        let summary = report.summary.clone().unwrap_or_default();

        MarkdownTemplate {
            generated_at: report.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            candidate_count: report.candidates.len(),
            scoring: match &report.model {
                Some(model) => format!("heuristic + LLM ({})", model),
                None => "heuristic".to_string(),
            },
            job_summary: truncate(&report.job_description, 600),
            requirements: join_or(&report.job_requirements, "none detected"),
            recommendation: recommendation(report),
            has_summary: !summary.trim().is_empty(),
            summary,
            rows,
            include_summaries: self.include_summaries,
            has_skipped: !report.skipped.is_empty(),
            skipped: report
                .skipped
                .iter()
                .map(|s| format!("- {}: {}", s.file_name, s.reason))
                .collect::<Vec<_>>()
                .join("\n"),
            has_warnings: !report.warnings.is_empty(),
            warnings: bullets(&report.warnings, "none"),
            version: env!("CARGO_PKG_VERSION").to_string(),
            processing_time: report.processing_time_ms,
        }
    }

    fn row(candidate: &RankedCandidate, recommended: bool) -> MarkdownRow {
        let profile = &candidate.profile;
        let contact = [profile.email.as_deref(), profile.phone.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");

        MarkdownRow {
            rank: candidate.rank,
            name: table_cell(&profile.name),
            file_name: table_cell(&profile.file_name),
            recommended,
            overall: percent(candidate.scores.overall),
            keyword: percent(candidate.scores.keyword),
            similarity: percent(candidate.scores.similarity),
            llm: candidate.scores.llm.map(percent).unwrap_or_else(|| "n/a".to_string()),
            contact: if contact.is_empty() { "not found".to_string() } else { contact },
            years: profile
                .years_of_experience
                .map(|y| format!("{} years", y))
                .unwrap_or_else(|| "not stated".to_string()),
            matched: join_or(&candidate.matched_skills, "none"),
            missing: join_or(&candidate.missing_skills, "none"),
            summary: profile.summary.clone(),
            strengths: bullets(&candidate.strengths, "None identified"),
            weaknesses: bullets(&candidate.weaknesses, "None identified"),
            has_reasoning: candidate.reasoning.is_some(),
            reasoning: candidate.reasoning.clone().unwrap_or_default(),
        }
    }
}

impl OutputFormatter for MarkdownFormatter {
    fn format_report(&self, report: &RankingReport) -> Result<String> {
        Ok(self.create_template_data(report).render()?)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Markdown
    }
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &RankingReport) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(report)?)
        } else {
            Ok(serde_json::to_string(report)?)
        }
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Json
    }
}

impl ConsoleFormatter {
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    fn colorize(&self, text: &str, color: Color) -> String {
        if self.use_colors {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn format_header(&self, title: &str) -> String {
        if self.use_colors {
            format!("\n{}\n", title.blue().bold())
        } else {
            format!("\n{}\n", title)
        }
    }

    fn score_color(score: f32) -> Color {
        match (score * 100.0) as u32 {
            80..=100 => Color::Green,
            65..=79 => Color::BrightGreen,
            50..=64 => Color::Yellow,
            _ => Color::Red,
        }
    }

    pub fn format_report(&self, report: &RankingReport) -> String {
        let mut output = String::new();

        output.push_str(&self.format_header("📊 CANDIDATE RANKING"));
        output.push_str(&format!(
            "CVs ranked: {} | Skipped: {} | Model: {}\n\n",
            report.candidates.len(),
            report.skipped.len(),
            report.model.as_deref().unwrap_or("none (heuristic)")
        ));

        for candidate in &report.candidates {
            let marker = if report.is_recommended(&candidate.profile.id) { "⭐" } else { "  " };
            let overall = percent(candidate.scores.overall);
            output.push_str(&format!(
                "{} {:>2}. {:<28} {:>5}  (keywords {}, similarity {}, llm {})\n",
                marker,
                candidate.rank,
                candidate.profile.name,
                self.colorize(&overall, Self::score_color(candidate.scores.overall)),
                percent(candidate.scores.keyword),
                percent(candidate.scores.similarity),
                candidate.scores.llm.map(percent).unwrap_or_else(|| "n/a".to_string()),
            ));
        }

        output.push_str(&format!("\n{}\n", self.colorize(&recommendation(report), Color::Cyan)));

        if !report.skipped.is_empty() {
            output.push_str(&self.format_header("⚠️  Skipped files"));
            for skipped in &report.skipped {
                output.push_str(&format!("  • {}: {}\n", skipped.file_name, skipped.reason));
            }
        }

        if !report.warnings.is_empty() {
            output.push_str(&self.format_header("⚠️  Warnings"));
            for warning in &report.warnings {
                output.push_str(&format!("  • {}\n", self.colorize(warning, Color::Yellow)));
            }
        }

        output
    }
}

/// Render the report in the requested file format
pub fn render_report(report: &RankingReport, format: OutputFormat, include_summaries: bool) -> Result<String> {
    let formatter: Box<dyn OutputFormatter> = match format {
        OutputFormat::Markdown => Box::new(MarkdownFormatter::new(include_summaries)),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
    };
    formatter.format_report(report)
}

/// Write the report atomically: a temp file in the target directory is persisted over `path`
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(content.as_bytes())?;
    temp.flush()?;
    temp.persist(path).map_err(|e| {
        FindCandidateError::OutputFormatting(format!("Failed to write {}: {}", path.display(), e.error))
    })?;

    info!("Report written to {}", path.display());
    Ok(())
}

fn recommendation(report: &RankingReport) -> String {
    let recommended: Vec<String> = report
        .recommended_candidates()
        .map(|c| format!("{} ({})", c.profile.name, percent(c.scores.overall)))
        .collect();

    if recommended.is_empty() {
        match report.best() {
            Some(best) => format!(
                "No candidate reached the recommendation threshold. Closest match: {} ({}).",
                best.profile.name,
                percent(best.scores.overall)
            ),
            None => "No candidates were ranked.".to_string(),
        }
    } else {
        format!("Recommended: {}", recommended.join(", "))
    }
}

fn bullets(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        format!("- {}", empty)
    } else {
        items.iter().map(|i| format!("- {}", i)).collect::<Vec<_>>().join("\n")
    }
}

fn join_or(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        empty.to_string()
    } else {
        items.join(", ")
    }
}

fn table_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn truncate(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        format!("{}…", collapsed.chars().take(max_chars).collect::<String>())
    }
}
