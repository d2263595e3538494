//! Report generation

pub mod formatter;
pub mod report;

pub use formatter::{render_report, write_report, ConsoleFormatter, JsonFormatter, MarkdownFormatter, OutputFormatter};
pub use report::{RankedCandidate, RankingReport, ScoreBreakdown, SkippedCv};
