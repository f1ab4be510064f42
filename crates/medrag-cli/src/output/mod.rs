//! Output formatters

pub mod json;
pub mod terminal;

use crate::app::OutputFormat;
use medrag_core::{ConsultationReport, InteractionFinding, Retrieval};

/// Format options
pub struct FormatOptions {
    pub full: bool,
}

pub fn format_retrieval(retrieval: &Retrieval, format: OutputFormat, options: &FormatOptions) -> String {
    match format {
        OutputFormat::Json => json::to_pretty(retrieval),
        OutputFormat::Cli => terminal::format_retrieval(retrieval, options),
    }
}

pub fn format_findings(findings: &[InteractionFinding], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::to_pretty(&findings),
        OutputFormat::Cli => terminal::format_findings(findings),
    }
}

pub fn format_report(report: &ConsultationReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::to_pretty(report),
        OutputFormat::Cli => terminal::format_report(report),
    }
}
