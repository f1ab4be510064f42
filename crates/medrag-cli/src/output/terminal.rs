//! Terminal output formatter

use super::FormatOptions;
use medrag_core::{ConsultationReport, FindingKind, InteractionFinding, Retrieval, RetrievalMode};

const SNIPPET_CHARS: usize = 160;

pub fn format_retrieval(retrieval: &Retrieval, options: &FormatOptions) -> String {
    let mut output = String::new();

    match retrieval.mode {
        RetrievalMode::Unavailable => {
            output.push_str("No document index loaded; run 'medrag index build' first.\n");
            return output;
        }
        RetrievalMode::KeywordFallback => {
            output.push_str("(encoder unavailable, keyword matches only)\n");
        }
        RetrievalMode::Semantic => {}
    }
    if retrieval.partial {
        output.push_str("(time budget reached, results may be incomplete)\n");
    }

    for result in &retrieval.results {
        let doc = &result.document;
        let score_pct = (result.score.clamp(0.0, 1.0) * 100.0) as u32;
        output.push_str(&format!(
            "{:>3}% [{}] {} #{}\n",
            score_pct,
            doc.domain,
            doc.display_title(),
            doc.id
        ));

        if options.full {
            for line in doc.text.lines() {
                output.push_str(&format!("  {}\n", line));
            }
        } else {
            output.push_str(&format!("  {}\n", snippet(&doc.text)));
        }
        if let Some(citation) = &doc.metadata.citation {
            output.push_str(&format!("  source: {}\n", citation));
        }
    }

    output
}

pub fn format_findings(findings: &[InteractionFinding]) -> String {
    if findings.is_empty() {
        return "No interactions or contraindications found.\n".to_string();
    }

    let mut output = String::new();
    for finding in findings {
        let subject = match &finding.condition {
            Some(condition) => format!("{} / {}", finding.drugs.join(" + "), condition),
            None => finding.drugs.join(" + "),
        };
        output.push_str(&format!(
            "{:<9} {:<22} {}\n",
            finding.severity.as_str().to_uppercase(),
            kind_label(finding.kind),
            subject
        ));
        output.push_str(&format!("  {}\n", finding.explanation));
        if !finding.monitoring.is_empty() {
            output.push_str(&format!("  monitor: {}\n", finding.monitoring.join(", ")));
        }
    }
    output
}

pub fn format_report(report: &ConsultationReport) -> String {
    let mut output = String::from("Evidence\n--------\n");
    let retrieval = Retrieval {
        results: report.evidence.clone(),
        mode: report.mode,
        partial: report.partial,
        variants: report.variants.clone(),
    };
    output.push_str(&format_retrieval(&retrieval, &FormatOptions { full: false }));
    output.push_str("\nMedication safety\n-----------------\n");
    output.push_str(&format_findings(&report.findings));
    output
}

fn kind_label(kind: FindingKind) -> &'static str {
    match kind {
        FindingKind::Interaction => "interaction",
        FindingKind::IndirectInteraction => "class interaction",
        FindingKind::SharedClass => "shared class",
        FindingKind::Contraindication => "contraindication",
        FindingKind::UnknownDrug => "unknown drug",
    }
}

fn snippet(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= SNIPPET_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(SNIPPET_CHARS).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_truncates_on_char_boundary() {
        let long = "é".repeat(300);
        let s = snippet(&long);
        assert!(s.ends_with("..."));
        assert_eq!(s.chars().count(), SNIPPET_CHARS + 3);
        assert_eq!(snippet("short  text"), "short text");
    }
}
