//! Interactions command

use crate::app::{InteractionArgs, OutputFormat};
use crate::output::format_findings;
use anyhow::Result;
use medrag_core::{Config, InteractionAnalyzer, KnowledgeBase};

pub fn run(args: InteractionArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let graph = KnowledgeBase::load_graph(config)?;
    let findings = InteractionAnalyzer::new(&graph).analyze(&args.medications, &args.conditions)?;

    print!("{}", format_findings(&findings, format));
    Ok(())
}
