//! Knowledge graph commands

use crate::app::{DrugsArgs, GraphAction, GraphArgs, OutputFormat};
use anyhow::Result;
use medrag_core::{Config, KnowledgeBase};

pub fn run(args: GraphArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let graph = KnowledgeBase::load_graph(config)?;

    match args.action {
        GraphAction::Stats => {
            let stats = graph.stats();
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
                OutputFormat::Cli => {
                    println!("Nodes:           {}", stats.total_nodes);
                    println!("  Drugs:         {}", stats.drugs);
                    println!("  Drug classes:  {}", stats.drug_classes);
                    println!("  Conditions:    {}", stats.conditions);
                    println!();
                    println!("Edges:           {}", stats.total_edges);
                    println!("  Interactions:  {}", stats.interactions);
                    println!("  Treats:        {}", stats.treats);
                    println!("  Contraindicated: {}", stats.contraindications);
                    println!("  Class members: {}", stats.memberships);
                }
            }
        }
        GraphAction::Export { output } => {
            graph.save(&output)?;
            println!(
                "Exported {} nodes and {} edges to {}",
                graph.node_count(),
                graph.edge_count(),
                output.display()
            );
        }
    }
    Ok(())
}

pub fn run_drugs(args: DrugsArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let graph = KnowledgeBase::load_graph(config)?;
    let names = graph.search_drugs(&args.query, args.limit);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&names)?),
        OutputFormat::Cli => {
            for name in names {
                println!("{}", name);
            }
        }
    }
    Ok(())
}
