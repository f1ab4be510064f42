//! Index build and stats commands

use crate::app::{IndexAction, IndexArgs, OutputFormat};
use anyhow::Result;
use medrag_core::{embedder_from_config, Config, DocumentIndex, DocumentRecord, IndexOptions, MedRagError};
use std::path::PathBuf;

const ENCODE_BATCH: usize = 32;

pub async fn run(args: IndexArgs, config: &Config, format: OutputFormat) -> Result<()> {
    match args.action {
        IndexAction::Build { input, output } => {
            let dir = snapshot_dir(output, config)?;
            build(input, dir, config).await
        }
        IndexAction::Stats { dir } => {
            let dir = snapshot_dir(dir, config)?;
            stats(dir, config, format)
        }
    }
}

fn snapshot_dir(explicit: Option<PathBuf>, config: &Config) -> Result<PathBuf> {
    explicit.or_else(|| config.index_dir.clone()).ok_or_else(|| {
        MedRagError::InvalidArgument(
            "no index directory: pass one explicitly or set index_dir / MEDRAG_INDEX_DIR".into(),
        )
        .into()
    })
}

async fn build(input: PathBuf, dir: PathBuf, config: &Config) -> Result<()> {
    let content = std::fs::read_to_string(&input)?;
    let mut records: Vec<DocumentRecord> = serde_json::from_str(&content)?;

    let missing: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.embedding.is_empty())
        .map(|(i, _)| i)
        .collect();

    if !missing.is_empty() {
        let embedder = embedder_from_config(&config.embedding)?;
        eprintln!(
            "Encoding {} records with {} ({} dimensions)",
            missing.len(),
            embedder.model_name(),
            embedder.dimensions()
        );
        let mut encoded = 0;
        for batch in missing.chunks(ENCODE_BATCH) {
            let texts: Vec<String> = batch.iter().map(|&i| records[i].text.clone()).collect();
            let vectors = embedder.embed_batch(&texts).await?;
            for (&i, vector) in batch.iter().zip(vectors) {
                records[i].embedding = vector;
            }
            encoded += batch.len();
            eprint!("\rEncoded {}/{}   ", encoded, missing.len());
        }
        eprintln!();
    }

    let options = IndexOptions {
        ann_threshold: config.retrieval.ann_threshold,
    };
    let index = DocumentIndex::build_with(records, options)?;
    index.save(&dir)?;

    println!(
        "Indexed {} documents ({} dimensions) into {}",
        index.len(),
        index.dimension(),
        dir.display()
    );
    Ok(())
}

fn stats(dir: PathBuf, config: &Config, format: OutputFormat) -> Result<()> {
    let options = IndexOptions {
        ann_threshold: config.retrieval.ann_threshold,
    };
    let index = DocumentIndex::load_with(&dir, options)?;
    let manifest = DocumentIndex::read_manifest(&dir)?;
    let stats = index.stats();

    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "stats": stats,
                "manifest": manifest,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Cli => {
            println!("Documents:       {}", stats.total_documents);
            println!("Dimensions:      {}", stats.dimension);
            println!("ANN graph:       {}", if stats.ann_built { "built" } else { "exact search" });
            println!("Built at:        {}", manifest.built_at.to_rfc3339());
            println!();
            println!("Domains:");
            for (domain, count) in &stats.domains {
                println!("  {:<24} {}", domain, count);
            }
        }
    }
    Ok(())
}
