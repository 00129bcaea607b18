//! `affinity` command: positions and pairwise fusion costs.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::Serialize;

use lora_fusion_core::{ExpertId, PerformanceMatrix, TaskAffinityMap};

use super::{print_json, OutputFormat};

/// Arguments for `affinity`
#[derive(Args, Debug)]
pub struct AffinityArgs {
    /// Performance matrix JSON: {"expert_ids": [...], "scores": [[...], ...]}
    pub matrix: PathBuf,

    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct AffinityReport {
    stress: f64,
    positions: Vec<(ExpertId, [f64; 2])>,
    costs: Vec<(ExpertId, ExpertId, f64)>,
}

pub fn affinity_command(args: AffinityArgs) -> anyhow::Result<()> {
    let matrix = PerformanceMatrix::from_file(&args.matrix)
        .with_context(|| format!("loading performance matrix {}", args.matrix.display()))?;
    let map = TaskAffinityMap::new();
    let snapshot = map.recompute(&matrix)?;

    let ids = &matrix.expert_ids;
    let positions = ids
        .iter()
        .filter_map(|id| snapshot.position(id).map(|p| (id.clone(), p)))
        .collect();
    let mut costs = Vec::new();
    for (i, a) in ids.iter().enumerate() {
        for b in &ids[i + 1..] {
            costs.push((a.clone(), b.clone(), snapshot.fusion_cost(a, b)));
        }
    }
    let report = AffinityReport {
        stress: snapshot.stress,
        positions,
        costs,
    };

    match args.format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => {
            println!("stress {:.6}", report.stress);
            for (id, [x, y]) in &report.positions {
                println!("{:<20} ({:>8.4}, {:>8.4})", id.as_str(), x, y);
            }
            for (a, b, cost) in &report.costs {
                println!("{} <-> {}: {:.4}", a, b, cost);
            }
        }
    }
    Ok(())
}
