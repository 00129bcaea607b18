//! `route` command: one clause through the predictor and router.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use serde::Serialize;

use lora_fusion_core::stubs::KeywordRelevancePredictor;
use lora_fusion_core::traits::RelevancePredictor;
use lora_fusion_core::{
    Clause, ExpertId, ExpertRegistry, FusionWeights, PerformanceMatrix, SparsegenRouter,
    TaskAffinityMap,
};

use super::{experts_or_default, load_config, print_json, read_text, ExpertSpec, OutputFormat};

/// Arguments for `route`
#[derive(Args, Debug)]
pub struct RouteArgs {
    /// Clause text (reads stdin when omitted or `-`)
    pub text: Option<String>,

    /// Expert as id:domain[:tags]; repeatable. Defaults to math, code and creative
    #[arg(short, long = "expert")]
    pub experts: Vec<ExpertSpec>,

    /// Performance matrix JSON used for the affinity penalty
    #[arg(long)]
    pub matrix: Option<PathBuf>,

    /// Sparsity control in [0, 0.99]
    #[arg(long)]
    pub lambda: Option<f64>,

    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct RouteReport {
    lambda_val: f64,
    logits: Vec<(ExpertId, f64)>,
    adjusted: Vec<(ExpertId, f64)>,
    sanitized: bool,
    weights: FusionWeights,
}

pub async fn route_command(args: RouteArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let text = read_text(args.text)?;
    let lambda_val = args.lambda.unwrap_or(config.routing.lambda_val);

    let registry = ExpertRegistry::new();
    for expert in experts_or_default(args.experts) {
        registry.register(
            &*expert.id,
            &*expert.domain,
            expert.tags.iter().cloned(),
            expert.storage(),
        )?;
    }
    let affinity = TaskAffinityMap::new();
    if let Some(path) = &args.matrix {
        let matrix = PerformanceMatrix::from_file(path)
            .with_context(|| format!("loading performance matrix {}", path.display()))?;
        affinity.recompute(&matrix)?;
    }

    let logits = KeywordRelevancePredictor::new()
        .predict(&text, &registry.active_experts())
        .await?;
    let router = SparsegenRouter::new(config.routing);
    let clause = Clause::new(0, 0, text.len(), text.as_str());
    let outcome = router.route_with_snapshot(&clause, &logits, &affinity.snapshot(), lambda_val)?;

    let report = RouteReport {
        lambda_val,
        logits: logits.iter().map(|(id, v)| (id.clone(), v)).collect(),
        adjusted: outcome.adjusted,
        sanitized: outcome.sanitized,
        weights: outcome.weights,
    };

    match args.format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => {
            if report.logits.is_empty() {
                println!("no candidates: clause would use the base model");
            }
            for (id, adjusted) in &report.adjusted {
                println!(
                    "{:<20} logit {:>8.3}  adjusted {:>8.3}  weight {:.4}",
                    id.as_str(),
                    logits.get(id).unwrap_or(f64::NAN),
                    adjusted,
                    report.weights.get(id)
                );
            }
            println!("signature {}", report.weights.signature());
        }
    }
    Ok(())
}
