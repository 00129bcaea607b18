//! `fuse` command: one request through the whole engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use tracing::info;

use lora_fusion_core::{FusionEngine, PerformanceMatrix};

use super::{experts_or_default, load_config, print_json, read_text, ExpertSpec, OutputFormat};

/// Arguments for `fuse`
#[derive(Args, Debug)]
pub struct FuseArgs {
    /// Request text (reads stdin when omitted or `-`)
    pub text: Option<String>,

    /// Expert as id:domain[:tags]; repeatable. Defaults to math, code and creative
    #[arg(short, long = "expert")]
    pub experts: Vec<ExpertSpec>,

    /// Performance matrix JSON used to compute task affinity
    #[arg(long)]
    pub matrix: Option<PathBuf>,

    /// Sparsity control in [0, 0.99]
    #[arg(long)]
    pub lambda: Option<f64>,

    /// Perplexity margin for clause boundaries
    #[arg(long)]
    pub margin: Option<f64>,

    /// Request deadline in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Run the request this many times (later runs hit the cache)
    #[arg(long, default_value_t = 1)]
    pub repeat: usize,

    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

pub async fn fuse_command(args: FuseArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let text = read_text(args.text)?;

    let engine = Arc::new(
        FusionEngine::builder()
            .config(config)
            .with_stub_collaborators()
            .build()
            .context("building engine")?,
    );
    for expert in experts_or_default(args.experts) {
        engine
            .register_expert(
                &*expert.id,
                &*expert.domain,
                expert.tags.iter().cloned(),
                expert.storage(),
            )
            .with_context(|| format!("registering expert {}", expert.id))?;
    }
    if let Some(path) = &args.matrix {
        let matrix = PerformanceMatrix::from_file(path)
            .with_context(|| format!("loading performance matrix {}", path.display()))?;
        engine
            .recompute_affinity(&matrix)
            .context("recomputing task affinity")?;
    }

    let mut request = engine.config().request_defaults();
    if let Some(lambda) = args.lambda {
        request = request.with_lambda(lambda);
    }
    if let Some(margin) = args.margin {
        request = request.with_ppl_margin_threshold(margin);
    }
    if let Some(timeout_ms) = args.timeout_ms {
        request = request.with_timeout_ms(timeout_ms);
    }

    for run in 0..args.repeat.max(1) {
        let result = engine.fuse_and_generate(&text, request.clone()).await?;
        info!(run, cache_hit = result.cache_hit, "Request finished");
        match args.format {
            OutputFormat::Json => print_json(&result)?,
            OutputFormat::Text => {
                for output in &result.clauses {
                    let weights = output
                        .weights
                        .iter()
                        .map(|(id, w)| format!("{}={:.3}", id, w))
                        .collect::<Vec<_>>()
                        .join(", ");
                    let route = match output.fallback {
                        Some(reason) => format!("base ({:?})", reason),
                        None => weights,
                    };
                    println!(
                        "clause {}: {:?}\n  -> {}",
                        output.clause.index, output.clause.text, route
                    );
                }
                println!("{}", result.text);
                if result.cache_hit {
                    println!("(cache hit)");
                }
            }
        }
    }

    if args.format == OutputFormat::Json {
        print_json(&engine.stats())?;
    }
    engine.shutdown().await;
    Ok(())
}
