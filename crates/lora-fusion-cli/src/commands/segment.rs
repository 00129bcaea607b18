//! `segment` command: units, perplexities and clauses.

use std::path::Path;
use std::sync::Arc;

use clap::Args;
use serde::Serialize;

use lora_fusion_core::segmenter::split_units;
use lora_fusion_core::stubs::KeywordPerplexityOracle;
use lora_fusion_core::{Clause, ClauseSegmenter};

use super::{load_config, print_json, read_text, OutputFormat};

/// Arguments for `segment`
#[derive(Args, Debug)]
pub struct SegmentArgs {
    /// Text to segment (reads stdin when omitted or `-`)
    pub text: Option<String>,

    /// Perplexity margin for clause boundaries
    #[arg(long)]
    pub margin: Option<f64>,

    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct UnitReport<'a> {
    text: &'a str,
    ppl: f64,
}

#[derive(Serialize)]
struct SegmentReport<'a> {
    units: Vec<UnitReport<'a>>,
    boundaries: Vec<usize>,
    clauses: Vec<Clause>,
}

pub async fn segment_command(args: SegmentArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let text = read_text(args.text)?;
    let margin = args.margin.unwrap_or(config.segmenter.ppl_margin_threshold);
    let segmenter =
        ClauseSegmenter::new(Arc::new(KeywordPerplexityOracle::new()), config.segmenter);

    let units = split_units(&text, segmenter.config().split_on_colon);
    let series = segmenter.perplexity_series(&text, &units).await?;
    let boundaries = series.boundaries(margin);
    let clauses = segmenter.segment_with_threshold(&text, margin).await?;

    let report = SegmentReport {
        units: units
            .iter()
            .zip(series.scores())
            .map(|(u, ppl)| UnitReport {
                text: u.slice(&text),
                ppl: *ppl,
            })
            .collect(),
        boundaries,
        clauses,
    };

    match args.format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => {
            for (i, unit) in report.units.iter().enumerate() {
                let mark = if report.boundaries.contains(&i) { " <- boundary" } else { "" };
                println!("{:>3} {:>8.3}  {}{}", i, unit.ppl, unit.text, mark);
            }
            for clause in &report.clauses {
                println!(
                    "clause {} [{}..{}]: {}",
                    clause.index, clause.start, clause.end, clause.text
                );
            }
        }
    }
    Ok(())
}
