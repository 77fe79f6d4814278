use anyhow::Context;
use serde::Serialize;
use spn_bench_lib::{
    CandidateOutcome, FilterOptions, filter::RejectReason, filter_spn, logger::Logger,
    spn::text::load_net_from_file,
};

use crate::Args;

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum FilterVerdict {
    Valid {
        states: usize,
        edges: usize,
        total_mean_tokens: f64,
    },
    Invalid {
        reason: RejectReason,
    },
}

/// Loads one SPN matrix from JSON and prints the pipeline verdict.
pub fn filter(logger: &Logger, args: &Args) -> anyhow::Result<()> {
    let Some(file) = &args.target else {
        anyhow::bail!("missing required matrix file argument");
    };

    let (matrix, rates) =
        load_net_from_file(file).with_context(|| format!("failed to load net: {}", file))?;

    logger.info(&format!(
        "filtering a net with {} places, {} transitions",
        matrix.place_count(),
        matrix.transition_count()
    ));

    let verdict = match filter_spn(&matrix, Some(&rates), &FilterOptions::default()) {
        CandidateOutcome::Valid(record) => FilterVerdict::Valid {
            states: record.state_count(),
            edges: record.graph.edge_count(),
            total_mean_tokens: record.analysis.total_mean_tokens,
        },
        CandidateOutcome::Invalid(reason) => FilterVerdict::Invalid { reason },
    };

    println!("{}", serde_json::to_string_pretty(&verdict)?);

    Ok(())
}
