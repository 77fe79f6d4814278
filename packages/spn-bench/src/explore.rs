use anyhow::Context;
use spn_bench_lib::{
    ExploreLimits, get_reachability_graph, logger::Logger, spn::text::load_net_from_file,
};

use crate::Args;

/// Loads one SPN and prints its reachability graph, either as a summary or
/// as Graphviz DOT.
pub fn explore(logger: &Logger, args: &Args) -> anyhow::Result<()> {
    let Some(file) = &args.target else {
        anyhow::bail!("missing required matrix file argument");
    };

    let (matrix, _) =
        load_net_from_file(file).with_context(|| format!("failed to load net: {}", file))?;
    let graph = get_reachability_graph(&matrix, ExploreLimits::default());

    if args.dot {
        println!("{}", graph.to_dot());
        return Ok(());
    }

    logger.info(&format!(
        "{} states, {} edges, bounded: {}",
        graph.state_count(),
        graph.edge_count(),
        graph.bounded
    ));
    for (i, marking) in graph.markings.iter().enumerate() {
        println!("{}: {}", i, marking);
    }

    Ok(())
}
