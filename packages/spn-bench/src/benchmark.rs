use std::{path::Path, time::Instant};

use anyhow::Context;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::Serialize;
use spn_bench_lib::{
    ctmc::{
        build_generator, constrained_system,
        solve::{DirectSolver, GmresSolver, SteadyStateSolver},
    },
    dataset::load_dataset,
    filter::SpnRecord,
    logger::Logger,
};

use crate::Args;

#[derive(Debug, Clone, Serialize)]
struct BenchmarkRow {
    category: String,
    num_states: usize,
    exact_time_s: f64,
    gmres_time_s: f64,
    gmres_precision_loss: f64,
}

/// Re-solves every SPN of a generated dataset with the exact and the
/// iterative solver and writes a comparison CSV next to the dataset.
pub fn benchmark(logger: &Logger, args: &Args) -> anyhow::Result<()> {
    let Some(folder) = &args.target else {
        anyhow::bail!("missing required dataset folder argument");
    };
    let dataset_dir = Path::new(folder).join("dataset");

    let records = load_dataset(&dataset_dir)
        .with_context(|| format!("failed to load dataset from {}", dataset_dir.display()))?;
    if records.is_empty() {
        anyhow::bail!("dataset at {} is empty", dataset_dir.display());
    }

    logger.info(&format!("benchmarking {} SPNs", records.len()));

    let rows: Vec<BenchmarkRow> = records
        .par_iter()
        .filter_map(|(name, record)| match solve_both(record) {
            Ok(row) => Some(row),
            Err(e) => {
                logger.warn(&format!("skipping {}: {}", name, e));
                None
            }
        })
        .collect();

    let mut rows = rows;
    rows.sort_by(|a, b| {
        (&a.category, a.num_states).cmp(&(&b.category, b.num_states))
    });

    let mut csv =
        String::from("Category,Num_States,Exact_Time_s,Gmres_Time_s,Gmres_Precision_Loss\n");
    for row in &rows {
        csv.push_str(&format!(
            "{},{},{:.6},{:.6},{:e}\n",
            row.category, row.num_states, row.exact_time_s, row.gmres_time_s,
            row.gmres_precision_loss
        ));
    }

    let csv_path = Path::new(folder).join("benchmark.csv");
    std::fs::write(&csv_path, csv)
        .with_context(|| format!("failed to write benchmark CSV: {}", csv_path.display()))?;

    logger.info(&format!(
        "wrote {} benchmark rows to {}",
        rows.len(),
        csv_path.display()
    ));

    Ok(())
}

fn solve_both(record: &SpnRecord) -> anyhow::Result<BenchmarkRow> {
    let q = build_generator(&record.graph, &record.rates);
    let (a, y) = constrained_system(&q);

    let start = Instant::now();
    let exact = DirectSolver.solve(&a, &y)?;
    let exact_time_s = start.elapsed().as_secs_f64();

    let start = Instant::now();
    let approx = GmresSolver::default().solve(&a, &y)?;
    let gmres_time_s = start.elapsed().as_secs_f64();

    let gmres_precision_loss = exact
        .iter()
        .zip(approx.iter())
        .map(|(e, g)| (e - g).abs())
        .fold(0.0f64, f64::max);

    Ok(BenchmarkRow {
        category: format!(
            "p{}_t{}",
            record.matrix.place_count(),
            record.matrix.transition_count()
        ),
        num_states: record.state_count(),
        exact_time_s,
        gmres_time_s,
        gmres_precision_loss,
    })
}
