use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Instant,
};

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    dataset::{
        bins::{BinKey, BinTable, StateBuckets},
        config::GeneratorOptions,
        persist::{DatasetSummary, DatasetWriter},
    },
    error::ArgumentError,
    filter::{CandidateOutcome, FilterOptions, filter_spn},
    logger::{LogLevel, Logger},
    spn::{
        repair::{add_edges_to_isolated_nodes, has_no_isolated_nodes},
        synthesis::{SynthesisParams, synthesize_many},
    },
    threading::thread_pool::ThreadPool,
};

// seed streams, so synthesis and repair never share an RNG sequence
const STREAM_SYNTHESIS: u64 = 0;
const STREAM_REPAIR: u64 = 1;

/// Deterministic per-candidate seed. Results only depend on the master seed
/// and the candidate's position in the run, never on worker scheduling.
fn derive_seed(master: u64, batch: u64, slot: u64, stream: u64) -> u64 {
    let mut z = master
        .wrapping_add(batch.wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .wrapping_add(slot.wrapping_mul(0xBF58_476D_1CE4_E5B9))
        .wrapping_add(stream.wrapping_mul(0x94D0_49BB_1331_11EB));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

struct CandidateResult {
    slot: usize,
    /// None when the job was skipped because of cancellation.
    outcome: Option<CandidateOutcome>,
}

/// Fills the `(places, transitions, state bucket)` bin grid with valid SPNs.
///
/// Each batch synthesizes candidates on the coordinator (cheap and
/// deterministic), then runs repair, exploration and solving on the worker
/// pool. The coordinator alone touches the bin table and the writer;
/// results are re-ordered by batch slot before acceptance so runs with the
/// same master seed and batch size produce the same dataset for any worker
/// count.
pub struct DatasetGenerator<'l> {
    options: GeneratorOptions,
    logger: Option<&'l Logger>,
    cancel: Arc<AtomicBool>,
}

impl<'l> DatasetGenerator<'l> {
    pub fn new(options: GeneratorOptions) -> Result<Self, ArgumentError> {
        options.validate()?;
        Ok(DatasetGenerator {
            options,
            logger: None,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn with_logger(mut self, logger: &'l Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Setting the returned flag stops the run between batches; the batch
    /// in flight still completes.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn run<P: AsRef<Path>>(&self, out_dir: P) -> anyhow::Result<DatasetSummary> {
        let start = Instant::now();
        let options = &self.options;

        let buckets = StateBuckets::new(options.state_bins.clone())?;
        let mut bins = BinTable::new(
            (options.min_places, options.max_places),
            (options.min_transitions, options.max_transitions),
            &buckets,
            options.per_bin,
        )?;
        let mut writer = DatasetWriter::create(out_dir)?;

        let worker_count = options.resolved_worker_count();
        let batch_size = options.resolved_mini_batch_size();
        let pool: ThreadPool<CandidateResult> = ThreadPool::new(worker_count);

        let filter_options = FilterOptions::default()
            .with_place_limit(options.place_limit)
            .with_marks_upper_limit(options.mark_limit)
            .with_solver(options.solver);

        if let Some(l) = self.logger {
            l.object("Dataset run")
                .add_field("bins", bins.bin_count().to_string())
                .add_field("per bin", options.per_bin.to_string())
                .add_field("workers", worker_count.to_string())
                .add_field("batch size", batch_size.to_string())
                .add_field("master seed", options.master_seed.to_string())
                .log(LogLevel::Info);
        }

        let mut master_rng = StdRng::seed_from_u64(options.master_seed);
        let mut attempts: u64 = 0;
        let mut batch_index: u64 = 0;
        let mut cancelled = false;

        while !bins.all_full() {
            if self.cancel.load(Ordering::Relaxed) {
                cancelled = true;
                break;
            }
            if let Some(cap) = options.max_attempts
                && attempts >= cap
            {
                break;
            }

            // draw a structure size that can still contribute
            let (places, transitions) = loop {
                let p = master_rng.gen_range(options.min_places..=options.max_places);
                let t = master_rng.gen_range(options.min_transitions..=options.max_transitions);
                if bins.any_unfilled_for(p, t) {
                    break (p, t);
                }
            };

            let params = SynthesisParams {
                places,
                transitions,
                connection_prob: options.connection_prob,
                max_rate: options.max_rate,
            };
            let mut synth_rng = StdRng::seed_from_u64(derive_seed(
                options.master_seed,
                batch_index,
                0,
                STREAM_SYNTHESIS,
            ));
            let candidates =
                synthesize_many(&params, batch_size, options.shared_structure, &mut synth_rng)?;

            for (slot, (matrix, rates)) in candidates.into_iter().enumerate() {
                let repair_seed = derive_seed(
                    options.master_seed,
                    batch_index,
                    slot as u64,
                    STREAM_REPAIR,
                );
                let cancel = Arc::clone(&self.cancel);

                pool.schedule(move || {
                    if cancel.load(Ordering::Relaxed) {
                        return CandidateResult {
                            slot,
                            outcome: None,
                        };
                    }

                    let mut matrix = matrix;
                    if !has_no_isolated_nodes(&matrix) {
                        let mut rng = StdRng::seed_from_u64(repair_seed);
                        add_edges_to_isolated_nodes(&mut matrix, &mut rng);
                    }

                    CandidateResult {
                        slot,
                        outcome: Some(filter_spn(&matrix, Some(&rates), &filter_options)),
                    }
                });
            }

            pool.wait_for_idle();
            let mut results = pool.take_finished();
            results.sort_by_key(|r| r.slot);

            for result in results {
                attempts += 1;
                let Some(outcome) = result.outcome else {
                    continue;
                };
                let CandidateOutcome::Valid(record) = outcome else {
                    continue;
                };

                let key = BinKey {
                    places,
                    transitions,
                    bucket: buckets.bucket_of(record.state_count()),
                };
                if bins.accept(&key) {
                    writer.write_record(&record, &key)?;
                }
            }

            batch_index += 1;
            if let Some(l) = self.logger
                && batch_index % 25 == 0
            {
                l.object("Progress")
                    .add_field(
                        "filled bins",
                        format!("{}/{}", bins.filled_bins(), bins.bin_count()),
                    )
                    .add_field("accepted", bins.accepted().to_string())
                    .add_field("attempts", attempts.to_string())
                    .log(LogLevel::Info);
            }
        }

        let unfilled = bins.unfilled();
        if let Some(l) = self.logger {
            if cancelled {
                l.warn("generation cancelled, returning partial dataset");
            }
            for key in &unfilled {
                l.warn(&format!(
                    "bin {} (states {}) not filled",
                    key,
                    buckets.label(key.bucket)
                ));
            }
        }

        let summary = DatasetSummary {
            accepted: bins.accepted(),
            attempts,
            bin_count: bins.bin_count(),
            per_bin: options.per_bin,
            unfilled_bins: unfilled.iter().map(|k| k.to_string()).collect(),
            wall_seconds: start.elapsed().as_secs_f64(),
            master_seed: options.master_seed,
        };
        writer.finish(&summary)?;

        if let Some(l) = self.logger {
            l.object("Dataset finished")
                .add_field("accepted", summary.accepted.to_string())
                .add_field("attempts", summary.attempts.to_string())
                .add_field("unfilled bins", summary.unfilled_bins.len().to_string())
                .add_field("seconds", format!("{:.1}", summary.wall_seconds))
                .log(LogLevel::Info);
        }

        Ok(summary)
    }
}
