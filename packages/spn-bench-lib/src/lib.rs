pub mod analysis;
pub mod ctmc;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod hash;
pub mod logger;
pub mod marking;
pub mod reachability;
pub mod spn;
pub mod threading;

use std::path::Path;

use rand::Rng;

pub use crate::{
    dataset::{DatasetGenerator, DatasetSummary, GeneratorOptions},
    filter::{CandidateOutcome, FilterOptions, filter_spn},
    reachability::{ExploreLimits, ReachabilityGraph, get_reachability_graph},
    spn::{FiringRates, SpnMatrix},
};

/// Generates `count` random connected SPNs with rates.
///
/// With `shared_structure`, all outputs share one spanning-tree skeleton and
/// differ only in densification, marking and rates.
pub fn spn_generate_random<R: Rng>(
    places: usize,
    transitions: usize,
    connection_prob: f64,
    max_rate: u32,
    count: usize,
    shared_structure: bool,
    rng: &mut R,
) -> Result<Vec<(SpnMatrix, FiringRates)>, error::ArgumentError> {
    let params = spn::synthesis::SynthesisParams::new(places, transitions)
        .with_connection_prob(connection_prob)
        .with_max_rate(max_rate);
    spn::synthesis::synthesize_many(&params, count, shared_structure, rng)
}

/// Runs the binning generator and writes the dataset to `out_dir`.
pub fn generate_dataset<P: AsRef<Path>>(
    options: GeneratorOptions,
    out_dir: P,
    logger: Option<&logger::Logger>,
) -> anyhow::Result<DatasetSummary> {
    let generator = DatasetGenerator::new(options)?;
    match logger {
        Some(l) => generator.with_logger(l).run(out_dir),
        None => generator.run(out_dir),
    }
}
