pub mod bins;
pub mod config;
pub mod generator;
pub mod persist;

pub use bins::{BinKey, BinTable, StateBuckets};
pub use config::GeneratorOptions;
pub use generator::DatasetGenerator;
pub use persist::{DatasetSummary, DatasetWriter, StackedBin, load_dataset, write_stacked_bins};
