use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{dataset::bins::BinKey, filter::SpnRecord};

/// One row of `metadata.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRow {
    pub filename: String,
    pub places: usize,
    pub transitions: usize,
    pub states: usize,
}

/// Closing record of a generation run, written as `summary.json` next to
/// the dataset so generated benchmark sets are self-describing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub accepted: usize,
    pub attempts: u64,
    pub bin_count: usize,
    pub per_bin: usize,
    pub unfilled_bins: Vec<String>,
    pub wall_seconds: f64,
    pub master_seed: u64,
}

/// Writes accepted SPNs as one pretty-printed JSON file each, plus
/// `metadata.csv` and `summary.json` at the end of the run.
#[derive(Debug)]
pub struct DatasetWriter {
    out_dir: PathBuf,
    rows: Vec<MetadataRow>,
}

impl DatasetWriter {
    pub fn create<P: AsRef<Path>>(out_dir: P) -> anyhow::Result<Self> {
        let out_dir = out_dir.as_ref().to_path_buf();
        fs::create_dir_all(&out_dir)
            .with_context(|| format!("failed to create output dir: {}", out_dir.display()))?;

        Ok(DatasetWriter {
            out_dir,
            rows: vec![],
        })
    }

    pub fn written(&self) -> usize {
        self.rows.len()
    }

    /// Persists one record, named by acceptance index and bin.
    pub fn write_record(&mut self, record: &SpnRecord, bin: &BinKey) -> anyhow::Result<String> {
        let filename = format!("spn_{:05}_{}.json", self.rows.len(), bin);
        let path = self.out_dir.join(&filename);

        fs::write(&path, record.to_json()?)
            .with_context(|| format!("failed to write SPN file: {}", path.display()))?;

        self.rows.push(MetadataRow {
            filename: filename.clone(),
            places: record.matrix.place_count(),
            transitions: record.matrix.transition_count(),
            states: record.state_count(),
        });

        Ok(filename)
    }

    /// Writes `metadata.csv` and `summary.json`.
    pub fn finish(&self, summary: &DatasetSummary) -> anyhow::Result<()> {
        let mut csv = String::from("filename,places,transitions,states\n");
        for row in &self.rows {
            csv.push_str(&format!(
                "{},{},{},{}\n",
                row.filename, row.places, row.transitions, row.states
            ));
        }

        let csv_path = self.out_dir.join("metadata.csv");
        fs::write(&csv_path, csv)
            .with_context(|| format!("failed to write metadata: {}", csv_path.display()))?;

        let summary_path = self.out_dir.join("summary.json");
        fs::write(&summary_path, serde_json::to_string_pretty(summary)?)
            .with_context(|| format!("failed to write summary: {}", summary_path.display()))?;

        Ok(())
    }
}

/// Alternative per-bin layout: everything of one bin in a single file, with
/// the fixed-shape parts (matrices, rates, mean token vectors) stacked for
/// array-oriented consumers and the full records kept alongside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackedBin {
    pub bin: BinKey,
    pub petri_nets: Vec<crate::spn::SpnMatrix>,
    pub lambdas: Vec<crate::spn::FiringRates>,
    pub mus: Vec<ndarray::Array1<f64>>,
    pub spns: Vec<SpnRecord>,
}

/// Regroups a flat dataset into one `bin_<key>.json` per bin under
/// `<dir>/stacked/`. Returns the number of bin files written.
pub fn write_stacked_bins<P: AsRef<Path>>(
    dir: P,
    records: &[(String, SpnRecord)],
) -> anyhow::Result<usize> {
    let stacked_dir = dir.as_ref().join("stacked");
    fs::create_dir_all(&stacked_dir)
        .with_context(|| format!("failed to create dir: {}", stacked_dir.display()))?;

    let mut by_bin: Vec<(BinKey, StackedBin)> = vec![];
    for (name, record) in records {
        let key = bin_key_from_filename(name)
            .with_context(|| format!("file name carries no bin key: {}", name))?;

        let index = match by_bin.iter().position(|(k, _)| *k == key) {
            Some(index) => index,
            None => {
                by_bin.push((
                    key,
                    StackedBin {
                        bin: key,
                        petri_nets: vec![],
                        lambdas: vec![],
                        mus: vec![],
                        spns: vec![],
                    },
                ));
                by_bin.len() - 1
            }
        };
        let bin = &mut by_bin[index].1;

        bin.petri_nets.push(record.matrix.clone());
        bin.lambdas.push(record.rates.clone());
        bin.mus.push(record.analysis.mean_tokens.clone());
        bin.spns.push(record.clone());
    }

    for (key, bin) in &by_bin {
        let path = stacked_dir.join(format!("bin_{}.json", key));
        fs::write(&path, serde_json::to_string_pretty(bin)?)
            .with_context(|| format!("failed to write bin file: {}", path.display()))?;
    }

    Ok(by_bin.len())
}

/// Extracts the bin key from a dataset file name like
/// `spn_00003_p2_t4_s1.json`.
fn bin_key_from_filename(name: &str) -> Option<BinKey> {
    let stem = name.strip_suffix(".json")?;
    let mut parts = stem.split('_').skip(2);
    let places = parts.next()?.strip_prefix('p')?.parse().ok()?;
    let transitions = parts.next()?.strip_prefix('t')?.parse().ok()?;
    let bucket = parts.next()?.strip_prefix('s')?.parse().ok()?;
    Some(BinKey {
        places,
        transitions,
        bucket,
    })
}

/// Loads every `spn_*.json` record in a dataset directory, sorted by file
/// name.
pub fn load_dataset<P: AsRef<Path>>(dir: P) -> anyhow::Result<Vec<(String, SpnRecord)>> {
    let dir = dir.as_ref();
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("failed to read dataset dir: {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension().is_some_and(|ext| ext == "json")
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("spn_"))
        })
        .collect();
    files.sort();

    let mut records = vec![];
    for path in files {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read SPN file: {}", path.display()))?;
        let record = SpnRecord::from_json(&content)
            .with_context(|| format!("failed to parse SPN file: {}", path.display()))?;
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        records.push((name, record));
    }

    Ok(records)
}
