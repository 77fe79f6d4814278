use std::{fs, path::PathBuf};

use spn_bench_lib::{
    DatasetGenerator, GeneratorOptions,
    dataset::{StackedBin, StateBuckets, load_dataset, write_stacked_bins},
};

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("spn-bench-{}-{}", std::process::id(), name));
    let _ = fs::remove_dir_all(&dir);
    dir
}

fn small_options() -> GeneratorOptions {
    let mut options = GeneratorOptions::default()
        .with_places(2, 3)
        .with_transitions(2, 2)
        .with_state_bins(vec![4])
        .with_per_bin(2)
        .with_master_seed(1234)
        .with_max_attempts(Some(20_000));
    // pinned batch size keeps candidate seeds identical for any worker count
    options.mini_batch_size = Some(8);
    options
}

#[test]
fn generated_dataset_is_deterministic_across_worker_counts() {
    let dir_a = temp_dir("det-a");
    let dir_b = temp_dir("det-b");

    let summary_a = DatasetGenerator::new(small_options().with_worker_count(1))
        .unwrap()
        .run(&dir_a)
        .unwrap();
    let summary_b = DatasetGenerator::new(small_options().with_worker_count(4))
        .unwrap()
        .run(&dir_b)
        .unwrap();

    assert_eq!(summary_a.accepted, summary_b.accepted);
    assert_eq!(summary_a.attempts, summary_b.attempts);

    let metadata_a = fs::read_to_string(dir_a.join("metadata.csv")).unwrap();
    let metadata_b = fs::read_to_string(dir_b.join("metadata.csv")).unwrap();
    assert_eq!(metadata_a, metadata_b);

    let records_a = load_dataset(&dir_a).unwrap();
    let records_b = load_dataset(&dir_b).unwrap();
    assert_eq!(records_a.len(), records_b.len());
    for ((name_a, record_a), (name_b, record_b)) in records_a.iter().zip(records_b.iter()) {
        assert_eq!(name_a, name_b);
        assert_eq!(record_a, record_b);
    }

    let _ = fs::remove_dir_all(&dir_a);
    let _ = fs::remove_dir_all(&dir_b);
}

#[test]
fn accepted_spns_match_their_claimed_bins() {
    let dir = temp_dir("bins");

    let options = small_options();
    let buckets = StateBuckets::new(options.state_bins.clone()).unwrap();
    DatasetGenerator::new(options.clone())
        .unwrap()
        .run(&dir)
        .unwrap();

    let records = load_dataset(&dir).unwrap();
    assert!(!records.is_empty());

    for (name, record) in &records {
        // file names look like spn_00000_p2_t2_s1.json
        let stem = name.strip_suffix(".json").unwrap();
        let mut parts = stem.split('_').skip(2);
        let places: usize = parts.next().unwrap().strip_prefix('p').unwrap().parse().unwrap();
        let transitions: usize =
            parts.next().unwrap().strip_prefix('t').unwrap().parse().unwrap();
        let bucket: usize = parts.next().unwrap().strip_prefix('s').unwrap().parse().unwrap();

        assert_eq!(record.matrix.place_count(), places);
        assert_eq!(record.matrix.transition_count(), transitions);
        assert_eq!(buckets.bucket_of(record.state_count()), bucket);
        assert!((options.min_places..=options.max_places).contains(&places));
        assert!(
            (options.min_transitions..=options.max_transitions).contains(&transitions)
        );
    }

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn metadata_rows_match_records() {
    let dir = temp_dir("metadata");

    DatasetGenerator::new(small_options()).unwrap().run(&dir).unwrap();

    let metadata = fs::read_to_string(dir.join("metadata.csv")).unwrap();
    let mut lines = metadata.lines();
    assert_eq!(lines.next(), Some("filename,places,transitions,states"));

    let records = load_dataset(&dir).unwrap();
    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), records.len());

    for (row, (name, record)) in rows.iter().zip(records.iter()) {
        let cells: Vec<&str> = row.split(',').collect();
        assert_eq!(cells[0], name);
        assert_eq!(cells[1], record.matrix.place_count().to_string());
        assert_eq!(cells[2], record.matrix.transition_count().to_string());
        assert_eq!(cells[3], record.state_count().to_string());
    }

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn attempt_cap_reports_unfilled_bins() {
    let dir = temp_dir("unfilled");

    // the [400, inf) bucket cannot be filled at all: bounded graphs hold at
    // most mark_limit = 300 states here
    let options = GeneratorOptions::default()
        .with_places(2, 2)
        .with_transitions(2, 2)
        .with_state_bins(vec![400])
        .with_per_bin(1)
        .with_max_attempts(Some(64));
    let mut options = options;
    options.mark_limit = 300;
    options.mini_batch_size = Some(8);

    let summary = DatasetGenerator::new(options).unwrap().run(&dir).unwrap();

    assert!(!summary.unfilled_bins.is_empty());
    assert!(summary.attempts <= 64 + 8);

    // the summary is also persisted
    assert!(dir.join("summary.json").exists());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn stacked_layout_groups_whole_bins() {
    let dir = temp_dir("stacked");

    DatasetGenerator::new(small_options()).unwrap().run(&dir).unwrap();
    let records = load_dataset(&dir).unwrap();
    assert!(!records.is_empty());

    let bin_files = write_stacked_bins(&dir, &records).unwrap();
    assert!(bin_files > 0);

    let mut stacked_total = 0;
    for entry in fs::read_dir(dir.join("stacked")).unwrap() {
        let path = entry.unwrap().path();
        let bin: StackedBin =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(bin.petri_nets.len(), bin.spns.len());
        assert_eq!(bin.lambdas.len(), bin.spns.len());
        assert_eq!(bin.mus.len(), bin.spns.len());
        for record in &bin.spns {
            // stacking only works because a bin fixes the net shape
            assert_eq!(record.matrix.place_count(), bin.bin.places);
            assert_eq!(record.matrix.transition_count(), bin.bin.transitions);
        }
        stacked_total += bin.spns.len();
    }
    assert_eq!(stacked_total, records.len());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn cancellation_stops_the_run_early() {
    let dir = temp_dir("cancel");

    let generator = DatasetGenerator::new(small_options()).unwrap();
    generator
        .cancel_handle()
        .store(true, std::sync::atomic::Ordering::Relaxed);

    let summary = generator.run(&dir).unwrap();

    assert_eq!(summary.accepted, 0);
    assert_eq!(summary.attempts, 0);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn invalid_options_are_rejected_up_front() {
    assert!(DatasetGenerator::new(GeneratorOptions::default().with_places(5, 2)).is_err());
    assert!(DatasetGenerator::new(GeneratorOptions::default().with_per_bin(0)).is_err());
    assert!(
        DatasetGenerator::new(GeneratorOptions::default().with_state_bins(vec![9, 3])).is_err()
    );
}
