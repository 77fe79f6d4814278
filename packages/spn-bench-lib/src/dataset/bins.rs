use hashbrown::HashMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::ArgumentError;

/// Half-open state-count buckets derived from sorted boundaries
/// `[b1, ..., bk]`: `(-inf, b1), [b1, b2), ..., [bk, inf)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateBuckets {
    boundaries: Vec<usize>,
}

impl StateBuckets {
    pub fn new(boundaries: Vec<usize>) -> Result<Self, ArgumentError> {
        if boundaries.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ArgumentError::UnsortedStateBins(boundaries));
        }
        Ok(StateBuckets { boundaries })
    }

    pub fn bucket_count(&self) -> usize {
        self.boundaries.len() + 1
    }

    pub fn bucket_of(&self, state_count: usize) -> usize {
        self.boundaries.partition_point(|&b| b <= state_count)
    }

    pub fn label(&self, bucket: usize) -> String {
        let lower = bucket.checked_sub(1).map(|i| self.boundaries[i]);
        let upper = self.boundaries.get(bucket);
        match (lower, upper) {
            (None, None) => "[0,inf)".to_string(),
            (None, Some(u)) => format!("[0,{})", u),
            (Some(l), Some(u)) => format!("[{},{})", l, u),
            (Some(l), None) => format!("[{},inf)", l),
        }
    }
}

/// Identity of one dataset bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BinKey {
    pub places: usize,
    pub transitions: usize,
    pub bucket: usize,
}

impl std::fmt::Display for BinKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p{}_t{}_s{}", self.places, self.transitions, self.bucket)
    }
}

/// Acceptance accounting for the full `(places, transitions, bucket)` grid.
/// Only the generator's coordinator mutates it.
#[derive(Debug, Clone)]
pub struct BinTable {
    per_bin: usize,
    counts: HashMap<BinKey, usize>,
    accepted: usize,
}

impl BinTable {
    pub fn new(
        places: (usize, usize),
        transitions: (usize, usize),
        buckets: &StateBuckets,
        per_bin: usize,
    ) -> Result<Self, ArgumentError> {
        if per_bin == 0 {
            return Err(ArgumentError::ZeroPerBin);
        }
        if places.0 > places.1 || places.0 == 0 {
            return Err(ArgumentError::EmptyRange {
                min: places.0,
                max: places.1,
            });
        }
        if transitions.0 > transitions.1 || transitions.0 == 0 {
            return Err(ArgumentError::EmptyRange {
                min: transitions.0,
                max: transitions.1,
            });
        }

        let mut counts = HashMap::new();
        for p in places.0..=places.1 {
            for t in transitions.0..=transitions.1 {
                for bucket in 0..buckets.bucket_count() {
                    counts.insert(
                        BinKey {
                            places: p,
                            transitions: t,
                            bucket,
                        },
                        0,
                    );
                }
            }
        }

        Ok(BinTable {
            per_bin,
            counts,
            accepted: 0,
        })
    }

    pub fn bin_count(&self) -> usize {
        self.counts.len()
    }

    pub fn per_bin(&self) -> usize {
        self.per_bin
    }

    pub fn is_full(&self, key: &BinKey) -> bool {
        self.counts.get(key).is_none_or(|&c| c >= self.per_bin)
    }

    /// Accepts one SPN into its bin. Returns false when the bin is already
    /// full or outside the grid.
    pub fn accept(&mut self, key: &BinKey) -> bool {
        match self.counts.get_mut(key) {
            Some(count) if *count < self.per_bin => {
                *count += 1;
                self.accepted += 1;
                true
            }
            _ => false,
        }
    }

    pub fn accepted(&self) -> usize {
        self.accepted
    }

    pub fn filled_bins(&self) -> usize {
        self.counts.values().filter(|&&c| c >= self.per_bin).count()
    }

    pub fn all_full(&self) -> bool {
        self.counts.values().all(|&c| c >= self.per_bin)
    }

    /// Whether any bucket of the `(places, transitions)` cell still has
    /// room.
    pub fn any_unfilled_for(&self, places: usize, transitions: usize) -> bool {
        self.counts.iter().any(|(k, &c)| {
            k.places == places && k.transitions == transitions && c < self.per_bin
        })
    }

    pub fn unfilled(&self) -> Vec<BinKey> {
        self.counts
            .iter()
            .filter(|&(_, &c)| c < self.per_bin)
            .map(|(k, _)| *k)
            .sorted()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_edges_are_half_open() {
        let buckets = StateBuckets::new(vec![16, 64]).unwrap();

        assert_eq!(buckets.bucket_count(), 3);
        assert_eq!(buckets.bucket_of(0), 0);
        assert_eq!(buckets.bucket_of(15), 0);
        assert_eq!(buckets.bucket_of(16), 1);
        assert_eq!(buckets.bucket_of(63), 1);
        assert_eq!(buckets.bucket_of(64), 2);
        assert_eq!(buckets.bucket_of(10_000), 2);
    }

    #[test]
    fn no_boundaries_means_one_bucket() {
        let buckets = StateBuckets::new(vec![]).unwrap();

        assert_eq!(buckets.bucket_count(), 1);
        assert_eq!(buckets.bucket_of(123), 0);
        assert_eq!(buckets.label(0), "[0,inf)");
    }

    #[test]
    fn rejects_unsorted_boundaries() {
        assert!(StateBuckets::new(vec![10, 10]).is_err());
        assert!(StateBuckets::new(vec![64, 16]).is_err());
    }

    #[test]
    fn labels() {
        let buckets = StateBuckets::new(vec![16, 64]).unwrap();

        assert_eq!(buckets.label(0), "[0,16)");
        assert_eq!(buckets.label(1), "[16,64)");
        assert_eq!(buckets.label(2), "[64,inf)");
    }

    #[test]
    fn accounting() {
        let buckets = StateBuckets::new(vec![10]).unwrap();
        let mut bins = BinTable::new((2, 3), (2, 2), &buckets, 2).unwrap();

        // 2 place values x 1 transition value x 2 buckets
        assert_eq!(bins.bin_count(), 4);
        assert!(!bins.all_full());

        let key = BinKey {
            places: 2,
            transitions: 2,
            bucket: 0,
        };
        assert!(bins.accept(&key));
        assert!(bins.accept(&key));
        assert!(!bins.accept(&key));
        assert!(bins.is_full(&key));
        assert_eq!(bins.accepted(), 2);
        assert_eq!(bins.filled_bins(), 1);
        assert_eq!(bins.unfilled().len(), 3);
    }

    #[test]
    fn out_of_grid_keys_are_rejected() {
        let buckets = StateBuckets::new(vec![]).unwrap();
        let mut bins = BinTable::new((2, 2), (2, 2), &buckets, 1).unwrap();

        let outside = BinKey {
            places: 9,
            transitions: 9,
            bucket: 0,
        };
        assert!(bins.is_full(&outside));
        assert!(!bins.accept(&outside));
    }
}
