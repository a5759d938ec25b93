use crate::error::{Result, TradegateError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum samples required per requested split.
const MIN_SAMPLES_PER_SPLIT: usize = 50;

/// One train/test partition. Test positions are contiguous; train positions
/// are the purged past plus the embargoed future.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldSplit {
    pub fold_num: usize,
    pub train: Vec<usize>,
    pub test: Vec<usize>,
    pub test_start: DateTime<Utc>,
    pub test_end: DateTime<Utc>,
}

/// Splits a time-ordered index into train/test folds.
pub trait DataSplitter: Send + Sync {
    /// `index` holds each sample's entry time, `end_times` the time its
    /// outcome resolves. Both must share one domain, in order.
    fn split(
        &self,
        index: &[DateTime<Utc>],
        end_times: &[DateTime<Utc>],
    ) -> Result<Vec<FoldSplit>>;

    fn n_splits(&self) -> usize;
}

/// K-fold cross-validation for financial time series.
///
/// Keeps folds in temporal order (no shuffling) and removes two leakage
/// paths around each test window: training samples whose outcome resolves
/// inside the test period (purge) and training samples that start too soon
/// after it (embargo), which would leak through serial correlation.
pub struct PurgedKFold {
    n_splits: usize,
    purge_days: usize,
}

impl PurgedKFold {
    pub fn new(n_splits: usize, purge_days: usize) -> Self {
        Self {
            n_splits,
            purge_days,
        }
    }

    /// Contiguous test chunks, as equal as possible: the first
    /// `len % n_splits` chunks take one extra sample.
    fn test_chunks(&self, len: usize) -> Vec<(usize, usize)> {
        let base = len / self.n_splits;
        let remainder = len % self.n_splits;

        let mut chunks = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for fold in 0..self.n_splits {
            let size = if fold < remainder { base + 1 } else { base };
            chunks.push((start, start + size));
            start += size;
        }
        chunks
    }
}

impl DataSplitter for PurgedKFold {
    fn split(
        &self,
        index: &[DateTime<Utc>],
        end_times: &[DateTime<Utc>],
    ) -> Result<Vec<FoldSplit>> {
        if self.n_splits < 2 {
            return Err(TradegateError::Configuration(
                "Cross-validation requires at least 2 splits".to_string(),
            ));
        }
        if index.len() != end_times.len() {
            return Err(TradegateError::IndexMismatch(format!(
                "Index has {} samples but end times has {}",
                index.len(),
                end_times.len()
            )));
        }

        let len = index.len();
        let required = self.n_splits * MIN_SAMPLES_PER_SPLIT;
        if len < required {
            return Err(TradegateError::InsufficientData(format!(
                "{} splits need at least {} samples, got {}",
                self.n_splits, required, len
            )));
        }

        let mut folds = Vec::with_capacity(self.n_splits);

        for (fold_num, (chunk_start, chunk_end)) in self.test_chunks(len).into_iter().enumerate() {
            let test: Vec<usize> = (chunk_start..chunk_end).collect();

            let test_start = index[chunk_start];
            let test_end = end_times[chunk_start..chunk_end]
                .iter()
                .copied()
                .max()
                .unwrap_or(test_start);

            // Purge: the past side keeps positions up to the last sample
            // whose outcome resolves no later than the test start.
            let purge_cutoff = end_times
                .iter()
                .rposition(|&t1| t1 <= test_start);

            // Embargo: the future side resumes at the first sample whose
            // outcome resolves after the test window, shifted forward by
            // `purge_days` more positions.
            let embargo_start = end_times
                .iter()
                .position(|&t1| t1 > test_end)
                .unwrap_or(len)
                .saturating_add(self.purge_days)
                .min(len);

            let mut train: Vec<usize> = Vec::new();
            if let Some(cutoff) = purge_cutoff {
                train.extend(0..=cutoff);
            }
            train.extend(embargo_start..len);

            folds.push(FoldSplit {
                fold_num,
                train,
                test,
                test_start,
                test_end,
            });
        }

        Ok(folds)
    }

    fn n_splits(&self) -> usize {
        self.n_splits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn daily_timestamps(n: usize) -> Vec<DateTime<Utc>> {
        (0..n)
            .map(|i| {
                Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap() + chrono::Days::new(i as u64)
            })
            .collect()
    }

    /// Each event resolves `horizon` days after entry.
    fn end_times_with_horizon(index: &[DateTime<Utc>], horizon: u64) -> Vec<DateTime<Utc>> {
        index
            .iter()
            .map(|&t0| t0 + chrono::Duration::days(horizon as i64))
            .collect()
    }

    #[test]
    fn mismatched_domains_are_rejected() {
        let index = daily_timestamps(300);
        let end_times = end_times_with_horizon(&index[..299], 5);
        let splitter = PurgedKFold::new(5, 5);
        assert!(matches!(
            splitter.split(&index, &end_times),
            Err(TradegateError::IndexMismatch(_))
        ));
    }

    #[test]
    fn insufficient_data_boundary_is_exact() {
        let splitter = PurgedKFold::new(5, 5);

        let short = daily_timestamps(249);
        let short_t1 = end_times_with_horizon(&short, 5);
        assert!(matches!(
            splitter.split(&short, &short_t1),
            Err(TradegateError::InsufficientData(_))
        ));

        let enough = daily_timestamps(250);
        let enough_t1 = end_times_with_horizon(&enough, 5);
        assert!(splitter.split(&enough, &enough_t1).is_ok());
    }

    #[test]
    fn test_folds_partition_the_index() {
        let index = daily_timestamps(303);
        let end_times = end_times_with_horizon(&index, 5);
        let splitter = PurgedKFold::new(5, 5);

        let folds = splitter.split(&index, &end_times).unwrap();
        assert_eq!(folds.len(), 5);
        assert_eq!(splitter.n_splits(), 5);

        let mut covered = vec![false; index.len()];
        for fold in &folds {
            for &pos in &fold.test {
                assert!(!covered[pos], "position {} tested twice", pos);
                covered[pos] = true;
            }
        }
        assert!(covered.iter().all(|&c| c));

        // 303 = 5 * 60 + 3: first three chunks take the extra sample.
        let sizes: Vec<usize> = folds.iter().map(|f| f.test.len()).collect();
        assert_eq!(sizes, vec![61, 61, 61, 60, 60]);
    }

    #[test]
    fn purge_and_embargo_hold_for_every_fold() {
        let index = daily_timestamps(300);
        let end_times = end_times_with_horizon(&index, 5);
        let purge_days = 5;
        let splitter = PurgedKFold::new(5, purge_days);

        for fold in splitter.split(&index, &end_times).unwrap() {
            let test_set: std::collections::HashSet<usize> = fold.test.iter().copied().collect();

            for &pos in &fold.train {
                assert!(!test_set.contains(&pos), "train/test overlap at {}", pos);

                let resolves_before_test = end_times[pos] <= fold.test_start;
                let starts_after_embargo = index[pos] > fold.test_end;
                assert!(
                    resolves_before_test || starts_after_embargo,
                    "fold {}: train sample {} overlaps the test window",
                    fold.fold_num,
                    pos
                );
            }

            // The embargo removes `purge_days` additional positions after
            // the first future-side candidate.
            if let Some(&first_future) = fold
                .train
                .iter()
                .find(|&&pos| index[pos] > fold.test_end)
            {
                let first_candidate = end_times
                    .iter()
                    .position(|&t1| t1 > fold.test_end)
                    .unwrap();
                assert!(first_future >= first_candidate + purge_days);
            }
        }
    }
}
