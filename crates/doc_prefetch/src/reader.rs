//! Reading records from several stores at once.
//!
//! A [`MultiSourceReader`] holds one cursor per store plus a per-store epoch
//! counter (number of completed passes). After each consumed record the
//! caller advances the current cursor and then asks the reader to pick the
//! store the next record comes from, under one of three policies.

use crate::random::RandomSource;
use crate::store::{RecordCursor, RecordStore};
use anyhow::{ensure, Result};
use tracing::{debug, info};

/// How the next source is chosen after each consumed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
    /// Draw a source from the normalized weights every time.
    #[default]
    Weighted,
    /// Drain sources one at a time, in the order they were given.
    InOrder,
    /// Draw from the weights, restricted to the sources with the fewest
    /// completed epochs, so no source runs ahead of the rest.
    EnforceEpochs,
}

/// Settings applied when opening a [`MultiSourceReader`].
#[derive(Debug, Clone, Default)]
pub struct ReaderOptions {
    pub policy: SelectionPolicy,
    /// Explicit per-source weights. Sources beyond the end of this list get
    /// weight 1.0.
    pub weights: Vec<f32>,
    /// Weight each source by its entry count instead of `weights`. Falls
    /// back to `weights` for stores that cannot report a count.
    pub weights_by_size: bool,
    /// On open, skip a uniformly random number of records in `[0, rand_skip)`
    /// at the head of every source. 0 disables skipping.
    pub rand_skip: u32,
}

struct Source {
    cursor: Box<dyn RecordCursor>,
    epoch: u64,
}

/// A set of record stores read through one cursor each, with weighted,
/// in-order, or epoch-balanced source selection.
pub struct MultiSourceReader {
    sources: Vec<Source>,
    probs: Vec<f32>,
    policy: SelectionPolicy,
    current: usize,
}

impl MultiSourceReader {
    /// Opens a cursor on every store and computes the normalized selection
    /// probabilities. Applies the configured random head skip per source.
    pub fn open(
        stores: &[Box<dyn RecordStore>],
        options: &ReaderOptions,
        rng: &mut RandomSource,
    ) -> Result<Self> {
        ensure!(!stores.is_empty(), "no record sources specified");
        for (i, &w) in options.weights.iter().enumerate() {
            ensure!(w >= 0.0, "source {} has negative weight {}", i, w);
        }

        let mut sources = Vec::with_capacity(stores.len());
        let mut probs = Vec::with_capacity(stores.len());
        for (i, store) in stores.iter().enumerate() {
            let mut source = Source {
                cursor: store.new_cursor()?,
                epoch: 0,
            };
            source.cursor.seek_to_first();
            ensure!(source.cursor.valid(), "source {} is empty", i);

            if options.rand_skip > 0 {
                let skip = rng.next_int(options.rand_skip)?;
                debug!(source = i, skip, "skipping records at the head");
                for _ in 0..skip {
                    advance(&mut source);
                }
            }

            let entry_count = store.entry_count();
            let weight = if options.weights_by_size && entry_count.is_some_and(|n| n > 0) {
                entry_count.unwrap() as f32
            } else if i < options.weights.len() {
                options.weights[i]
            } else {
                1.0
            };
            probs.push(weight);
            sources.push(source);
        }

        let sum: f32 = probs.iter().sum();
        ensure!(sum > 0.0, "source weights sum to zero");
        for p in &mut probs {
            *p /= sum;
        }

        info!(
            sources = sources.len(),
            policy = ?options.policy,
            "opened record sources"
        );
        Ok(Self {
            sources,
            probs,
            policy: options.policy,
            current: 0,
        })
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// The index of the source the next record is read from.
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Completed passes over source `index`.
    pub fn epoch(&self, index: usize) -> u64 {
        self.sources[index].epoch
    }

    /// The normalized selection probabilities, in source order.
    pub fn probabilities(&self) -> &[f32] {
        &self.probs
    }

    /// The raw bytes of the record under the current cursor.
    pub fn current_value(&self) -> Result<Vec<u8>> {
        self.sources[self.current].cursor.value()
    }

    /// Steps the current cursor forward one record. Returns `true` if the
    /// cursor wrapped back to the start of its source, which also bumps the
    /// source's epoch counter.
    pub fn advance_current(&mut self) -> bool {
        let wrapped = advance(&mut self.sources[self.current]);
        if wrapped {
            debug!(
                source = self.current,
                epoch = self.sources[self.current].epoch,
                "source wrapped to its first record"
            );
        }
        wrapped
    }

    /// Picks the source the next record comes from, per the configured
    /// policy.
    pub fn select_next(&mut self, rng: &mut RandomSource) -> Result<()> {
        match self.policy {
            SelectionPolicy::InOrder => self.next_in_order(),
            SelectionPolicy::EnforceEpochs => self.next_least_epochs(rng)?,
            SelectionPolicy::Weighted => {
                let u = rng.next_float(0.0, 1.0)?;
                self.current = categorical_index(&self.probs, u);
            }
        }
        Ok(())
    }

    /// In-order progression: move to the next source only once the current
    /// one has completed a full epoch beyond it; wrap from the last source
    /// back to the first only once the last has caught up with its
    /// predecessor.
    fn next_in_order(&mut self) {
        let last = self.sources.len() - 1;
        if last == 0 {
            self.current = 0;
        } else if self.current == last {
            if self.sources[last].epoch == self.sources[last - 1].epoch {
                self.current = 0;
            }
        } else if self.sources[self.current].epoch > self.sources[self.current + 1].epoch {
            self.current += 1;
        }
    }

    /// Restricts the weighted draw to the sources with the fewest completed
    /// epochs, renormalizing their probabilities.
    fn next_least_epochs(&mut self, rng: &mut RandomSource) -> Result<()> {
        let min_epoch = self
            .sources
            .iter()
            .map(|s| s.epoch)
            .min()
            .unwrap_or_default();

        let mut eligible = Vec::new();
        let mut eligible_probs = Vec::new();
        for (i, source) in self.sources.iter().enumerate() {
            if source.epoch == min_epoch {
                eligible.push(i);
                eligible_probs.push(self.probs[i]);
            }
        }

        let sum: f32 = eligible_probs.iter().sum();
        ensure!(
            sum > 0.0,
            "all sources at the minimum epoch have zero weight"
        );
        for p in &mut eligible_probs {
            *p /= sum;
        }

        let u = rng.next_float(0.0, 1.0)?;
        self.current = eligible[categorical_index(&eligible_probs, u)];
        Ok(())
    }
}

fn advance(source: &mut Source) -> bool {
    source.cursor.next();
    if !source.cursor.valid() {
        source.epoch += 1;
        source.cursor.seek_to_first();
        true
    } else {
        false
    }
}

/// Maps a uniform draw `u` in `[0, 1]` to an index under `probs` by scanning
/// the cumulative sums. A draw past the final cumulative sum (possible when
/// the probabilities sum to slightly under 1) falls into the last bucket.
pub(crate) fn categorical_index(probs: &[f32], u: f32) -> usize {
    let mut cum_prob = 0.0;
    for (i, p) in probs.iter().enumerate() {
        cum_prob += p;
        if cum_prob >= u {
            return i;
        }
    }
    probs.len() - 1
}
