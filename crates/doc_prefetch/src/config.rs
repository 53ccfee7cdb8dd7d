//! Configuration for the prefetch pipeline.
//!
//! `PipelineConfig` stores the parameters that control batch assembly and
//! source selection.
//!
//! Example:
//! ```ignore
//! let config = PipelineConfig::builder()
//!     .batch_size(32)
//!     .label_names(["country", "decade"])
//!     .weights_by_size(true)
//!     .seed(42)
//!     .build();
//! ```

/// Configuration for batch assembly and source selection.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of records per assembled batch.
    pub batch_size: usize,
    /// Metadata fields emitted as label tensors, in output order.
    pub label_names: Vec<String>,
    /// Value emitted for a label the record does not carry.
    pub missing_value: f32,
    /// Explicit per-source selection weights. Sources beyond the end of the
    /// list get weight 1.0.
    pub weights: Vec<f32>,
    /// Weight sources by entry count instead of `weights`.
    pub weights_by_size: bool,
    /// On startup, skip a random number of records in `[0, rand_skip)` at
    /// the head of every source. 0 disables the skip.
    pub rand_skip: u32,
    /// After each consumed record, advance by `1 + uniform(0..=rand_advance_skip)`
    /// records instead of 1. 0 disables the extra skip.
    pub rand_advance_skip: u32,
    /// Truncate the batch instead of wrapping when a source is exhausted
    /// mid-batch.
    pub no_wrap: bool,
    /// Drain sources one at a time in the order given. Mutually exclusive
    /// with `enforce_epochs`.
    pub in_order: bool,
    /// Restrict the weighted source draw to the sources with the fewest
    /// completed epochs. Mutually exclusive with `in_order`.
    pub enforce_epochs: bool,
    /// Decode every image as 3-channel color regardless of its declared
    /// channel count.
    pub force_color: bool,
    /// Seed for all randomness (source selection, skips, transform
    /// parameters). None seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 1,
            label_names: Vec::new(),
            missing_value: -1.0,
            weights: Vec::new(),
            weights_by_size: false,
            rand_skip: 0,
            rand_advance_skip: 0,
            no_wrap: false,
            in_order: false,
            enforce_epochs: false,
            force_color: false,
            seed: None,
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }
}

/// Builder for PipelineConfig with method chaining.
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Set the number of records per batch (must be > 0).
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    /// Set the metadata fields emitted as label tensors.
    pub fn label_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.label_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the value emitted for labels a record does not carry.
    pub fn missing_value(mut self, value: f32) -> Self {
        self.config.missing_value = value;
        self
    }

    /// Set explicit per-source selection weights.
    pub fn weights(mut self, weights: Vec<f32>) -> Self {
        self.config.weights = weights;
        self
    }

    /// Weight sources by their entry counts instead of explicit weights.
    pub fn weights_by_size(mut self, by_size: bool) -> Self {
        self.config.weights_by_size = by_size;
        self
    }

    /// Set the random head skip applied to every source on startup.
    pub fn rand_skip(mut self, skip: u32) -> Self {
        self.config.rand_skip = skip;
        self
    }

    /// Set the random extra advance applied after each consumed record.
    pub fn rand_advance_skip(mut self, skip: u32) -> Self {
        self.config.rand_advance_skip = skip;
        self
    }

    /// Truncate batches at source wrap instead of continuing from the start.
    pub fn no_wrap(mut self, no_wrap: bool) -> Self {
        self.config.no_wrap = no_wrap;
        self
    }

    /// Drain sources in the order they were given.
    pub fn in_order(mut self, in_order: bool) -> Self {
        self.config.in_order = in_order;
        self
    }

    /// Keep every source within one epoch of the others.
    pub fn enforce_epochs(mut self, enforce: bool) -> Self {
        self.config.enforce_epochs = enforce;
        self
    }

    /// Decode every image as 3-channel color.
    pub fn force_color(mut self, force: bool) -> Self {
        self.config.force_color = force;
        self
    }

    /// Set the seed for all randomness in the pipeline.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_fills_every_field() {
        let config = PipelineConfig::builder()
            .batch_size(16)
            .label_names(["country", "decade"])
            .missing_value(-99.0)
            .weights(vec![1.0, 2.0])
            .weights_by_size(true)
            .rand_skip(10)
            .rand_advance_skip(3)
            .no_wrap(true)
            .in_order(true)
            .force_color(true)
            .seed(7)
            .build();

        assert_eq!(config.batch_size, 16);
        assert_eq!(config.label_names, vec!["country", "decade"]);
        assert_eq!(config.missing_value, -99.0);
        assert_eq!(config.weights, vec![1.0, 2.0]);
        assert!(config.weights_by_size);
        assert_eq!(config.rand_skip, 10);
        assert_eq!(config.rand_advance_skip, 3);
        assert!(config.no_wrap);
        assert!(config.in_order);
        assert!(!config.enforce_epochs);
        assert!(config.force_color);
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn defaults_are_single_record_batches() {
        let config = PipelineConfig::default();
        assert_eq!(config.batch_size, 1);
        assert!(config.label_names.is_empty());
        assert_eq!(config.missing_value, -1.0);
        assert!(!config.no_wrap);
        assert_eq!(config.seed, None);
    }
}
