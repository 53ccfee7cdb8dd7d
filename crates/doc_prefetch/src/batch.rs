//! Assembling decoded records into batch tensors.

use crate::config::PipelineConfig;
use crate::random::RandomSource;
use crate::reader::{MultiSourceReader, ReaderOptions, SelectionPolicy};
use crate::record::DocumentRecord;
use crate::store::RecordStore;
use crate::transforms::TransformChain;
use anyhow::{ensure, Result};
use tch::{Device, Kind, Tensor};
use tracing::debug;

/// One assembled batch: an image tensor plus one scalar tensor per
/// configured label.
///
/// `images` is `[n, channels, height, width]` float; each label tensor is
/// `[n]` float, in the order the label names were configured. `n` can be
/// smaller than the configured batch size when truncation is enabled.
pub struct Batch {
    images: Tensor,
    labels: Vec<(String, Tensor)>,
}

impl Batch {
    /// Number of records in this batch.
    pub fn batch_size(&self) -> usize {
        self.images.size()[0] as usize
    }

    /// The `[n, c, h, w]` image tensor.
    pub fn images(&self) -> &Tensor {
        &self.images
    }

    /// The `[n]` tensor for a configured label, if present.
    pub fn label(&self, name: &str) -> Option<&Tensor> {
        self.labels
            .iter()
            .find(|(label, _)| label == name)
            .map(|(_, tensor)| tensor)
    }

    /// The configured label names, in output order.
    pub fn label_names(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|(name, _)| name.as_str())
    }
}

/// Builds fixed-shape batches by pulling records through a
/// [`MultiSourceReader`] and a [`TransformChain`].
///
/// All records of one batch come from a single source; the next source is
/// chosen once per batch, after assembly. Transform parameters are resampled
/// per record, and every record's planned output shape must match the shape
/// the batch tensor was allocated with.
pub struct BatchAssembler {
    reader: MultiSourceReader,
    chain: TransformChain,
    rng: RandomSource,
    batch_size: usize,
    label_names: Vec<String>,
    missing_value: f32,
    no_wrap: bool,
    rand_advance_skip: u32,
    force_color: bool,
}

impl BatchAssembler {
    /// Validates the configuration and opens the sources.
    pub fn new(
        stores: &[Box<dyn RecordStore>],
        chain: TransformChain,
        config: &PipelineConfig,
    ) -> Result<Self> {
        ensure!(config.batch_size > 0, "batch_size must be positive");
        ensure!(
            !(config.in_order && config.enforce_epochs),
            "in_order and enforce_epochs are mutually exclusive"
        );
        for name in &config.label_names {
            ensure!(
                DocumentRecord::is_label_name(name),
                "unrecognized label name: {}",
                name
            );
        }

        let policy = if config.in_order {
            SelectionPolicy::InOrder
        } else if config.enforce_epochs {
            SelectionPolicy::EnforceEpochs
        } else {
            SelectionPolicy::Weighted
        };
        let options = ReaderOptions {
            policy,
            weights: config.weights.clone(),
            weights_by_size: config.weights_by_size,
            rand_skip: config.rand_skip,
        };

        let mut rng = RandomSource::new(config.seed);
        let reader = MultiSourceReader::open(stores, &options, &mut rng)?;
        Ok(Self {
            reader,
            chain,
            rng,
            batch_size: config.batch_size,
            label_names: config.label_names.clone(),
            missing_value: config.missing_value,
            no_wrap: config.no_wrap,
            rand_advance_skip: config.rand_advance_skip,
            force_color: config.force_color,
        })
    }

    /// Completed passes over source `index`. See [`MultiSourceReader::epoch`].
    pub fn epoch(&self, index: usize) -> u64 {
        self.reader.epoch(index)
    }

    fn current_record(&self) -> Result<DocumentRecord> {
        let bytes = self.reader.current_value()?;
        let mut record = DocumentRecord::from_bytes(&bytes)?;
        if self.force_color {
            record.image.channels = 3;
        }
        Ok(record)
    }

    /// Assembles the next batch from the current source.
    ///
    /// The batch tensor is allocated from the output shape planned for the
    /// first record; every following record must plan the same shape. With
    /// `no_wrap` set, hitting the end of the source mid-batch truncates the
    /// batch to the records read so far.
    pub fn assemble(&mut self) -> Result<Batch> {
        // Plan the batch shape from the record under the cursor.
        let first = self.current_record()?;
        let batch_shape = self
            .chain
            .sample_params(&mut self.rng, first.image.declared_shape())?;

        let images = Tensor::zeros(
            [
                self.batch_size as i64,
                batch_shape.channels as i64,
                batch_shape.height as i64,
                batch_shape.width as i64,
            ],
            (Kind::Float, Device::Cpu),
        );
        let mut label_values: Vec<Vec<f32>> = self
            .label_names
            .iter()
            .map(|_| Vec::with_capacity(self.batch_size))
            .collect();

        let mut filled = 0;
        let mut truncated = false;
        for item in 0..self.batch_size {
            let record = self.current_record()?;
            let declared = record.image.declared_shape();
            if item > 0 {
                // Fresh parameters per record; the planned shape must agree
                // with the allocation made for the first record.
                let planned = self.chain.sample_params(&mut self.rng, declared)?;
                ensure!(
                    planned == batch_shape,
                    "record {} plans output shape {:?}, batch was allocated for {:?}",
                    item,
                    planned,
                    batch_shape
                );
            }

            let pixels = record.image.decode()?;
            ensure!(
                pixels.shape() == declared,
                "decoded image shape {:?} disagrees with declared shape {:?}",
                pixels.shape(),
                declared
            );
            let out = self.chain.execute(&mut self.rng, &pixels)?;
            ensure!(
                out.shape() == batch_shape,
                "transformed shape {:?} does not match planned shape {:?}",
                out.shape(),
                batch_shape
            );

            let mut row = images.get(item as i64);
            row.copy_(&out.to_tensor());
            for (values, name) in label_values.iter_mut().zip(&self.label_names) {
                values.push(record.label_value(name, self.missing_value)?);
            }
            filled = item + 1;

            let mut num_to_advance = 1;
            if self.rand_advance_skip > 0 {
                num_to_advance += self.rng.next_int(self.rand_advance_skip + 1)? as usize;
            }
            for _ in 0..num_to_advance {
                let wrapped = self.reader.advance_current();
                if wrapped && self.no_wrap {
                    debug!(filled, "source exhausted, truncating batch");
                    truncated = true;
                    break;
                }
            }
            if truncated {
                break;
            }
        }

        // Pick the source the next batch is pulled from.
        self.reader.select_next(&mut self.rng)?;

        let images = if truncated {
            images.narrow(0, 0, filled as i64).contiguous()
        } else {
            images
        };
        let labels = self
            .label_names
            .iter()
            .zip(label_values)
            .map(|(name, values)| (name.clone(), Tensor::from_slice(&values)))
            .collect();
        Ok(Batch { images, labels })
    }
}
