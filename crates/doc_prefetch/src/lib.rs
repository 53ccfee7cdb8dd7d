//! Prefetching batch pipeline for labeled document images.
//!
//! Records live in one or more [`store::RecordStore`]s, each record an
//! encoded image plus optional scalar metadata. A [`BatchAssembler`] pulls
//! records through a [`transforms::TransformChain`] and stacks them into
//! fixed-shape tensors; a [`PrefetchPipeline`] runs the assembler on a
//! background thread so the next batch is ready while the current one is
//! consumed.

pub mod batch;
pub mod config;
pub mod pipeline;
pub mod pixels;
pub mod random;
pub mod reader;
pub mod record;
pub mod store;
pub mod transforms;

pub use batch::{Batch, BatchAssembler};
pub use config::PipelineConfig;
pub use pipeline::PrefetchPipeline;
pub use random::RandomSource;
pub use reader::{MultiSourceReader, ReaderOptions, SelectionPolicy};
pub use record::{DocumentRecord, ImagePayload};
pub use store::{DirectoryStore, InMemoryStore, RecordCursor, RecordStore};
pub use transforms::{
    Crop, CropConfig, CropPlacement, FloatRange, GaussianNoise, Rotate, SizeRange, TransformChain,
};
