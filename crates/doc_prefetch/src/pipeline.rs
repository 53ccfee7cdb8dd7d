//! Background batch prefetching.
//!
//! A [`PrefetchPipeline`] owns a [`BatchAssembler`] on a dedicated thread
//! and keeps one batch in flight: while the caller consumes batch `n`, the
//! worker assembles batch `n + 1`. Assembly errors are carried through the
//! channel and surface on [`PrefetchPipeline::next_batch`].

use crate::batch::{Batch, BatchAssembler};
use crate::config::PipelineConfig;
use crate::store::RecordStore;
use crate::transforms::TransformChain;
use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::thread;
use tracing::debug;

/// A double-buffered batch source: one batch being consumed, one being
/// assembled in the background.
pub struct PrefetchPipeline {
    trigger_tx: Option<Sender<()>>,
    batch_rx: Receiver<Result<Batch>>,
    worker: Option<thread::JoinHandle<()>>,
    in_flight: bool,
}

impl PrefetchPipeline {
    /// Validates the configuration, opens the sources, and starts
    /// assembling the first batch in the background.
    pub fn new(
        stores: &[Box<dyn RecordStore>],
        chain: TransformChain,
        config: &PipelineConfig,
    ) -> Result<Self> {
        let mut assembler = BatchAssembler::new(stores, chain, config)?;

        let (trigger_tx, trigger_rx) = bounded::<()>(1);
        let (batch_tx, batch_rx) = bounded::<Result<Batch>>(1);
        let worker = thread::Builder::new()
            .name("doc-prefetch-worker".to_string())
            .spawn(move || {
                while trigger_rx.recv().is_ok() {
                    let result = assembler.assemble();
                    if batch_tx.send(result).is_err() {
                        break;
                    }
                }
                debug!("prefetch worker shutting down");
            })
            .context("failed to spawn prefetch worker thread")?;

        let mut pipeline = Self {
            trigger_tx: Some(trigger_tx),
            batch_rx,
            worker: Some(worker),
            in_flight: false,
        };
        pipeline.start()?;
        Ok(pipeline)
    }

    /// Kicks off assembly of the next batch if none is in flight. Called
    /// automatically by [`Self::new`] and [`Self::next_batch`]; calling it
    /// again is a no-op while a batch is pending.
    pub fn start(&mut self) -> Result<()> {
        if self.in_flight {
            return Ok(());
        }
        let tx = self
            .trigger_tx
            .as_ref()
            .ok_or_else(|| anyhow!("prefetch pipeline is shut down"))?;
        tx.send(())
            .map_err(|_| anyhow!("prefetch worker exited unexpectedly"))?;
        self.in_flight = true;
        Ok(())
    }

    /// Waits for the batch currently in flight, starts assembling the next
    /// one, and returns the finished batch. An assembly error is returned
    /// as-is; the pipeline stays usable and the following call assembles a
    /// fresh batch.
    pub fn next_batch(&mut self) -> Result<Batch> {
        self.start()?;
        let result = self
            .batch_rx
            .recv()
            .map_err(|_| anyhow!("prefetch worker exited unexpectedly"))?;
        self.in_flight = false;
        self.start()?;
        result
    }
}

impl Drop for PrefetchPipeline {
    fn drop(&mut self) {
        // Closing the trigger channel makes the worker exit after at most
        // one more assembled batch; drain so a blocked send cannot wedge it.
        self.trigger_tx.take();
        while self.batch_rx.recv().is_ok() {}
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
