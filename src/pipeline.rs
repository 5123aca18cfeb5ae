//! Consumer-side processing: extract, validate, reassemble, deliver.
//!
//! A [`Pipeline`] is the single owner of the accumulation buffer and the
//! reassembly state. Chunks are processed strictly in the order they are
//! received, so no locking is involved. Dropped frames are logged at `debug`
//! and counted; they are expected to be repeated by the broadcaster.

use std::io;

use bytes::Bytes;
use futures::StreamExt;
use log::{debug, info, warn};
use tokio::{io::AsyncRead, select, sync::mpsc};
use tokio_util::{codec::FramedRead, sync::CancellationToken};

use crate::{
    assembler::{AcceptOutcome, CompletedFile, FileAssembler},
    codec::FrameExtractor,
    frame::Frame,
    mask::MaskedReader,
    metrics::{self, FrameOutcome},
    sink::FileSink,
};

/// Running totals kept by a [`Pipeline`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Frames sliced from the stream.
    pub frames: u64,
    /// Frames dropped by parsing or checksum validation.
    pub rejected: u64,
    /// Frames dropped as stale versions.
    pub stale: u64,
    /// Filler files completed and discarded.
    pub filler: u64,
    /// Files handed to the sink successfully.
    pub delivered: u64,
    /// Files the sink failed to accept.
    pub write_errors: u64,
}

/// Extractor, assembler and sink wired together.
#[derive(Debug)]
pub struct Pipeline<S> {
    extractor: FrameExtractor,
    assembler: FileAssembler,
    sink: S,
    stats: PipelineStats,
}

impl<S: FileSink> Pipeline<S> {
    /// Assemble a pipeline from its parts.
    #[must_use]
    pub fn new(extractor: FrameExtractor, assembler: FileAssembler, sink: S) -> Self {
        Self {
            extractor,
            assembler,
            sink,
            stats: PipelineStats::default(),
        }
    }

    /// Process one unmasked chunk, handling every frame it completes.
    pub async fn process_chunk(&mut self, chunk: &[u8]) {
        for frame in self.extractor.ingest(chunk) {
            self.process_frame(&frame).await;
        }
        metrics::set_in_flight(self.assembler.in_flight_len());
    }

    /// Validate one sliced frame and offer it to the assembler.
    pub async fn process_frame(&mut self, bytes: &Bytes) {
        self.stats.frames += 1;
        let frame = match Frame::parse_validated(bytes) {
            Ok(frame) => frame,
            Err(e) => {
                debug!("dropping frame: reason={e}, len={}", bytes.len());
                self.stats.rejected += 1;
                metrics::inc_frames(FrameOutcome::Rejected(e.kind()));
                return;
            }
        };

        match self.assembler.accept(frame) {
            AcceptOutcome::Stale => {
                self.stats.stale += 1;
                metrics::inc_frames(FrameOutcome::Stale);
            }
            AcceptOutcome::Pending { .. } => metrics::inc_frames(FrameOutcome::Accepted),
            AcceptOutcome::Filler => {
                self.stats.filler += 1;
                metrics::inc_frames(FrameOutcome::Accepted);
            }
            AcceptOutcome::Completed(file) => {
                metrics::inc_frames(FrameOutcome::Accepted);
                self.deliver(&file).await;
            }
        }
    }

    async fn deliver(&mut self, file: &CompletedFile) {
        info!(
            "saving {} ({}) {}",
            file.filename(),
            file.len(),
            file.version_stamp()
        );
        match self.sink.deliver(file).await {
            Ok(()) => {
                self.stats.delivered += 1;
                metrics::inc_delivered();
            }
            Err(e) => {
                warn!("file write error: filename={}, error={e}", file.filename());
                self.stats.write_errors += 1;
                metrics::inc_write_errors();
            }
        }
    }

    /// Decode a raw masked capture to its end.
    ///
    /// A final frame without a closing sentinel is still processed.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised by `reader`.
    pub async fn replay<R: AsyncRead + Unpin>(&mut self, reader: R) -> io::Result<()> {
        let mut frames = FramedRead::new(MaskedReader::new(reader), self.extractor.decoder());
        while let Some(frame) = frames.next().await {
            self.process_frame(&frame?).await;
        }
        metrics::set_in_flight(self.assembler.in_flight_len());
        Ok(())
    }

    /// Totals so far.
    #[must_use]
    pub fn stats(&self) -> PipelineStats { self.stats }

    /// Borrow the reassembly state.
    #[must_use]
    pub fn assembler(&self) -> &FileAssembler { &self.assembler }

    /// Borrow the frame extractor.
    #[must_use]
    pub fn extractor(&self) -> &FrameExtractor { &self.extractor }

    /// Borrow the sink.
    #[must_use]
    pub fn sink(&self) -> &S { &self.sink }
}

/// Drain `rx` into `pipeline` until the queue closes or `shutdown` fires.
///
/// Returns the pipeline so callers can inspect its final state.
pub async fn run_consumer<S: FileSink>(
    mut rx: mpsc::Receiver<Bytes>,
    mut pipeline: Pipeline<S>,
    shutdown: CancellationToken,
) -> Pipeline<S> {
    loop {
        let chunk = select! {
            biased;

            () = shutdown.cancelled() => break,
            chunk = rx.recv() => chunk,
        };
        let Some(chunk) = chunk else {
            debug!("chunk queue closed");
            break;
        };
        pipeline.process_chunk(&chunk).await;
    }
    pipeline
}

#[cfg(test)]
mod tests;
