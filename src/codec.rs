//! Sentinel-delimited framing for the unmasked broadcast stream.
//!
//! The broadcast carries no length prefix. Frames are located purely by the
//! three-byte [`SENTINEL`] that opens every header, so a frame runs from one
//! sentinel up to (not including) the next.
//!
//! [`SentinelDecoder`] implements the boundary search as a Tokio
//! [`Decoder`], which lets it drive a [`FramedRead`](tokio_util::codec::FramedRead)
//! directly. [`FrameExtractor`] pairs the decoder with the accumulation buffer
//! for callers that receive already-unmasked chunks from a queue.
//!
//! The accumulation buffer is only ever consumed from the front.

use std::io;

use bytes::{Buf, Bytes, BytesMut};
use log::{debug, warn};
use tokio_util::codec::Decoder;

/// Marker opening every frame header (`/PF`).
pub const SENTINEL: [u8; 3] = *b"/PF";

/// Size of the fixed header region, sentinel included.
pub const HEADER_LEN: usize = 80;

/// Size of the payload region following the header.
pub const PAYLOAD_LEN: usize = 1024;

/// Nominal distance between two consecutive sentinels.
pub const FRAME_LEN: usize = 1116;

/// Smallest frame that still covers the header and payload.
pub const MIN_FRAME_LEN: usize = HEADER_LEN + PAYLOAD_LEN;

/// Default bound on a sentinel-aligned buffer that never sees a closing
/// sentinel.
pub const DEFAULT_MAX_BUFFER_LEN: usize = 64 * 1024;

/// Locate the first sentinel at or after `from`.
fn find_sentinel(haystack: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(SENTINEL.len())
        .position(|window| window == SENTINEL)
        .map(|offset| offset + from)
}

/// Tokio decoder splitting the unmasked stream on sentinel boundaries.
///
/// Extraction is only attempted once more than [`FRAME_LEN`] bytes are
/// buffered. Frame length is not checked here; parsing rejects undersized
/// frames.
#[derive(Clone, Copy, Debug)]
pub struct SentinelDecoder {
    max_buffer_len: usize,
}

impl SentinelDecoder {
    /// Construct a decoder with a custom bound on unterminated frames.
    ///
    /// The bound is clamped to at least two nominal frames.
    #[must_use]
    pub fn new(max_buffer_len: usize) -> Self {
        Self {
            max_buffer_len: max_buffer_len.max(2 * FRAME_LEN),
        }
    }

    /// Return the bound on a buffer still waiting for its closing sentinel.
    #[must_use]
    pub const fn max_buffer_len(&self) -> usize { self.max_buffer_len }

    /// Slice the next frame off the front of `src`, if one is complete.
    pub fn next_frame(&mut self, src: &mut BytesMut) -> Option<Bytes> {
        if src.len() <= FRAME_LEN {
            return None;
        }

        let Some(start) = find_sentinel(src, 0) else {
            // Only a sentinel split across chunks can survive.
            let discard = src.len() - (SENTINEL.len() - 1);
            debug!("no sentinel in buffer: discarded={discard}");
            src.advance(discard);
            return None;
        };
        if start > 0 {
            debug!("skipping bytes before sentinel: discarded={start}");
            src.advance(start);
        }

        if let Some(end) = find_sentinel(src, SENTINEL.len()) {
            return Some(src.split_to(end).freeze());
        }

        if src.len() > self.max_buffer_len {
            warn!(
                "unterminated frame exceeded buffer bound: buffered={}, max={}",
                src.len(),
                self.max_buffer_len
            );
            src.advance(SENTINEL.len());
        }
        None
    }
}

impl Default for SentinelDecoder {
    fn default() -> Self { Self::new(DEFAULT_MAX_BUFFER_LEN) }
}

impl Decoder for SentinelDecoder {
    type Item = Bytes;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(self.next_frame(src))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.next_frame(src) {
            return Ok(Some(frame));
        }
        // A capture ends without a closing sentinel, so the tail is accepted
        // when it is aligned and large enough to parse.
        if src.starts_with(&SENTINEL) && src.len() >= MIN_FRAME_LEN {
            return Ok(Some(src.split().freeze()));
        }
        if !src.is_empty() {
            debug!("discarding trailing bytes at end of stream: len={}", src.len());
            src.clear();
        }
        Ok(None)
    }
}

/// Owner of the accumulation buffer for queue-fed extraction.
#[derive(Debug, Default)]
pub struct FrameExtractor {
    buffer: BytesMut,
    decoder: SentinelDecoder,
}

impl FrameExtractor {
    /// Create an extractor with an explicit unterminated-frame bound.
    #[must_use]
    pub fn new(max_buffer_len: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(2 * FRAME_LEN),
            decoder: SentinelDecoder::new(max_buffer_len),
        }
    }

    /// Append an unmasked chunk and return every frame it completes, in
    /// arrival order.
    pub fn ingest(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(frame) = self.decoder.next_frame(&mut self.buffer) {
            frames.push(frame);
        }
        frames
    }

    /// Number of bytes waiting for a frame boundary.
    #[must_use]
    pub fn buffered_len(&self) -> usize { self.buffer.len() }

    /// Borrow the pending bytes.
    #[must_use]
    pub fn buffered(&self) -> &[u8] { &self.buffer }

    /// Decoder configured like this extractor, for use with
    /// [`FramedRead`](tokio_util::codec::FramedRead).
    #[must_use]
    pub fn decoder(&self) -> SentinelDecoder { self.decoder }
}
