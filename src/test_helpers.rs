#![cfg(any(test, feature = "test-helpers"))]
//! Builders for broadcast frames and streams shared by tests.

use std::{
    collections::VecDeque,
    io,
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncWriteExt, DuplexStream, duplex};

use crate::{
    assembler::CompletedFile,
    codec::{FRAME_LEN, HEADER_LEN, PAYLOAD_LEN, SENTINEL},
    frame::{Frame, FrameHeader, checksum},
    mask::normalize,
    sink::FileSink,
    transport::Transport,
};

/// Build a full payload region filled with `fill`.
#[must_use]
pub fn payload_of(fill: u8) -> Bytes { Bytes::from(vec![fill; PAYLOAD_LEN]) }

/// Build a header whose checksum matches `payload`.
#[must_use]
pub fn header_for(
    filename: &str,
    version_stamp: &str,
    part_number: u32,
    total_parts: u32,
    payload: &[u8],
) -> FrameHeader {
    FrameHeader {
        filename: filename.to_owned(),
        part_number,
        total_parts,
        checksum: checksum(payload),
        version_stamp: version_stamp.to_owned(),
    }
}

/// Build a parsed, valid frame.
#[must_use]
pub fn frame(
    filename: &str,
    version_stamp: &str,
    part_number: u32,
    total_parts: u32,
    payload: Bytes,
) -> Frame {
    let header = header_for(filename, version_stamp, part_number, total_parts, &payload);
    Frame::new(header, payload)
}

/// Encode a valid frame as it appears in the unmasked stream.
///
/// # Panics
///
/// Panics if a header value does not fit its field.
#[must_use]
pub fn frame_bytes(
    filename: &str,
    version_stamp: &str,
    part_number: u32,
    total_parts: u32,
    payload: &[u8],
) -> Bytes {
    let frame = frame(
        filename,
        version_stamp,
        part_number,
        total_parts,
        Bytes::copy_from_slice(payload),
    );
    let mut buf = BytesMut::with_capacity(FRAME_LEN);
    frame.encode(&mut buf).expect("header fields fit");
    buf.freeze()
}

/// Flip one payload byte so the declared checksum no longer matches.
#[must_use]
pub fn corrupt_payload(frame: &Bytes) -> Bytes {
    let mut bytes = frame.to_vec();
    bytes[HEADER_LEN] = bytes[HEADER_LEN].wrapping_add(1);
    Bytes::from(bytes)
}

/// Concatenate frames and close the last one with a sentinel.
#[must_use]
pub fn stream_of<'a>(frames: impl IntoIterator<Item = &'a Bytes>) -> Vec<u8> {
    let mut stream: Vec<u8> = frames
        .into_iter()
        .flat_map(|frame| frame.iter().copied())
        .collect();
    stream.extend_from_slice(&SENTINEL);
    stream
}

/// Apply the broadcast mask, producing bytes as sent on the wire.
#[must_use]
pub fn to_wire(clear: &[u8]) -> Vec<u8> { normalize(clear).to_vec() }

/// One connection attempt scripted for [`ScriptedTransport`].
#[derive(Clone, Debug)]
pub enum ScriptStep {
    /// Fail the attempt with `ConnectionRefused`.
    Refuse,
    /// Deliver the bytes, then close the connection.
    Send(Vec<u8>),
    /// Deliver the bytes, then keep the connection open without data.
    Stall(Vec<u8>),
}

/// Transport replaying a fixed script of connection attempts.
///
/// Once the script is exhausted every attempt is refused.
#[derive(Debug)]
pub struct ScriptedTransport {
    steps: VecDeque<ScriptStep>,
    attempts: Arc<AtomicUsize>,
    stalled: Vec<DuplexStream>,
}

impl ScriptedTransport {
    /// Create a transport from `steps`.
    #[must_use]
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            attempts: Arc::new(AtomicUsize::new(0)),
            stalled: Vec::new(),
        }
    }

    /// Shared counter of connection attempts.
    #[must_use]
    pub fn attempts(&self) -> Arc<AtomicUsize> { Arc::clone(&self.attempts) }

    async fn open(&mut self, bytes: &[u8], keep_open: bool) -> io::Result<DuplexStream> {
        let (mut writer, reader) = duplex(bytes.len().max(1));
        writer.write_all(bytes).await?;
        if keep_open {
            self.stalled.push(writer);
        }
        Ok(reader)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    type Stream = DuplexStream;

    async fn connect(&mut self) -> io::Result<Self::Stream> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.steps.pop_front() {
            None | Some(ScriptStep::Refuse) => Err(io::ErrorKind::ConnectionRefused.into()),
            Some(ScriptStep::Send(bytes)) => self.open(&bytes, false).await,
            Some(ScriptStep::Stall(bytes)) => self.open(&bytes, true).await,
        }
    }
}

/// Sink keeping every delivered file in memory.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    files: Arc<Mutex<Vec<CompletedFile>>>,
}

impl RecordingSink {
    /// Snapshot of the files delivered so far.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    #[must_use]
    pub fn files(&self) -> Vec<CompletedFile> { self.files.lock().expect("sink lock").clone() }
}

#[async_trait]
impl FileSink for RecordingSink {
    async fn deliver(&self, file: &CompletedFile) -> io::Result<()> {
        self.files.lock().expect("sink lock").push(file.clone());
        Ok(())
    }
}

/// Sink failing every delivery.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailingSink;

#[async_trait]
impl FileSink for FailingSink {
    async fn deliver(&self, _file: &CompletedFile) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only sink"))
    }
}
