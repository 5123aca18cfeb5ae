//! Reassembly of validated frames into complete files.
//!
//! [`FileAssembler`] keys in-flight files by filename and places each payload
//! into the slot named by its part number. Slots may arrive in any order.
//! Once every slot is filled the parts are concatenated in index order and
//! the file is handed back to the caller for delivery.
//!
//! Version stamps are compared as text. A frame whose stamp is not strictly
//! newer than the last delivered stamp for its filename is stale and dropped.
//! A frame carrying a different stamp (or part count) than the in-flight
//! entry abandons that entry and starts over, so a completed file never mixes
//! payloads from two versions.

use std::collections::{HashMap, HashSet};

use bytes::{Bytes, BytesMut};
use log::debug;

use crate::frame::Frame;

/// Filename used by the broadcaster for padding content.
pub const DEFAULT_FILLER: &str = "FILLFILE.TXT";

/// How an assembly for a new filename interacts with other in-flight files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AssemblyScope {
    /// Every filename assembles independently.
    #[default]
    PerFile,
    /// Starting any new assembly discards all other in-flight files.
    SingleFile,
}

/// Behaviour of a [`FileAssembler`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssemblyConfig {
    filler_names: HashSet<String>,
    scope: AssemblyScope,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            filler_names: HashSet::from([DEFAULT_FILLER.to_owned()]),
            scope: AssemblyScope::default(),
        }
    }
}

impl AssemblyConfig {
    /// Replace the set of filenames whose completed files are discarded.
    #[must_use]
    pub fn filler_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filler_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Select the assembly scope.
    #[must_use]
    pub fn scope(mut self, scope: AssemblyScope) -> Self {
        self.scope = scope;
        self
    }

    /// Whether `filename` names filler content.
    #[must_use]
    pub fn is_filler(&self, filename: &str) -> bool { self.filler_names.contains(filename) }
}

/// A fully reassembled file ready for delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletedFile {
    filename: String,
    version_stamp: String,
    content: Bytes,
}

impl CompletedFile {
    /// Construct a completed file.
    #[must_use]
    pub fn new(filename: String, version_stamp: String, content: Bytes) -> Self {
        Self {
            filename,
            version_stamp,
            content,
        }
    }

    /// Name the broadcaster gave the file.
    #[must_use]
    pub fn filename(&self) -> &str { &self.filename }

    /// Version stamp shared by every part.
    #[must_use]
    pub fn version_stamp(&self) -> &str { &self.version_stamp }

    /// Concatenated payloads in part order.
    #[must_use]
    pub fn content(&self) -> &Bytes { &self.content }

    /// Size of the file in bytes.
    #[must_use]
    pub fn len(&self) -> usize { self.content.len() }

    /// Whether the file has no content.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.content.is_empty() }
}

/// Result of offering a validated frame to the assembler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// The stamp is not newer than the last delivered version.
    Stale,
    /// The frame was stored; the file still misses parts.
    Pending {
        /// Distinct parts held for the current version.
        received: u32,
        /// Parts required to complete the file.
        total: u32,
        /// Stamp of an in-flight version this frame displaced.
        abandoned: Option<String>,
    },
    /// A filler file completed and was discarded.
    Filler,
    /// The frame completed a file.
    Completed(CompletedFile),
}

#[derive(Debug)]
struct InFlightFile {
    version_stamp: String,
    total_parts: u32,
    slots: Vec<Option<Bytes>>,
    received: u32,
}

impl InFlightFile {
    fn new(version_stamp: String, total_parts: u32) -> Self {
        Self {
            version_stamp,
            total_parts,
            slots: vec![None; total_parts as usize],
            received: 0,
        }
    }

    fn matches(&self, version_stamp: &str, total_parts: u32) -> bool {
        self.version_stamp == version_stamp && self.total_parts == total_parts
    }

    /// Store `payload` in its one-based slot; repeats overwrite.
    fn place(&mut self, part_number: u32, payload: Bytes) {
        let Some(slot) = (part_number as usize)
            .checked_sub(1)
            .and_then(|index| self.slots.get_mut(index))
        else {
            return;
        };
        if slot.replace(payload).is_none() {
            self.received += 1;
        }
    }

    fn is_complete(&self) -> bool { self.received == self.total_parts }

    fn into_content(self) -> Bytes {
        let len = self.slots.iter().flatten().map(Bytes::len).sum();
        let mut content = BytesMut::with_capacity(len);
        for part in self.slots.into_iter().flatten() {
            content.extend_from_slice(&part);
        }
        content.freeze()
    }
}

/// Owner of the in-flight table and the last-delivered registry.
#[derive(Debug, Default)]
pub struct FileAssembler {
    config: AssemblyConfig,
    in_flight: HashMap<String, InFlightFile>,
    last_delivered: HashMap<String, String>,
}

impl FileAssembler {
    /// Create an assembler with the given behaviour.
    #[must_use]
    pub fn new(config: AssemblyConfig) -> Self {
        Self {
            config,
            in_flight: HashMap::new(),
            last_delivered: HashMap::new(),
        }
    }

    /// Offer a checksum-validated frame.
    ///
    /// Completed non-filler files update the last-delivered registry before
    /// they are returned; the caller is responsible for delivery.
    pub fn accept(&mut self, frame: Frame) -> AcceptOutcome {
        let (header, payload) = frame.into_parts();
        let filename = header.filename;
        let stamp = header.version_stamp;
        let total = header.total_parts;

        // An unseen filename compares against the empty stamp.
        let last = self.last_delivered.get(&filename).map_or("", String::as_str);
        if stamp.as_str() <= last {
            debug!("stale frame: filename={filename}, stamp={stamp:?}, last={last:?}");
            return AcceptOutcome::Stale;
        }

        let current = self.in_flight.get(&filename);
        let starts_new = !current.is_some_and(|file| file.matches(&stamp, total));
        let abandoned = current
            .filter(|_| starts_new)
            .map(|file| file.version_stamp.clone());
        if starts_new {
            self.reset_for(&filename, abandoned.as_deref());
        }

        let file = self
            .in_flight
            .entry(filename.clone())
            .or_insert_with(|| InFlightFile::new(stamp.clone(), total));
        file.place(header.part_number, payload);
        let received = file.received;
        if !file.is_complete() {
            return AcceptOutcome::Pending {
                received,
                total,
                abandoned,
            };
        }

        let content = self
            .in_flight
            .remove(&filename)
            .map(InFlightFile::into_content)
            .unwrap_or_default();
        if self.config.is_filler(&filename) {
            debug!("discarding filler file: filename={filename}");
            return AcceptOutcome::Filler;
        }
        self.last_delivered.insert(filename.clone(), stamp.clone());
        AcceptOutcome::Completed(CompletedFile::new(filename, stamp, content))
    }

    fn reset_for(&mut self, filename: &str, abandoned: Option<&str>) {
        if let Some(previous) = abandoned {
            debug!("abandoning in-flight version: filename={filename}, stamp={previous:?}");
        }
        match self.config.scope {
            AssemblyScope::PerFile => {
                self.in_flight.remove(filename);
            }
            AssemblyScope::SingleFile => {
                if !self.in_flight.is_empty() {
                    debug!(
                        "resetting in-flight assemblies: discarded={}",
                        self.in_flight.len()
                    );
                }
                self.in_flight.clear();
            }
        }
    }

    /// Number of files currently being assembled.
    #[must_use]
    pub fn in_flight_len(&self) -> usize { self.in_flight.len() }

    /// Stamp and progress of the in-flight assembly for `filename`.
    #[must_use]
    pub fn in_flight(&self, filename: &str) -> Option<(&str, u32, u32)> {
        self.in_flight
            .get(filename)
            .map(|file| (file.version_stamp.as_str(), file.received, file.total_parts))
    }

    /// Most recently delivered stamp for `filename`.
    #[must_use]
    pub fn last_delivered(&self, filename: &str) -> Option<&str> {
        self.last_delivered.get(filename).map(String::as_str)
    }

    /// Borrow the active configuration.
    #[must_use]
    pub fn config(&self) -> &AssemblyConfig { &self.config }
}

#[cfg(test)]
mod tests;
