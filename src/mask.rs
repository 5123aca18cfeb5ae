//! Stream normalisation for the masked broadcast.
//!
//! Every byte on the wire is the bitwise complement of the clear stream. The
//! helpers here undo that mask, either over owned chunks or transparently
//! through [`MaskedReader`] for any [`AsyncRead`] source.

use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use tokio::io::{AsyncRead, ReadBuf};

/// Mask applied to every byte of the broadcast.
pub const MASK: u8 = 0xFF;

/// Remove the mask from a single byte.
///
/// Applying the function twice yields the original value.
///
/// # Examples
///
/// ```
/// use byteblaster::mask::normalize_byte;
///
/// assert_eq!(normalize_byte(0xD0), b'/');
/// assert_eq!(normalize_byte(normalize_byte(0x42)), 0x42);
/// ```
#[must_use]
pub const fn normalize_byte(byte: u8) -> u8 { byte ^ MASK }

/// Remove the mask from every byte of `bytes` in place.
pub fn normalize_in_place(bytes: &mut [u8]) {
    for byte in bytes {
        *byte = normalize_byte(*byte);
    }
}

/// Return an unmasked copy of `chunk`.
#[must_use]
pub fn normalize(chunk: &[u8]) -> Bytes { chunk.iter().map(|b| normalize_byte(*b)).collect() }

/// [`AsyncRead`] adapter that unmasks bytes as they are read.
///
/// Used when replaying a raw capture through the decoder with
/// [`FramedRead`](tokio_util::codec::FramedRead).
#[derive(Debug)]
pub struct MaskedReader<R> {
    inner: R,
}

impl<R> MaskedReader<R> {
    /// Wrap `inner`, unmasking everything it yields.
    #[must_use]
    pub const fn new(inner: R) -> Self { Self { inner } }

    /// Return the wrapped reader.
    #[must_use]
    pub fn into_inner(self) -> R { self.inner }
}

impl<R: AsyncRead + Unpin> AsyncRead for MaskedReader<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let start = buf.filled().len();
        let poll = Pin::new(&mut self.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = &poll {
            normalize_in_place(&mut buf.filled_mut()[start..]);
        }
        poll
    }
}
