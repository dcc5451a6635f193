#![forbid(unsafe_code)]

use alloc::vec::Vec;

use crate::{PngChunk, PngError, PngResult};

/// Gathers the data of every `IDAT` chunk into one zlib stream.
///
/// Chunks are appended in the order given. PNG encoders can split the
/// compressed stream at any byte, so nothing here looks inside the data.
#[derive(Debug, Clone, Default)]
pub struct IdatAssembler {
  buf: Vec<u8>,
  chunk_count: usize,
  limit: Option<usize>,
}
impl IdatAssembler {
  /// An assembler with no size cap.
  #[inline]
  #[must_use]
  pub const fn new() -> Self {
    Self { buf: Vec::new(), chunk_count: 0, limit: None }
  }

  /// An assembler that refuses to hold more than `limit` bytes in total.
  #[inline]
  #[must_use]
  pub const fn with_limit(limit: Option<usize>) -> Self {
    Self { buf: Vec::new(), chunk_count: 0, limit }
  }

  /// Appends the chunk's data.
  ///
  /// ## Failure
  /// * [`PngError::LimitExceeded`] if the total would go over the limit. The
  ///   assembler is unchanged in this case.
  /// * [`PngError::AllocationFailure`] if the buffer can't grow.
  pub fn append(&mut self, chunk: &PngChunk) -> PngResult<()> {
    let data = chunk.data();
    let new_len = self.buf.len().checked_add(data.len()).ok_or(PngError::LimitExceeded)?;
    if self.limit.is_some_and(|limit| new_len > limit) {
      log::debug!("IDAT total of {new_len} bytes is over the limit");
      return Err(PngError::LimitExceeded);
    }
    self.buf.try_reserve(data.len())?;
    self.buf.extend_from_slice(data);
    self.chunk_count += 1;
    Ok(())
  }

  /// Bytes gathered so far.
  #[inline]
  #[must_use]
  pub fn len(&self) -> usize {
    self.buf.len()
  }

  /// If no bytes have been gathered.
  ///
  /// Note that an `IDAT` chunk can be empty, so check
  /// [`chunk_count`](Self::chunk_count) to know if any were seen.
  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.buf.is_empty()
  }

  /// How many chunks have been appended.
  #[inline]
  #[must_use]
  pub const fn chunk_count(&self) -> usize {
    self.chunk_count
  }

  /// The gathered bytes.
  #[inline]
  #[must_use]
  pub fn as_bytes(&self) -> &[u8] {
    &self.buf
  }

  /// Takes the gathered bytes.
  #[inline]
  #[must_use]
  pub fn into_bytes(self) -> Vec<u8> {
    self.buf
  }
}
