#![forbid(unsafe_code)]

use core::fmt::{Debug, Write};

use alloc::vec::Vec;

use crate::{crc32, ByteSource, ImageHeader, PngError, PngResult};

/// The largest length a PNG chunk is allowed to declare.
pub const MAX_CHUNK_LEN: u32 = (1 << 31) - 1;

/// How much of a chunk is read at a time when the source can't say how many
/// bytes it has left.
const UNSIZED_READ_PIECE: usize = 64 * 1024;

/// The 4 byte tag that says what kind of data a chunk holds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ChunkType(pub [u8; 4]);
#[allow(nonstandard_style)]
impl ChunkType {
  /// Image Header
  pub const IHDR: Self = Self(*b"IHDR");
  /// Image Data
  pub const IDAT: Self = Self(*b"IDAT");
  /// Image End
  pub const IEND: Self = Self(*b"IEND");

  /// If the chunk is critical, meaning a decoder must understand it.
  ///
  /// This is bit 5 of the first byte (an uppercase ascii letter).
  #[inline]
  #[must_use]
  pub const fn is_critical(self) -> bool {
    (self.0[0] & 0b0010_0000) == 0
  }
}
impl Debug for ChunkType {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.write_char(self.0[0] as char)?;
    f.write_char(self.0[1] as char)?;
    f.write_char(self.0[2] as char)?;
    f.write_char(self.0[3] as char)?;
    Ok(())
  }
}

/// One chunk of a PNG, with a checked CRC.
///
/// The chunk owns a single buffer holding the type tag followed by the data,
/// since those are exactly the bytes the CRC covers.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PngChunk {
  type_and_data: Vec<u8>,
  crc: u32,
}
impl PngChunk {
  /// The chunk's type.
  #[inline]
  #[must_use]
  pub fn ty(&self) -> ChunkType {
    let mut tag = [0_u8; 4];
    tag.copy_from_slice(&self.type_and_data[..4]);
    ChunkType(tag)
  }

  /// The chunk's data, not including the type tag.
  #[inline]
  #[must_use]
  pub fn data(&self) -> &[u8] {
    &self.type_and_data[4..]
  }

  /// The chunk's stored CRC, which has already been checked.
  #[inline]
  #[must_use]
  pub const fn crc(&self) -> u32 {
    self.crc
  }

  /// Takes the data out of the chunk.
  #[inline]
  #[must_use]
  pub fn into_data(mut self) -> Vec<u8> {
    self.type_and_data.drain(..4);
    self.type_and_data
  }
}
impl Debug for PngChunk {
  #[inline]
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    let data = self.data();
    f.debug_struct("PngChunk")
      .field("ty", &self.ty())
      .field("data", &(&data[..data.len().min(12)], data.len()))
      .field("crc", &self.crc)
      .finish()
  }
}

/// Parses the data of an `IHDR` chunk into a checked [`ImageHeader`].
///
/// The chunk's type isn't looked at, only its data.
///
/// ## Failure
/// * [`PngError::WrongChunkLength`] unless the data is 13 bytes.
/// * [`PngError::UnsupportedProfile`] or [`PngError::WidthOrHeightZero`], see
///   [`ImageHeader::check_profile`].
#[inline]
pub fn parse_header(chunk: &PngChunk) -> PngResult<ImageHeader> {
  ImageHeader::try_from(chunk.data())
}

/// Reads one chunk from the source and checks its CRC.
///
/// `chunk_index` is only used for error reporting.
///
/// ## Failure
/// * [`PngError::TruncatedStream`] if the source runs out mid-chunk.
/// * [`PngError::ChunkLengthOutOfRange`] if the length is over
///   [`MAX_CHUNK_LEN`].
/// * [`PngError::CrcMismatch`] if the stored CRC is wrong.
/// * [`PngError::AllocationFailure`] if the chunk's buffer can't be allocated.
pub fn read_chunk<S: ByteSource>(source: &mut S, chunk_index: usize) -> PngResult<PngChunk> {
  let length = source.read_u32_be()?;
  if length > MAX_CHUNK_LEN {
    return Err(PngError::ChunkLengthOutOfRange { length, chunk_index });
  }
  // type + data + crc must all still be there
  let needed = 4 + u64::from(length) + 4;
  if source.remaining_hint().is_some_and(|remaining| remaining < needed) {
    return Err(PngError::TruncatedStream);
  }
  let total = 4 + length as usize;
  let mut type_and_data: Vec<u8> = Vec::new();
  if source.remaining_hint().is_some() {
    type_and_data.try_reserve_exact(total)?;
    type_and_data.resize(total, 0);
    source.read_exact(&mut type_and_data)?;
  } else {
    // the length is only a claim, so the buffer grows as bytes actually arrive
    while type_and_data.len() < total {
      let start = type_and_data.len();
      let piece = (total - start).min(UNSIZED_READ_PIECE);
      type_and_data.try_reserve(piece)?;
      type_and_data.resize(start + piece, 0);
      source.read_exact(&mut type_and_data[start..])?;
    }
  }
  let stored = source.read_u32_be()?;
  let computed = crc32(&type_and_data);
  if computed != stored {
    return Err(PngError::CrcMismatch { expected: stored, computed, chunk_index });
  }
  let chunk = PngChunk { type_and_data, crc: stored };
  log::trace!("chunk {chunk_index}: {:?}, {} bytes", chunk.ty(), length);
  Ok(chunk)
}

/// Reads chunks one after the other from a [`ByteSource`].
///
/// The source should already be past the PNG signature.
///
/// As an iterator this gives `Ok` chunks until the source is cleanly used up,
/// or gives one `Err` and then stops.
#[derive(Debug)]
pub struct ChunkReader<S> {
  source: S,
  chunks_read: usize,
  failed: bool,
}
impl<S: ByteSource> ChunkReader<S> {
  /// Reads chunks from the source.
  #[inline]
  #[must_use]
  pub const fn new(source: S) -> Self {
    Self { source, chunks_read: 0, failed: false }
  }

  /// Reads the next chunk.
  ///
  /// See [`read_chunk`] for the possible errors.
  pub fn read_chunk(&mut self) -> PngResult<PngChunk> {
    let index = self.chunks_read;
    match read_chunk(&mut self.source, index) {
      Ok(chunk) => {
        self.chunks_read += 1;
        Ok(chunk)
      }
      Err(e) => {
        self.failed = true;
        Err(e)
      }
    }
  }

  /// How many chunks have been read successfully.
  #[inline]
  #[must_use]
  pub const fn chunks_read(&self) -> usize {
    self.chunks_read
  }

  /// The underlying source.
  #[inline]
  #[must_use]
  pub fn source(&self) -> &S {
    &self.source
  }

  /// The underlying source, mutably.
  ///
  /// Reading from it directly skips chunk parsing, so only do that at a chunk
  /// boundary.
  #[inline]
  #[must_use]
  pub fn source_mut(&mut self) -> &mut S {
    &mut self.source
  }

  /// Checks if the source has no more bytes.
  #[inline]
  pub fn is_at_end(&mut self) -> PngResult<bool> {
    self.source.is_at_end()
  }

  /// Unwraps the source.
  #[inline]
  #[must_use]
  pub fn into_source(self) -> S {
    self.source
  }
}
impl<S: ByteSource> Iterator for ChunkReader<S> {
  type Item = PngResult<PngChunk>;

  #[inline]
  fn next(&mut self) -> Option<Self::Item> {
    if self.failed {
      return None;
    }
    match self.source.is_at_end() {
      Ok(true) => None,
      Ok(false) => Some(self.read_chunk()),
      Err(e) => {
        self.failed = true;
        Some(Err(e))
      }
    }
  }
}
impl<S: ByteSource> core::iter::FusedIterator for ChunkReader<S> {}
