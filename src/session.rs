#![forbid(unsafe_code)]

//! Drives one decode from the signature to the finished pixels.

use crate::{
  defilter, parse_header, ByteCursor, ByteSource, ChunkReader, ChunkType, IdatAssembler,
  ImageHeader, PixelBuffer, PngError, PngResult, ZlibInflate, PNG_SIGNATURE,
};

/// Limits applied while decoding.
///
/// The [`Default`] limits match what a typical image viewer would accept:
/// at most 16,384 pixels on each side, and no cap on the compressed data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecodeConfig {
  /// Largest width accepted.
  pub max_width: u32,
  /// Largest height accepted.
  pub max_height: u32,
  /// Largest total of `IDAT` data accepted, if any.
  pub max_compressed_len: Option<usize>,
}
impl Default for DecodeConfig {
  #[inline]
  fn default() -> Self {
    Self { max_width: 16_384, max_height: 16_384, max_compressed_len: None }
  }
}
impl DecodeConfig {
  /// No limits beyond what the address space can hold.
  #[inline]
  #[must_use]
  pub const fn unlimited() -> Self {
    Self { max_width: u32::MAX, max_height: u32::MAX, max_compressed_len: None }
  }

  /// Checks a header against the dimension limits.
  ///
  /// ## Failure
  /// * [`PngError::DimensionsTooLarge`] if either side is over the limit, or
  ///   the image data size can't be expressed as a `usize`.
  pub fn check_dimensions(&self, header: &ImageHeader) -> PngResult<()> {
    if header.width > self.max_width || header.height > self.max_height {
      return Err(PngError::DimensionsTooLarge);
    }
    header.filtered_len().map(|_| ())
  }
}

/// Where a [`DecodeSession`] is in the decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
  /// Nothing has been read.
  Start,
  /// The signature was correct.
  SignatureChecked,
  /// The `IHDR` has been read and checked.
  HeaderKnown,
  /// At least one `IDAT` has been read.
  PayloadAccumulating,
  /// The `IEND` chunk has been read.
  EndSeen,
  /// The image data is being inflated.
  Decompressing,
  /// The scanlines are being unfiltered.
  Defiltering,
  /// The pixels were produced.
  Done,
  /// Something went wrong. The session can't continue.
  Failed(PngError),
}

/// The state of a single decode.
///
/// Each session owns its source and buffers, so separate sessions can run on
/// separate threads. Once any step fails, every later step gives back that
/// same error.
#[derive(Debug)]
pub struct DecodeSession<S> {
  chunks: ChunkReader<S>,
  config: DecodeConfig,
  state: DecodeState,
  header: Option<ImageHeader>,
  idat: IdatAssembler,
}
impl<S: ByteSource> DecodeSession<S> {
  /// Starts a session. The source should be at the start of the PNG data.
  #[inline]
  #[must_use]
  pub fn new(source: S, config: DecodeConfig) -> Self {
    Self {
      chunks: ChunkReader::new(source),
      config,
      state: DecodeState::Start,
      header: None,
      idat: IdatAssembler::with_limit(config.max_compressed_len),
    }
  }

  /// The current state.
  #[inline]
  #[must_use]
  pub const fn state(&self) -> DecodeState {
    self.state
  }

  /// The header, once it's been read.
  #[inline]
  #[must_use]
  pub const fn header(&self) -> Option<ImageHeader> {
    self.header
  }

  /// How many chunks have been read.
  #[inline]
  #[must_use]
  pub const fn chunks_read(&self) -> usize {
    self.chunks.chunks_read()
  }

  /// Reads chunks until the `IHDR` has been read, and gives it back.
  ///
  /// If the header is already known this does nothing.
  pub fn read_header(&mut self) -> PngResult<ImageHeader> {
    self.guarded(|s| {
      if s.state == DecodeState::Start {
        s.check_signature()?;
      }
      loop {
        if let Some(header) = s.header {
          return Ok(header);
        }
        s.read_next_chunk()?;
      }
    })
  }

  /// Reads chunks through to the `IEND` chunk.
  pub fn read_to_end(&mut self) -> PngResult<()> {
    self.guarded(|s| {
      if s.state == DecodeState::Start {
        s.check_signature()?;
      }
      while s.state != DecodeState::EndSeen {
        s.read_next_chunk()?;
      }
      Ok(())
    })
  }

  /// Runs the rest of the decode: reads any chunks through `IEND` that
  /// haven't been read yet, then inflates and unfilters the image data.
  ///
  /// ## Failure
  /// * Anything from [`read_to_end`](Self::read_to_end).
  /// * [`PngError::Decompress`] if the zlib stream is broken.
  /// * [`PngError::SizeMismatch`] if the image data doesn't inflate to exactly
  ///   the size the header calls for.
  /// * [`PngError::UnknownFilterType`] from the unfilter step.
  pub fn decode<Z: ZlibInflate + ?Sized>(mut self, inflater: &mut Z) -> PngResult<PixelBuffer> {
    self.read_to_end()?;
    self.guarded(|s| {
      let header = s.header.ok_or(PngError::MissingHeader)?;
      let expected = header.filtered_len()?;
      let limit = expected.checked_add(1).ok_or(PngError::DimensionsTooLarge)?;
      s.set_state(DecodeState::Decompressing);
      let compressed = core::mem::take(&mut s.idat);
      log::debug!(
        "inflating {} bytes from {} IDAT chunks, expecting {expected}",
        compressed.len(),
        compressed.chunk_count()
      );
      let inflated = inflater.inflate(compressed.as_bytes(), limit)?;
      drop(compressed);
      if inflated.len() != expected {
        return Err(PngError::SizeMismatch { expected, actual: inflated.len() });
      }
      s.set_state(DecodeState::Defiltering);
      let pixels = defilter(&inflated, &header)?;
      s.set_state(DecodeState::Done);
      Ok(pixels)
    })
  }

  fn guarded<T>(&mut self, f: impl FnOnce(&mut Self) -> PngResult<T>) -> PngResult<T> {
    if let DecodeState::Failed(e) = self.state {
      return Err(e);
    }
    let out = f(self);
    if let Err(e) = &out {
      log::debug!("decode failed in state {:?}: {e}", self.state);
      self.state = DecodeState::Failed(*e);
    }
    out
  }

  fn set_state(&mut self, state: DecodeState) {
    log::trace!("decode state {:?} -> {:?}", self.state, state);
    self.state = state;
  }

  fn check_signature(&mut self) -> PngResult<()> {
    let signature: [u8; 8] = self.chunks.source_mut().read_array()?;
    if signature != PNG_SIGNATURE {
      return Err(PngError::SignatureInvalid);
    }
    self.set_state(DecodeState::SignatureChecked);
    Ok(())
  }

  fn read_next_chunk(&mut self) -> PngResult<()> {
    let chunk = self.chunks.read_chunk()?;
    match chunk.ty() {
      ChunkType::IHDR => {
        if self.header.is_some() {
          log::warn!("ignoring extra IHDR chunk (chunk {})", self.chunks.chunks_read() - 1);
          return Ok(());
        }
        let header = parse_header(&chunk)?;
        self.config.check_dimensions(&header)?;
        log::debug!("IHDR: {}x{}", header.width, header.height);
        self.header = Some(header);
        if self.state == DecodeState::SignatureChecked {
          self.set_state(DecodeState::HeaderKnown);
        }
      }
      ChunkType::IDAT => {
        if self.header.is_none() {
          log::warn!("IDAT chunk before the IHDR");
        }
        self.idat.append(&chunk)?;
        if self.state != DecodeState::PayloadAccumulating {
          self.set_state(DecodeState::PayloadAccumulating);
        }
      }
      ChunkType::IEND => {
        if self.header.is_none() {
          return Err(PngError::MissingHeader);
        }
        if self.idat.chunk_count() == 0 {
          return Err(PngError::MissingImageData);
        }
        if let Some(extra) = self.chunks.source().remaining_hint().filter(|&n| n > 0) {
          log::warn!("ignoring {extra} bytes after IEND");
        }
        self.set_state(DecodeState::EndSeen);
      }
      other => log::trace!("skipping {other:?} chunk"),
    }
    Ok(())
  }
}

/// Decodes PNG bytes into RGBA8 pixels using the default limits.
///
/// ```no_run
/// # fn main() -> Result<(), png_rgba8::PngError> {
/// let bytes = std::fs::read("image.png").unwrap();
/// let pixels = png_rgba8::decode_png(&bytes)?;
/// println!("{}x{}", pixels.width(), pixels.height());
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "miniz_oxide")]
#[cfg_attr(docs_rs, doc(cfg(feature = "miniz_oxide")))]
#[inline]
pub fn decode_png(bytes: &[u8]) -> PngResult<PixelBuffer> {
  decode_png_with(bytes, &DecodeConfig::default(), &mut crate::MinizInflater)
}

/// Decodes PNG bytes with the given limits and zlib inflater.
#[inline]
pub fn decode_png_with<Z: ZlibInflate + ?Sized>(
  bytes: &[u8], config: &DecodeConfig, inflater: &mut Z,
) -> PngResult<PixelBuffer> {
  DecodeSession::new(ByteCursor::new(bytes), *config).decode(inflater)
}

/// Reads just the header of some PNG bytes.
///
/// Chunks are read up to and including the first `IHDR`, and nothing after
/// that is looked at. No dimension limits are applied.
#[inline]
pub fn png_read_header(bytes: &[u8]) -> PngResult<ImageHeader> {
  DecodeSession::new(ByteCursor::new(bytes), DecodeConfig::unlimited()).read_header()
}

/// Decodes PNG data from a reader using the default limits.
#[cfg(all(feature = "std", feature = "miniz_oxide"))]
#[cfg_attr(docs_rs, doc(cfg(all(feature = "std", feature = "miniz_oxide"))))]
pub fn decode_png_reader<R: std::io::Read>(reader: R) -> PngResult<PixelBuffer> {
  let source = crate::ReadSource::new(std::io::BufReader::new(reader));
  DecodeSession::new(source, DecodeConfig::default()).decode(&mut crate::MinizInflater)
}

/// Decodes the PNG file at the path using the default limits.
#[cfg(all(feature = "std", feature = "miniz_oxide"))]
#[cfg_attr(docs_rs, doc(cfg(all(feature = "std", feature = "miniz_oxide"))))]
pub fn decode_png_file<P: AsRef<std::path::Path>>(path: P) -> PngResult<PixelBuffer> {
  let file = std::fs::File::open(path)?;
  decode_png_reader(file)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{crc32, Unsupported};
  use alloc::vec::Vec;

  /// "Inflates" by copying, so tests can put filtered bytes directly in IDAT.
  fn stored(compressed: &[u8], limit: usize) -> PngResult<Vec<u8>> {
    Ok(compressed[..compressed.len().min(limit)].to_vec())
  }

  fn push_chunk(out: &mut Vec<u8>, ty: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    let start = out.len();
    out.extend_from_slice(ty);
    out.extend_from_slice(data);
    let crc = crc32(&out[start..]);
    out.extend_from_slice(&crc.to_be_bytes());
  }

  fn ihdr(width: u32, height: u32, color_type: u8) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&[8, color_type, 0, 0, 0]);
    data
  }

  /// Signature then the chunks, in order.
  fn png(chunks: &[(&[u8; 4], &[u8])]) -> Vec<u8> {
    let mut out = PNG_SIGNATURE.to_vec();
    for (ty, data) in chunks {
      push_chunk(&mut out, ty, data);
    }
    out
  }

  const TWO_BY_TWO: [u8; 18] =
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 0, 9, 10, 11, 12, 13, 14, 15, 16];

  #[test]
  fn test_decode_two_by_two_none_filtered() {
    let bytes = png(&[(b"IHDR", &ihdr(2, 2, 6)), (b"IDAT", &TWO_BY_TWO), (b"IEND", &[])]);
    let pixels = decode_png_with(&bytes, &DecodeConfig::default(), &mut stored).unwrap();
    assert_eq!((pixels.width(), pixels.height(), pixels.stride()), (2, 2, 8));
    assert_eq!(pixels.as_bytes(), (1..=16).collect::<Vec<u8>>());
  }

  #[test]
  fn test_split_idat_and_ancillary_chunks() {
    let bytes = png(&[
      (b"IHDR", &ihdr(2, 2, 6)),
      (b"tEXt", b"Comment\0hello"),
      (b"IDAT", &TWO_BY_TWO[..5]),
      (b"IDAT", &[]),
      (b"IDAT", &TWO_BY_TWO[5..]),
      (b"IEND", &[]),
    ]);
    let pixels = decode_png_with(&bytes, &DecodeConfig::default(), &mut stored).unwrap();
    assert_eq!(pixels.as_bytes(), (1..=16).collect::<Vec<u8>>());
  }

  #[test]
  fn test_idat_before_ihdr_is_accepted() {
    let bytes = png(&[(b"IDAT", &TWO_BY_TWO), (b"IHDR", &ihdr(2, 2, 6)), (b"IEND", &[])]);
    let pixels = decode_png_with(&bytes, &DecodeConfig::default(), &mut stored).unwrap();
    assert_eq!(pixels.pixel(1, 1), Some(crate::RGBA8::new(13, 14, 15, 16)));
  }

  #[test]
  fn test_second_ihdr_is_ignored() {
    let bytes = png(&[
      (b"IHDR", &ihdr(2, 2, 6)),
      (b"IHDR", &ihdr(7, 7, 2)),
      (b"IDAT", &TWO_BY_TWO),
      (b"IEND", &[]),
    ]);
    let pixels = decode_png_with(&bytes, &DecodeConfig::default(), &mut stored).unwrap();
    assert_eq!(pixels.width(), 2);
  }

  #[test]
  fn test_bytes_after_iend_are_ignored() {
    let mut bytes = png(&[(b"IHDR", &ihdr(2, 2, 6)), (b"IDAT", &TWO_BY_TWO), (b"IEND", &[])]);
    bytes.extend_from_slice(b"trailing garbage");
    assert!(decode_png_with(&bytes, &DecodeConfig::default(), &mut stored).is_ok());
  }

  #[test]
  fn test_signature_errors() {
    let mut bytes = png(&[(b"IHDR", &ihdr(2, 2, 6)), (b"IDAT", &TWO_BY_TWO), (b"IEND", &[])]);
    bytes[1] = b'p';
    let config = DecodeConfig::default();
    assert_eq!(decode_png_with(&bytes, &config, &mut stored), Err(PngError::SignatureInvalid));
    assert_eq!(
      decode_png_with(&PNG_SIGNATURE[..5], &config, &mut stored),
      Err(PngError::TruncatedStream)
    );
    assert_eq!(decode_png_with(&[], &config, &mut stored), Err(PngError::TruncatedStream));
  }

  #[test]
  fn test_missing_chunks() {
    let config = DecodeConfig::default();
    let no_header = png(&[(b"IDAT", &TWO_BY_TWO), (b"IEND", &[])]);
    assert_eq!(decode_png_with(&no_header, &config, &mut stored), Err(PngError::MissingHeader));
    let no_data = png(&[(b"IHDR", &ihdr(2, 2, 6)), (b"IEND", &[])]);
    assert_eq!(decode_png_with(&no_data, &config, &mut stored), Err(PngError::MissingImageData));
    let no_end = png(&[(b"IHDR", &ihdr(2, 2, 6)), (b"IDAT", &TWO_BY_TWO)]);
    assert_eq!(decode_png_with(&no_end, &config, &mut stored), Err(PngError::TruncatedStream));
  }

  #[test]
  fn test_unsupported_color_type_before_any_idat() {
    let mut bytes = png(&[(b"IHDR", &ihdr(2, 2, 2)), (b"IDAT", &TWO_BY_TWO), (b"IEND", &[])]);
    // a broken IDAT CRC would be the error if the IDAT were ever read
    let idat_crc = 8 + 25 + 8 + TWO_BY_TWO.len();
    bytes[idat_crc] ^= 0xFF;
    let mut session = DecodeSession::new(ByteCursor::new(&bytes), DecodeConfig::default());
    let expected = PngError::UnsupportedProfile(Unsupported::ColorType(2));
    assert_eq!(session.read_to_end(), Err(expected));
    assert_eq!(session.state(), DecodeState::Failed(expected));
    assert_eq!(session.chunks_read(), 1);
  }

  #[test]
  fn test_crc_failure_is_sticky() {
    let mut bytes = png(&[(b"IHDR", &ihdr(2, 2, 6)), (b"IDAT", &TWO_BY_TWO), (b"IEND", &[])]);
    bytes[8 + 8 + 3] ^= 0b1000;
    let mut session = DecodeSession::new(ByteCursor::new(&bytes), DecodeConfig::default());
    let err = session.read_header().unwrap_err();
    assert!(matches!(err, PngError::CrcMismatch { chunk_index: 0, .. }));
    assert_eq!(session.read_to_end(), Err(err));
    assert_eq!(session.decode(&mut stored), Err(err));
  }

  #[test]
  fn test_state_transitions() {
    let bytes = png(&[(b"IHDR", &ihdr(2, 2, 6)), (b"IDAT", &TWO_BY_TWO), (b"IEND", &[])]);
    let mut session = DecodeSession::new(ByteCursor::new(&bytes), DecodeConfig::default());
    assert_eq!(session.state(), DecodeState::Start);
    assert_eq!(session.header(), None);
    let header = session.read_header().unwrap();
    assert_eq!(session.state(), DecodeState::HeaderKnown);
    assert_eq!(session.header(), Some(header));
    assert_eq!(session.read_header(), Ok(header));
    session.read_to_end().unwrap();
    assert_eq!(session.state(), DecodeState::EndSeen);
    assert_eq!(session.chunks_read(), 3);
    assert!(session.decode(&mut stored).is_ok());
  }

  #[test]
  fn test_size_mismatch() {
    let config = DecodeConfig::default();
    let short = png(&[(b"IHDR", &ihdr(2, 2, 6)), (b"IDAT", &TWO_BY_TWO[..17]), (b"IEND", &[])]);
    assert_eq!(
      decode_png_with(&short, &config, &mut stored),
      Err(PngError::SizeMismatch { expected: 18, actual: 17 })
    );
    let mut long_data = TWO_BY_TWO.to_vec();
    long_data.extend_from_slice(&[0; 10]);
    let long = png(&[(b"IHDR", &ihdr(2, 2, 6)), (b"IDAT", &long_data), (b"IEND", &[])]);
    // the inflater was asked for one byte more than expected, and that's all it gave
    assert_eq!(
      decode_png_with(&long, &config, &mut stored),
      Err(PngError::SizeMismatch { expected: 18, actual: 19 })
    );
  }

  #[test]
  fn test_unknown_filter_type_from_session() {
    let mut data = TWO_BY_TWO;
    data[9] = 5;
    let bytes = png(&[(b"IHDR", &ihdr(2, 2, 6)), (b"IDAT", &data), (b"IEND", &[])]);
    assert_eq!(
      decode_png_with(&bytes, &DecodeConfig::default(), &mut stored),
      Err(PngError::UnknownFilterType { row: 1, value: 5 })
    );
  }

  #[test]
  fn test_limits() {
    let bytes = png(&[(b"IHDR", &ihdr(2, 2, 6)), (b"IDAT", &TWO_BY_TWO), (b"IEND", &[])]);
    let narrow = DecodeConfig { max_width: 1, ..DecodeConfig::default() };
    assert_eq!(decode_png_with(&bytes, &narrow, &mut stored), Err(PngError::DimensionsTooLarge));
    let short = DecodeConfig { max_height: 1, ..DecodeConfig::default() };
    assert_eq!(decode_png_with(&bytes, &short, &mut stored), Err(PngError::DimensionsTooLarge));
    let small = DecodeConfig { max_compressed_len: Some(17), ..DecodeConfig::default() };
    assert_eq!(decode_png_with(&bytes, &small, &mut stored), Err(PngError::LimitExceeded));
    let exact = DecodeConfig { max_compressed_len: Some(18), ..DecodeConfig::default() };
    assert!(decode_png_with(&bytes, &exact, &mut stored).is_ok());
    let huge = png(&[(b"IHDR", &ihdr(20_000, 1, 6))]);
    assert_eq!(png_read_header(&huge).map(|h| h.width), Ok(20_000));
    let mut session = DecodeSession::new(ByteCursor::new(&huge), DecodeConfig::default());
    assert_eq!(session.read_header(), Err(PngError::DimensionsTooLarge));
  }

  #[test]
  fn test_png_read_header_stops_at_ihdr() {
    let mut bytes = png(&[(b"tIME", &[0; 7]), (b"IHDR", &ihdr(3, 9, 6))]);
    bytes.extend_from_slice(&[0xFF; 5]);
    let header = png_read_header(&bytes).unwrap();
    assert_eq!((header.width, header.height), (3, 9));
    assert_eq!(png_read_header(&bytes[..20]), Err(PngError::TruncatedStream));
  }

  #[test]
  fn test_inflater_errors_pass_through() {
    let bytes = png(&[(b"IHDR", &ihdr(2, 2, 6)), (b"IDAT", &TWO_BY_TWO), (b"IEND", &[])]);
    let mut broken =
      |_: &[u8], _: usize| -> PngResult<Vec<u8>> { Err(crate::InflateFailure::Corrupt.into()) };
    assert_eq!(
      decode_png_with(&bytes, &DecodeConfig::default(), &mut broken),
      Err(PngError::Decompress(crate::InflateFailure::Corrupt))
    );
  }

  #[test]
  fn test_session_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<DecodeSession<ByteCursor<'static>>>();
    #[cfg(feature = "std")]
    assert_send::<DecodeSession<crate::ReadSource<std::io::BufReader<std::fs::File>>>>();
  }

  #[cfg(feature = "std")]
  #[test]
  fn test_reader_source_matches_slice() {
    let bytes = png(&[
      (b"IHDR", &ihdr(2, 2, 6)),
      (b"IDAT", &TWO_BY_TWO[..3]),
      (b"IDAT", &TWO_BY_TWO[3..]),
      (b"IEND", &[]),
    ]);
    let config = DecodeConfig::default();
    let from_slice = decode_png_with(&bytes, &config, &mut stored);
    let reader = std::io::BufReader::with_capacity(7, &bytes[..]);
    let from_reader = DecodeSession::new(crate::ReadSource::new(reader), config).decode(&mut stored);
    assert_eq!(from_slice, from_reader);
    assert!(from_slice.is_ok());
  }
}
