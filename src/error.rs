use core::fmt;

/// An IHDR field value that this decoder refuses to handle.
///
/// Each variant holds the value that was found in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Unsupported {
  /// Compression method other than 0 (deflate).
  Compression(u8),
  /// Filter method other than 0 (adaptive).
  FilterMethod(u8),
  /// Color type other than 6 (truecolor with alpha).
  ColorType(u8),
  /// Bit depth other than 8.
  BitDepth(u8),
  /// Interlace method other than 0 (no interlace).
  Interlacing(u8),
}

/// Why the zlib stream couldn't be inflated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InflateFailure {
  /// The compressed data ended before the zlib stream did.
  UnexpectedEnd,
  /// The compressed data is not a valid zlib stream.
  Corrupt,
  /// The stream inflated fine but the Adler-32 checksum didn't match.
  Adler32Mismatch,
  /// The decompressor reported some other problem.
  Other,
}

/// An error from the `png_rgba8` crate.
///
/// Every error is terminal for the decode that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum PngError {
  /// The first 8 bytes are not the PNG signature.
  SignatureInvalid,

  /// The data ended in the middle of something.
  TruncatedStream,

  /// The CRC stored after a chunk doesn't match the chunk's type and data.
  CrcMismatch {
    /// The CRC value stored in the stream.
    expected: u32,
    /// The CRC we computed over the chunk type and data.
    computed: u32,
    /// Index of the chunk, counting from 0 after the signature.
    chunk_index: usize,
  },

  /// A chunk declared a length above the PNG limit of `2^31 - 1`.
  ChunkLengthOutOfRange {
    /// The declared length.
    length: u32,
    /// Index of the chunk, counting from 0 after the signature.
    chunk_index: usize,
  },

  /// A chunk with a fixed size had the wrong amount of data.
  WrongChunkLength {
    /// The length that chunk type must have.
    expected: usize,
    /// The length that was found.
    actual: usize,
  },

  /// The image uses a PNG feature outside of the supported profile.
  UnsupportedProfile(Unsupported),

  /// The declared width and/or height of this image is 0.
  WidthOrHeightZero,

  /// The image is larger than the configured limits, or too large to address.
  DimensionsTooLarge,

  /// The compressed image data is larger than the configured limit.
  LimitExceeded,

  /// The stream ended (`IEND`) without any `IHDR` chunk.
  MissingHeader,

  /// The stream ended (`IEND`) without any `IDAT` chunk.
  MissingImageData,

  /// A scanline started with a filter type byte outside of `0..=4`.
  UnknownFilterType {
    /// The scanline.
    row: u32,
    /// The filter type byte.
    value: u8,
  },

  /// The filtered data given to the unfilter step is too short.
  TruncatedImageData {
    /// Bytes required by the header.
    expected: usize,
    /// Bytes given.
    actual: usize,
  },

  /// The output buffer given for unfiltering isn't `height * stride` bytes.
  OutputBufferWrongSize {
    /// Bytes required by the header.
    expected: usize,
    /// Bytes given.
    actual: usize,
  },

  /// The zlib stream of the image data couldn't be inflated.
  Decompress(InflateFailure),

  /// The inflated data isn't exactly the size the header calls for.
  ///
  /// When the inflated data is too long, `actual` is only a lower bound: the
  /// decoder stops inflating once it knows the size is wrong.
  SizeMismatch {
    /// Bytes required by the header.
    expected: usize,
    /// Bytes produced by inflation.
    actual: usize,
  },

  /// The allocator couldn't give us enough space.
  AllocationFailure,

  /// Reading from the underlying source failed.
  #[cfg(feature = "std")]
  #[cfg_attr(docs_rs, doc(cfg(feature = "std")))]
  Io(std::io::ErrorKind),
}

/// Result alias for this crate.
pub type PngResult<T> = Result<T, PngError>;

#[cfg(feature = "alloc")]
impl From<alloc::collections::TryReserveError> for PngError {
  #[inline]
  fn from(_: alloc::collections::TryReserveError) -> Self {
    Self::AllocationFailure
  }
}

impl From<Unsupported> for PngError {
  #[inline]
  fn from(unsupported: Unsupported) -> Self {
    Self::UnsupportedProfile(unsupported)
  }
}

impl From<InflateFailure> for PngError {
  #[inline]
  fn from(failure: InflateFailure) -> Self {
    Self::Decompress(failure)
  }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for PngError {
  #[inline]
  fn from(e: std::io::Error) -> Self {
    match e.kind() {
      std::io::ErrorKind::UnexpectedEof => Self::TruncatedStream,
      kind => Self::Io(kind),
    }
  }
}

impl fmt::Display for Unsupported {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Unsupported::Compression(v) => write!(f, "compression method {v}"),
      Unsupported::FilterMethod(v) => write!(f, "filter method {v}"),
      Unsupported::ColorType(v) => write!(f, "color type {v} (only 6, RGBA, is supported)"),
      Unsupported::BitDepth(v) => write!(f, "bit depth {v} (only 8 is supported)"),
      Unsupported::Interlacing(v) => write!(f, "interlace method {v}"),
    }
  }
}

impl fmt::Display for InflateFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      InflateFailure::UnexpectedEnd => "zlib stream ended early",
      InflateFailure::Corrupt => "zlib stream is corrupt",
      InflateFailure::Adler32Mismatch => "zlib Adler-32 checksum mismatch",
      InflateFailure::Other => "zlib decompression failed",
    })
  }
}

impl fmt::Display for PngError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PngError::SignatureInvalid => write!(f, "not PNG data: the signature is wrong"),
      PngError::TruncatedStream => write!(f, "the PNG data ended unexpectedly"),
      PngError::CrcMismatch { expected, computed, chunk_index } => write!(
        f,
        "chunk {chunk_index} failed its CRC check: stored {expected:#010X}, computed {computed:#010X}"
      ),
      PngError::ChunkLengthOutOfRange { length, chunk_index } => {
        write!(f, "chunk {chunk_index} declares an illegal length of {length}")
      }
      PngError::WrongChunkLength { expected, actual } => {
        write!(f, "chunk has {actual} bytes of data, expected {expected}")
      }
      PngError::UnsupportedProfile(u) => write!(f, "unsupported PNG profile: {u}"),
      PngError::WidthOrHeightZero => write!(f, "image width or height is 0"),
      PngError::DimensionsTooLarge => write!(f, "image dimensions are too large"),
      PngError::LimitExceeded => write!(f, "compressed image data exceeds the configured limit"),
      PngError::MissingHeader => write!(f, "no IHDR chunk before IEND"),
      PngError::MissingImageData => write!(f, "no IDAT chunk before IEND"),
      PngError::UnknownFilterType { row, value } => {
        write!(f, "scanline {row} has unknown filter type {value}")
      }
      PngError::TruncatedImageData { expected, actual } => {
        write!(f, "filtered image data is {actual} bytes, expected {expected}")
      }
      PngError::OutputBufferWrongSize { expected, actual } => {
        write!(f, "output buffer is {actual} bytes, expected {expected}")
      }
      PngError::Decompress(failure) => write!(f, "{failure}"),
      PngError::SizeMismatch { expected, actual } => {
        write!(f, "image data inflated to {actual} bytes, expected {expected}")
      }
      PngError::AllocationFailure => write!(f, "allocation failed"),
      #[cfg(feature = "std")]
      PngError::Io(kind) => write!(f, "I/O error: {kind}"),
    }
  }
}

#[cfg(feature = "std")]
impl std::error::Error for PngError {}
