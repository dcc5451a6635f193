#![forbid(unsafe_code)]

use crate::{PngError, PngResult, Unsupported, RGBA8};

/// Image Header
///
/// The fields hold the raw values from the `IHDR` chunk. Any header you get
/// from [`ImageHeader::try_from`] has already been checked to be in the
/// supported profile:
///
/// * `bit_depth == 8`
/// * `color_type == 6` (RGBA)
/// * `compression_method == 0`
/// * `filter_method == 0`
/// * `interlace_method == 0`
/// * `width` and `height` are both non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageHeader {
  /// width in pixels
  pub width: u32,
  /// height in pixels
  pub height: u32,
  /// bits per channel
  pub bit_depth: u8,
  /// pixel color type
  pub color_type: u8,
  /// always 0 (zlib deflate) in any legal PNG
  pub compression_method: u8,
  /// always 0 (adaptive filtering) in any legal PNG
  pub filter_method: u8,
  /// 0 for none, 1 for Adam7
  pub interlace_method: u8,
}
impl ImageHeader {
  /// Length of the `IHDR` chunk's data.
  pub const CHUNK_LEN: usize = 13;
  /// The only supported color type: truecolor with alpha.
  pub const COLOR_TYPE_RGBA: u8 = 6;
  /// The only supported bit depth.
  pub const BIT_DEPTH_8: u8 = 8;

  /// Bytes of pixel data per scanline, not counting the filter type byte.
  ///
  /// ## Failure
  /// * [`PngError::DimensionsTooLarge`] if this doesn't fit in `usize`.
  #[inline]
  pub fn stride(&self) -> PngResult<usize> {
    (self.width as usize).checked_mul(RGBA8::BYTES).ok_or(PngError::DimensionsTooLarge)
  }

  /// Exact size of the inflated (still filtered) image data:
  /// `height * (1 + stride)`.
  ///
  /// ## Failure
  /// * [`PngError::DimensionsTooLarge`] if this doesn't fit in `usize`.
  #[inline]
  pub fn filtered_len(&self) -> PngResult<usize> {
    self
      .stride()?
      .checked_add(1)
      .and_then(|filterline| filterline.checked_mul(self.height as usize))
      .ok_or(PngError::DimensionsTooLarge)
  }

  /// Size of the final pixel data: `height * stride`.
  ///
  /// ## Failure
  /// * [`PngError::DimensionsTooLarge`] if this doesn't fit in `usize`.
  #[inline]
  pub fn pixel_buffer_len(&self) -> PngResult<usize> {
    self.stride()?.checked_mul(self.height as usize).ok_or(PngError::DimensionsTooLarge)
  }

  /// Checks the fields against the supported profile.
  ///
  /// The checks happen in a fixed order, and the first failing one is
  /// reported: compression method, filter method, color type, bit depth,
  /// interlace method, then the dimensions.
  pub fn check_profile(&self) -> PngResult<()> {
    if self.compression_method != 0 {
      return Err(Unsupported::Compression(self.compression_method).into());
    }
    if self.filter_method != 0 {
      return Err(Unsupported::FilterMethod(self.filter_method).into());
    }
    if self.color_type != Self::COLOR_TYPE_RGBA {
      return Err(Unsupported::ColorType(self.color_type).into());
    }
    if self.bit_depth != Self::BIT_DEPTH_8 {
      return Err(Unsupported::BitDepth(self.bit_depth).into());
    }
    if self.interlace_method != 0 {
      return Err(Unsupported::Interlacing(self.interlace_method).into());
    }
    if self.width == 0 || self.height == 0 {
      return Err(PngError::WidthOrHeightZero);
    }
    Ok(())
  }
}

/// Parses and checks the 13 data bytes of an `IHDR` chunk.
impl TryFrom<&[u8]> for ImageHeader {
  type Error = PngError;
  fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
    match value {
      [w0, w1, w2, w3, h0, h1, h2, h3, bit_depth, color_type, compression_method, filter_method, interlace_method] =>
      {
        let header = Self {
          width: u32::from_be_bytes([*w0, *w1, *w2, *w3]),
          height: u32::from_be_bytes([*h0, *h1, *h2, *h3]),
          bit_depth: *bit_depth,
          color_type: *color_type,
          compression_method: *compression_method,
          filter_method: *filter_method,
          interlace_method: *interlace_method,
        };
        header.check_profile()?;
        Ok(header)
      }
      _ => Err(PngError::WrongChunkLength { expected: Self::CHUNK_LEN, actual: value.len() }),
    }
  }
}

#[cfg(test)]
const fn ihdr_bytes(
  width: u32, height: u32, bit_depth: u8, color_type: u8, methods: [u8; 3],
) -> [u8; 13] {
  let w = width.to_be_bytes();
  let h = height.to_be_bytes();
  [
    w[0], w[1], w[2], w[3], h[0], h[1], h[2], h[3], bit_depth, color_type, methods[0],
    methods[1], methods[2],
  ]
}

#[test]
fn test_ihdr_parses_big_endian_dimensions() {
  let header = ImageHeader::try_from(&ihdr_bytes(0x0102_0304, 7, 8, 6, [0, 0, 0])[..]).unwrap();
  assert_eq!(header.width, 0x0102_0304);
  assert_eq!(header.height, 7);
  assert_eq!(header.stride(), Ok(0x0102_0304 * 4));
}

#[test]
fn test_ihdr_wrong_length() {
  let bytes = ihdr_bytes(1, 1, 8, 6, [0, 0, 0]);
  assert_eq!(
    ImageHeader::try_from(&bytes[..12]),
    Err(PngError::WrongChunkLength { expected: 13, actual: 12 })
  );
  let mut long = [0_u8; 14];
  long[..13].copy_from_slice(&bytes);
  assert_eq!(
    ImageHeader::try_from(&long[..]),
    Err(PngError::WrongChunkLength { expected: 13, actual: 14 })
  );
}

#[test]
fn test_ihdr_rejects_each_unsupported_field() {
  use Unsupported::*;
  let check = |bytes: [u8; 13]| ImageHeader::try_from(&bytes[..]);
  assert_eq!(check(ihdr_bytes(1, 1, 8, 6, [1, 0, 0])), Err(PngError::from(Compression(1))));
  assert_eq!(check(ihdr_bytes(1, 1, 8, 6, [0, 1, 0])), Err(PngError::from(FilterMethod(1))));
  assert_eq!(check(ihdr_bytes(1, 1, 8, 2, [0, 0, 0])), Err(PngError::from(ColorType(2))));
  assert_eq!(check(ihdr_bytes(1, 1, 16, 6, [0, 0, 0])), Err(PngError::from(BitDepth(16))));
  assert_eq!(check(ihdr_bytes(1, 1, 8, 6, [0, 0, 1])), Err(PngError::from(Interlacing(1))));
  // compression is checked before color type
  assert_eq!(check(ihdr_bytes(1, 1, 8, 3, [2, 0, 0])), Err(PngError::from(Compression(2))));
}

#[test]
fn test_ihdr_rejects_zero_dimensions() {
  assert_eq!(
    ImageHeader::try_from(&ihdr_bytes(0, 5, 8, 6, [0, 0, 0])[..]),
    Err(PngError::WidthOrHeightZero)
  );
  assert_eq!(
    ImageHeader::try_from(&ihdr_bytes(5, 0, 8, 6, [0, 0, 0])[..]),
    Err(PngError::WidthOrHeightZero)
  );
}

#[test]
fn test_ihdr_sizes() {
  let header = ImageHeader::try_from(&ihdr_bytes(2, 3, 8, 6, [0, 0, 0])[..]).unwrap();
  assert_eq!(header.stride(), Ok(8));
  assert_eq!(header.filtered_len(), Ok(27));
  assert_eq!(header.pixel_buffer_len(), Ok(24));
}
