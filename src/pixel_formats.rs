//! Module for pixel formats.
//!
//! The decoder only ever outputs one format, [`RGBA8`], which is exactly the
//! byte layout of a decoded truecolor-with-alpha PNG scanline.

use bytemuck::{Pod, Zeroable};

/// An RGBA value, 8-bits per channel.
///
/// The type is `repr(C)` with an alignment of 1, so a byte slice whose length
/// is a multiple of 4 can be viewed as a slice of these with
/// [`bytemuck::cast_slice`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Zeroable, Pod)]
#[repr(C)]
#[allow(missing_docs)]
pub struct RGBA8 {
  pub r: u8,
  pub g: u8,
  pub b: u8,
  pub a: u8,
}
impl RGBA8 {
  /// Bytes per pixel.
  pub const BYTES: usize = 4;

  /// Makes a pixel from its four channel values.
  #[inline]
  #[must_use]
  pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
    Self { r, g, b, a }
  }
}
impl From<[u8; 4]> for RGBA8 {
  #[inline]
  fn from([r, g, b, a]: [u8; 4]) -> Self {
    Self { r, g, b, a }
  }
}
impl From<RGBA8> for [u8; 4] {
  #[inline]
  fn from(RGBA8 { r, g, b, a }: RGBA8) -> Self {
    [r, g, b, a]
  }
}

#[test]
fn test_rgba8_is_four_unaligned_bytes() {
  assert_eq!(core::mem::size_of::<RGBA8>(), RGBA8::BYTES);
  assert_eq!(core::mem::align_of::<RGBA8>(), 1);
  let bytes = [1_u8, 2, 3, 4, 5, 6, 7, 8];
  let pixels: &[RGBA8] = bytemuck::cast_slice(&bytes);
  assert_eq!(pixels, &[RGBA8::new(1, 2, 3, 4), RGBA8::new(5, 6, 7, 8)]);
  assert_eq!(<[u8; 4]>::from(pixels[1]), [5, 6, 7, 8]);
}
