#![forbid(unsafe_code)]

use alloc::vec::Vec;

use crate::RGBA8;

/// A decoded image: rows of RGBA8 pixels, top to bottom, no padding.
///
/// `bytes.len() == height * stride` and `stride == 4 * width` always hold.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PixelBuffer {
  width: u32,
  height: u32,
  stride: usize,
  bytes: Vec<u8>,
}
impl PixelBuffer {
  /// The caller has already checked `bytes.len() == height * 4 * width`.
  #[inline]
  pub(crate) fn from_parts(width: u32, height: u32, bytes: Vec<u8>) -> Self {
    let stride = width as usize * RGBA8::BYTES;
    debug_assert_eq!(bytes.len(), stride * height as usize);
    Self { width, height, stride, bytes }
  }

  /// Width in pixels.
  #[inline]
  #[must_use]
  pub const fn width(&self) -> u32 {
    self.width
  }

  /// Height in pixels.
  #[inline]
  #[must_use]
  pub const fn height(&self) -> u32 {
    self.height
  }

  /// Bytes per row.
  #[inline]
  #[must_use]
  pub const fn stride(&self) -> usize {
    self.stride
  }

  /// All of the bytes, row after row, `r g b a` per pixel.
  #[inline]
  #[must_use]
  pub fn as_bytes(&self) -> &[u8] {
    &self.bytes
  }

  /// Takes the bytes out of the buffer.
  #[inline]
  #[must_use]
  pub fn into_bytes(self) -> Vec<u8> {
    self.bytes
  }

  /// The bytes of row `y`, or `None` if that's out of bounds.
  #[inline]
  #[must_use]
  pub fn row(&self, y: u32) -> Option<&[u8]> {
    self.bytes.chunks_exact(self.stride).nth(y as usize)
  }

  /// All of the pixels, viewed in place.
  #[inline]
  #[must_use]
  pub fn pixels(&self) -> &[RGBA8] {
    bytemuck::cast_slice(&self.bytes)
  }

  /// Gets the pixel at the position, or `None` if the position is out of
  /// bounds.
  #[inline]
  #[must_use]
  pub fn pixel(&self, x: u32, y: u32) -> Option<RGBA8> {
    if x < self.width && y < self.height {
      let i = y as usize * self.width as usize + x as usize;
      self.pixels().get(i).copied()
    } else {
      None
    }
  }
}
