#![forbid(unsafe_code)]

//! Reverses the per-scanline filtering that PNG applies before compression.
//!
//! From the PNG spec:
//!
//! > Filters are applied to **bytes**, not to pixels, regardless of the bit
//! > depth or color type of the image.
//!
//! Each byte is predicted from up to three already-reconstructed neighbors:
//!
//! ```text
//! c b
//! a x
//! ```
//!
//! * `a` is the same channel of the pixel to the left (4 bytes back).
//! * `b` is the same byte in the scanline above.
//! * `c` is the same channel of the pixel above and to the left.
//!
//! Neighbors that fall outside of the image count as 0.

use crate::{ImageHeader, PngError, PngResult, RGBA8};

/// The filter type that starts each scanline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum FilterType {
  /// The bytes are stored as-is.
  None = 0,
  /// Each byte is stored as the difference from `a`.
  Sub = 1,
  /// Each byte is stored as the difference from `b`.
  Up = 2,
  /// Each byte is stored as the difference from the floor of the average of
  /// `a` and `b`.
  Average = 3,
  /// Each byte is stored as the difference from the [`paeth_predictor`].
  Paeth = 4,
}
impl TryFrom<u8> for FilterType {
  /// The byte given, when it's not a filter type.
  type Error = u8;
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0 => Self::None,
      1 => Self::Sub,
      2 => Self::Up,
      3 => Self::Average,
      4 => Self::Paeth,
      other => return Err(other),
    })
  }
}

/// The Paeth filter function computes a simple linear function of the three
/// neighboring bytes (left `a`, above `b`, upper left `c`).
///
/// The output is the neighbor closest to `a + b - c`. Ties go to `a`, then
/// `b`, then `c`.
#[inline]
#[must_use]
pub const fn paeth_predictor(a: u8, b: u8, c: u8) -> u8 {
  // Note: "The calculations within the PaethPredictor function shall be
  // performed exactly, without overflow." i32 is wide enough for any u8 inputs.
  let a_ = a as i32;
  let b_ = b as i32;
  let c_ = c as i32;
  let p: i32 = a_ + b_ - c_;
  let pa = (p - a_).abs();
  let pb = (p - b_).abs();
  let pc = (p - c_).abs();
  // The order of these tests must not change.
  if pa <= pb && pa <= pc {
    a
  } else if pb <= pc {
    b
  } else {
    c
  }
}

/// Reconstruct Filter Type 1
///
/// * `fx` filtered X
/// * `ra` reconstructed `a`
#[inline]
const fn reconstruct_sub(fx: u8, ra: u8) -> u8 {
  fx.wrapping_add(ra)
}

/// Reconstruct Filter Type 2
///
/// * `fx` filtered X
/// * `rb` reconstructed `b`
#[inline]
const fn reconstruct_up(fx: u8, rb: u8) -> u8 {
  fx.wrapping_add(rb)
}

/// Reconstruct Filter Type 3
///
/// * `fx` filtered X
/// * `ra` reconstructed `a`
/// * `rb` reconstructed `b`
///
/// The average is taken without overflow, then truncated back to a byte.
#[inline]
const fn reconstruct_average(fx: u8, ra: u8, rb: u8) -> u8 {
  fx.wrapping_add(((ra as u16 + rb as u16) / 2) as u8)
}

/// Reconstruct Filter Type 4
///
/// * `fx` filtered X
/// * `ra` reconstructed `a`
/// * `rb` reconstructed `b`
/// * `rc` reconstructed `c`
#[inline]
const fn reconstruct_paeth(fx: u8, ra: u8, rb: u8, rc: u8) -> u8 {
  fx.wrapping_add(paeth_predictor(ra, rb, rc))
}

/// Unfilters one scanline.
///
/// * `line` is the filtered bytes, without the filter type byte.
/// * `prior` is the reconstructed scanline above, or `None` on the top row.
/// * `out` gets the reconstructed bytes, and must be as long as `line`.
fn unfilter_line(filter: FilterType, line: &[u8], prior: Option<&[u8]>, out: &mut [u8]) {
  const BPP: usize = RGBA8::BYTES;
  debug_assert_eq!(line.len(), out.len());
  let above = |i: usize| prior.map_or(0, |p| p[i]);
  match filter {
    FilterType::None => out.copy_from_slice(line),
    FilterType::Sub => {
      for i in 0..line.len() {
        let a = if i >= BPP { out[i - BPP] } else { 0 };
        out[i] = reconstruct_sub(line[i], a);
      }
    }
    FilterType::Up => match prior {
      Some(prior) => {
        for ((x, fx), b) in out.iter_mut().zip(line.iter().copied()).zip(prior.iter().copied()) {
          *x = reconstruct_up(fx, b);
        }
      }
      // on the top row the "previous line" is an implied zero.
      None => out.copy_from_slice(line),
    },
    FilterType::Average => {
      for i in 0..line.len() {
        let a = if i >= BPP { out[i - BPP] } else { 0 };
        out[i] = reconstruct_average(line[i], a, above(i));
      }
    }
    FilterType::Paeth => {
      for i in 0..line.len() {
        let (a, c) = if i >= BPP { (out[i - BPP], above(i - BPP)) } else { (0, 0) };
        out[i] = reconstruct_paeth(line[i], a, above(i), c);
      }
    }
  }
}

/// Unfilters the `filtered` scanlines of an image into `out`.
///
/// This is the allocation-free core of [`defilter`], for when you'd rather
/// provide the output memory yourself. `out` must be exactly `height * stride`
/// bytes. Extra bytes on the end of `filtered` are not looked at.
///
/// ## Failure
/// * Anything from [`ImageHeader::check_profile`], since the header's fields
///   are public and could have been changed after parsing.
/// * [`PngError::OutputBufferWrongSize`] if `out` is the wrong size.
/// * [`PngError::TruncatedImageData`] if `filtered` has fewer than `height * (1
///   + stride)` bytes.
/// * [`PngError::UnknownFilterType`] at the first bad scanline. The rows above
///   it have been written to `out` by then, so don't use `out` after an error.
///
/// Nothing is written to `out` unless the error is an unknown filter type.
pub fn unfilter_to_slice(filtered: &[u8], header: &ImageHeader, out: &mut [u8]) -> PngResult<()> {
  header.check_profile()?;
  let stride = header.stride()?;
  let expected = header.filtered_len()?;
  let out_len = header.pixel_buffer_len()?;
  if out.len() != out_len {
    return Err(PngError::OutputBufferWrongSize { expected: out_len, actual: out.len() });
  }
  if filtered.len() < expected {
    return Err(PngError::TruncatedImageData { expected, actual: filtered.len() });
  }
  let mut prior: Option<&mut [u8]> = None;
  let rows = filtered[..expected].chunks_exact(stride + 1).zip(out.chunks_exact_mut(stride));
  for (y, (filterline, row)) in rows.enumerate() {
    let (filter_byte, line) = (filterline[0], &filterline[1..]);
    let filter = FilterType::try_from(filter_byte)
      .map_err(|value| PngError::UnknownFilterType { row: y as u32, value })?;
    unfilter_line(filter, line, prior.as_deref(), row);
    prior = Some(row);
  }
  Ok(())
}

/// Turns the inflated (but still filtered) image data into final pixels.
///
/// The output buffer is allocated once at its full size. No buffer is
/// returned on failure, not even a partial one.
///
/// ## Failure
/// * [`PngError::TruncatedImageData`] if `filtered` is shorter than
///   `height * (1 + stride)`.
/// * [`PngError::UnknownFilterType`] if any scanline has a filter type byte
///   outside of `0..=4`.
/// * [`PngError::AllocationFailure`] if the output can't be allocated.
#[cfg(feature = "alloc")]
pub fn defilter(filtered: &[u8], header: &ImageHeader) -> PngResult<crate::PixelBuffer> {
  use alloc::vec::Vec;
  let len = header.pixel_buffer_len()?;
  let expected = header.filtered_len()?;
  if filtered.len() < expected {
    return Err(PngError::TruncatedImageData { expected, actual: filtered.len() });
  }
  let mut bytes: Vec<u8> = Vec::new();
  bytes.try_reserve_exact(len)?;
  bytes.resize(len, 0);
  unfilter_to_slice(filtered, header, &mut bytes)?;
  Ok(crate::PixelBuffer::from_parts(header.width, header.height, bytes))
}
