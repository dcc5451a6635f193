#![no_std]
#![cfg_attr(docs_rs, feature(doc_cfg))]
#![warn(missing_docs)]

//! A crate for decoding PNG data into RGBA8 pixels.
//!
//! * [Portable Network Graphics Specification (Second Edition)][png-spec]
//!
//! [png-spec]: https://www.w3.org/TR/2003/REC-PNG-20031110/
//!
//! This is a deliberately narrow decoder. It accepts exactly one PNG profile:
//! truecolor with alpha, 8 bits per channel, not interlaced. Everything else
//! is rejected with a [`PngError::UnsupportedProfile`] error rather than being
//! decoded approximately.
//!
//! ## Automatic Decoding
//!
//! Just call [`decode_png`] on the bytes of a PNG file and you get back a
//! [`PixelBuffer`]. This requires the `alloc` and `miniz_oxide` features.
//! With the `std` feature you can also use [`decode_png_reader`] and
//! [`decode_png_file`].
//!
//! ## Decoding Step By Step
//!
//! The automatic functions are thin wrappers over a [`DecodeSession`], which
//! drives each stage in order:
//!
//! 1) The 8 byte signature is checked.
//! 2) Chunks are read one at a time by a [`ChunkReader`]. Every chunk's CRC is
//!    checked, and a bad CRC ends the whole decode.
//! 3) The first `IHDR` chunk becomes the [`ImageHeader`].
//! 4) All `IDAT` chunks are concatenated by an [`IdatAssembler`]. PNG allows
//!    any number of them, and they form a single zlib stream.
//! 5) At `IEND` the zlib stream is inflated (see [`ZlibInflate`]) and must be
//!    exactly `height * (1 + stride)` bytes.
//! 6) The scanlines are unfiltered by [`defilter`] into the final pixels.
//!
//! Each of those pieces is public, so you can also drive them yourself.
//!
//! ## Errors
//!
//! Unlike a lenient viewer, this decoder treats every problem as fatal. There
//! is no partial image on failure: you get a [`PngError`] describing the first
//! thing that went wrong.
//!
//! ## Logging
//!
//! The crate emits diagnostics through the [`log`] facade. No logger is
//! installed by the library.

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

#[cfg(target_pointer_width = "16")]
compile_error!("this crate assumes 32-bit or bigger pointers!");

mod error;
pub use error::*;

mod pixel_formats;
pub use pixel_formats::*;

mod crc32;
pub use crc32::*;

mod byte_source;
pub use byte_source::*;

mod ihdr;
pub use ihdr::*;

mod unfilter;
pub use unfilter::*;

#[cfg(feature = "alloc")]
mod chunk;
#[cfg(feature = "alloc")]
pub use chunk::*;

#[cfg(feature = "alloc")]
mod idat;
#[cfg(feature = "alloc")]
pub use idat::*;

#[cfg(feature = "alloc")]
mod inflate;
#[cfg(feature = "alloc")]
pub use inflate::*;

#[cfg(feature = "alloc")]
mod pixel_buffer;
#[cfg(feature = "alloc")]
pub use pixel_buffer::*;

#[cfg(feature = "alloc")]
mod session;
#[cfg(feature = "alloc")]
pub use session::*;

/// The 8 bytes that every PNG data stream starts with.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Checks if the PNG's initial 8 bytes are correct.
///
/// * If this is the case, the rest of the bytes are very likely PNG data.
/// * If this is *not* the case, the rest of the bytes are very likely *not* PNG
///   data.
#[inline]
#[must_use]
pub const fn is_png_signature_correct(bytes: &[u8]) -> bool {
  matches!(bytes, [137, 80, 78, 71, 13, 10, 26, 10, ..])
}

#[test]
fn test_is_png_signature_correct() {
  assert!(is_png_signature_correct(&PNG_SIGNATURE));
  assert!(is_png_signature_correct(&[137, 80, 78, 71, 13, 10, 26, 10, 0, 0]));
  assert!(!is_png_signature_correct(&[137, 80, 78, 71, 13, 10, 26]));
  assert!(!is_png_signature_correct(b"GIF89a\0\0"));
}
