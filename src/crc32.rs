#![forbid(unsafe_code)]

//! The CRC-32 that PNG uses to protect each chunk.
//!
//! This is the common "ISO-HDLC" CRC-32: reflected polynomial `0xEDB8_8320`,
//! starting from all ones, and inverted at the end. The CRC of a chunk covers
//! the chunk type and chunk data, but *not* the length field.

const CRC_TABLE: [u32; 256] = make_crc_table();

const fn make_crc_table() -> [u32; 256] {
  let mut out = [0; 256];
  let mut n = 0;
  while n < 256 {
    let mut c = n as u32;
    let mut k = 0;
    while k < 8 {
      if (c & 1) != 0 {
        c = 0xEDB8_8320_u32 ^ (c >> 1);
      } else {
        c >>= 1;
      }
      //
      k += 1;
    }
    out[n] = c;
    //
    n += 1;
  }
  out
}

/// Running CRC-32 state, for when the bytes arrive in more than one piece.
///
/// ```
/// # use png_rgba8::*;
/// let mut crc = Crc32::new();
/// crc.update(b"IE");
/// crc.update(b"ND");
/// assert_eq!(crc.finish(), crc32(b"IEND"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc32(u32);
impl Crc32 {
  /// A fresh CRC state.
  #[inline]
  #[must_use]
  pub const fn new() -> Self {
    Self(u32::MAX)
  }

  /// Feeds more bytes into the CRC.
  #[inline]
  pub fn update(&mut self, bytes: &[u8]) {
    for byte in bytes.iter().copied() {
      let i = (self.0 ^ u32::from(byte)) as u8 as usize;
      self.0 = CRC_TABLE[i] ^ (self.0 >> 8);
    }
  }

  /// The CRC of every byte given so far.
  #[inline]
  #[must_use]
  pub const fn finish(self) -> u32 {
    self.0 ^ u32::MAX
  }
}
impl Default for Crc32 {
  #[inline]
  #[must_use]
  fn default() -> Self {
    Self::new()
  }
}

/// Computes the CRC-32 of the bytes given.
#[inline]
#[must_use]
pub fn crc32(bytes: &[u8]) -> u32 {
  let mut crc = Crc32::new();
  crc.update(bytes);
  crc.finish()
}

#[test]
fn test_crc32_known_values() {
  assert_eq!(crc32(b""), 0);
  // the CRC of every IEND chunk ever written
  assert_eq!(crc32(b"IEND"), 0xAE42_6082);
  assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
}

#[test]
fn test_crc32_split_input_matches_whole() {
  let data = b"IHDR\x00\x00\x00\x02\x00\x00\x00\x02\x08\x06\x00\x00\x00";
  for split in 0..data.len() {
    let (head, tail) = data.split_at(split);
    let mut crc = Crc32::default();
    crc.update(head);
    crc.update(tail);
    assert_eq!(crc.finish(), crc32(data), "split at {split}");
  }
}
