#![forbid(unsafe_code)]

//! Sequential byte input for the decoder.
//!
//! The chunk reader never needs random access, it only ever asks for "the next
//! N bytes" and "is there anything left?". That's what [`ByteSource`] offers.

use crate::{PngError, PngResult};

/// Something that hands out bytes in order.
pub trait ByteSource {
  /// Fills all of `buf` with the next bytes of the source.
  ///
  /// ## Failure
  /// * [`PngError::TruncatedStream`] if the source runs out first. What was
  ///   left in the source is consumed in that case.
  fn read_exact(&mut self, buf: &mut [u8]) -> PngResult<()>;

  /// Checks if the source has no more bytes, without consuming any.
  fn is_at_end(&mut self) -> PngResult<bool>;

  /// How many bytes have been consumed so far.
  fn position(&self) -> u64;

  /// How many bytes are left, if the source knows that.
  ///
  /// Sources that can answer this let the chunk reader reject a chunk whose
  /// declared length can't possibly be satisfied before allocating a buffer
  /// for it.
  #[inline]
  fn remaining_hint(&self) -> Option<u64> {
    None
  }

  /// Reads the next `N` bytes as an array.
  #[inline]
  fn read_array<const N: usize>(&mut self) -> PngResult<[u8; N]>
  where
    Self: Sized,
  {
    let mut a = [0_u8; N];
    self.read_exact(&mut a)?;
    Ok(a)
  }

  /// Reads the next 4 bytes as a big-endian `u32`.
  #[inline]
  fn read_u32_be(&mut self) -> PngResult<u32>
  where
    Self: Sized,
  {
    self.read_array::<4>().map(u32::from_be_bytes)
  }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
  #[inline]
  fn read_exact(&mut self, buf: &mut [u8]) -> PngResult<()> {
    (**self).read_exact(buf)
  }
  #[inline]
  fn is_at_end(&mut self) -> PngResult<bool> {
    (**self).is_at_end()
  }
  #[inline]
  fn position(&self) -> u64 {
    (**self).position()
  }
  #[inline]
  fn remaining_hint(&self) -> Option<u64> {
    (**self).remaining_hint()
  }
}

/// A [`ByteSource`] over a byte slice that's already in memory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ByteCursor<'b> {
  spare: &'b [u8],
  position: usize,
}
impl<'b> ByteCursor<'b> {
  /// Makes a cursor at the start of the bytes.
  #[inline]
  #[must_use]
  pub const fn new(bytes: &'b [u8]) -> Self {
    Self { spare: bytes, position: 0 }
  }

  /// The bytes that haven't been read yet.
  #[inline]
  #[must_use]
  pub const fn remaining(&self) -> &'b [u8] {
    self.spare
  }
}
impl<'b> From<&'b [u8]> for ByteCursor<'b> {
  #[inline]
  fn from(bytes: &'b [u8]) -> Self {
    Self::new(bytes)
  }
}
impl ByteSource for ByteCursor<'_> {
  #[inline]
  fn read_exact(&mut self, buf: &mut [u8]) -> PngResult<()> {
    if self.spare.len() < buf.len() {
      self.position += self.spare.len();
      self.spare = &[];
      return Err(PngError::TruncatedStream);
    }
    let (head, rest) = self.spare.split_at(buf.len());
    buf.copy_from_slice(head);
    self.spare = rest;
    self.position += buf.len();
    Ok(())
  }
  #[inline]
  fn is_at_end(&mut self) -> PngResult<bool> {
    Ok(self.spare.is_empty())
  }
  #[inline]
  fn position(&self) -> u64 {
    self.position as u64
  }
  #[inline]
  fn remaining_hint(&self) -> Option<u64> {
    Some(self.spare.len() as u64)
  }
}

/// A [`ByteSource`] over any buffered reader.
///
/// Wrap an unbuffered reader (such as a `File`) in a
/// [`BufReader`](std::io::BufReader) first.
#[cfg(feature = "std")]
#[cfg_attr(docs_rs, doc(cfg(feature = "std")))]
#[derive(Debug)]
pub struct ReadSource<R> {
  reader: R,
  position: u64,
}
#[cfg(feature = "std")]
impl<R: std::io::BufRead> ReadSource<R> {
  /// Wraps the reader.
  #[inline]
  #[must_use]
  pub const fn new(reader: R) -> Self {
    Self { reader, position: 0 }
  }

  /// Unwraps the reader.
  #[inline]
  #[must_use]
  pub fn into_inner(self) -> R {
    self.reader
  }
}
#[cfg(feature = "std")]
impl<R: std::io::BufRead> ByteSource for ReadSource<R> {
  fn read_exact(&mut self, buf: &mut [u8]) -> PngResult<()> {
    let mut filled = 0;
    while filled < buf.len() {
      match self.reader.read(&mut buf[filled..]) {
        Ok(0) => {
          self.position += filled as u64;
          return Err(PngError::TruncatedStream);
        }
        Ok(n) => filled += n,
        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
        Err(e) => {
          self.position += filled as u64;
          return Err(e.into());
        }
      }
    }
    self.position += filled as u64;
    Ok(())
  }
  fn is_at_end(&mut self) -> PngResult<bool> {
    loop {
      match self.reader.fill_buf() {
        Ok(available) => return Ok(available.is_empty()),
        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
        Err(e) => return Err(e.into()),
      }
    }
  }
  #[inline]
  fn position(&self) -> u64 {
    self.position
  }
}

#[test]
fn test_byte_cursor_reads_in_order() {
  let mut cursor = ByteCursor::new(&[0, 0, 1, 2, 9, 8]);
  assert_eq!(cursor.read_u32_be(), Ok(0x0102));
  assert_eq!(cursor.position(), 4);
  assert_eq!(cursor.remaining_hint(), Some(2));
  assert_eq!(cursor.is_at_end(), Ok(false));
  assert_eq!(cursor.read_array::<2>(), Ok([9, 8]));
  assert_eq!(cursor.is_at_end(), Ok(true));
  assert_eq!(cursor.position(), 6);
}

#[test]
fn test_byte_cursor_short_read_is_truncation() {
  let mut cursor = ByteCursor::new(&[1, 2, 3]);
  assert_eq!(cursor.read_u32_be(), Err(PngError::TruncatedStream));
  assert_eq!(cursor.is_at_end(), Ok(true));
  assert_eq!(cursor.position(), 3);
  let mut empty = ByteCursor::new(&[]);
  assert_eq!(empty.read_array::<0>(), Ok([]));
  assert_eq!(empty.read_array::<1>(), Err(PngError::TruncatedStream));
}

#[cfg(feature = "std")]
#[test]
fn test_read_source_matches_cursor() {
  let data: &[u8] = &[0, 0, 0, 7, 1, 2, 3];
  let mut source = ReadSource::new(std::io::BufReader::with_capacity(2, data));
  assert_eq!(source.is_at_end(), Ok(false));
  assert_eq!(source.read_u32_be(), Ok(7));
  assert_eq!(source.read_array::<2>(), Ok([1, 2]));
  assert_eq!(source.position(), 6);
  assert_eq!(source.read_array::<2>(), Err(PngError::TruncatedStream));
  assert_eq!(source.is_at_end(), Ok(true));
}

#[cfg(feature = "std")]
#[test]
fn test_read_source_retries_interrupts_and_reports_io_errors() {
  use std::io::{ErrorKind, Read};
  use std::vec::Vec;
  /// Hands out one scripted step per `read` call.
  struct Scripted(std::collections::VecDeque<Result<Vec<u8>, ErrorKind>>);
  impl Read for Scripted {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
      match self.0.pop_front() {
        None => Ok(0),
        Some(Err(kind)) => Err(kind.into()),
        Some(Ok(mut bytes)) => {
          let n = bytes.len().min(buf.len());
          buf[..n].copy_from_slice(&bytes[..n]);
          if n < bytes.len() {
            self.0.push_front(Ok(bytes.split_off(n)));
          }
          Ok(n)
        }
      }
    }
  }
  let script = Scripted(
    [
      Ok(std::vec![0, 0, 0, 7]),
      Err(ErrorKind::Interrupted),
      Ok(std::vec![1, 2]),
      Err(ErrorKind::Other),
    ]
    .into_iter()
    .collect(),
  );
  // a 1 byte buffer passes every read of 1 byte or more straight through
  let mut source = ReadSource::new(std::io::BufReader::with_capacity(1, script));
  assert_eq!(source.read_u32_be(), Ok(7));
  assert_eq!(source.position(), 4);
  assert_eq!(source.read_array::<4>(), Err(PngError::Io(ErrorKind::Other)));
  assert_eq!(source.position(), 6);
}
