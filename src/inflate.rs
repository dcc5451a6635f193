#![forbid(unsafe_code)]

use alloc::vec::Vec;

use crate::PngResult;

/// A zlib decompressor.
///
/// The decoder always knows from the header how many bytes the image data
/// should inflate to, so it asks for a little more than that and checks the
/// length of what comes back.
pub trait ZlibInflate {
  /// Inflates a complete zlib stream (header, deflate data, Adler-32).
  ///
  /// The output must never be longer than `size_limit`. If the stream holds
  /// more data than that, return exactly the first `size_limit` bytes.
  ///
  /// ## Failure
  /// * [`PngError::Decompress`](crate::PngError::Decompress) if the stream is
  ///   broken.
  /// * [`PngError::AllocationFailure`](crate::PngError::AllocationFailure) if
  ///   the output can't be allocated.
  fn inflate(&mut self, compressed: &[u8], size_limit: usize) -> PngResult<Vec<u8>>;
}

impl<F> ZlibInflate for F
where
  F: FnMut(&[u8], usize) -> PngResult<Vec<u8>>,
{
  #[inline]
  fn inflate(&mut self, compressed: &[u8], size_limit: usize) -> PngResult<Vec<u8>> {
    self(compressed, size_limit)
  }
}

/// How big the output buffer of [`MinizInflater`] starts out, at least.
#[cfg(feature = "miniz_oxide")]
const MIN_OUTPUT_LEN: usize = 64 * 1024;

/// Inflates with `miniz_oxide`.
///
/// The output buffer grows as the stream produces data, so the `size_limit`
/// is only a cap and is never allocated up front.
#[cfg(feature = "miniz_oxide")]
#[cfg_attr(docs_rs, doc(cfg(feature = "miniz_oxide")))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MinizInflater;

#[cfg(feature = "miniz_oxide")]
impl ZlibInflate for MinizInflater {
  fn inflate(&mut self, compressed: &[u8], size_limit: usize) -> PngResult<Vec<u8>> {
    use crate::InflateFailure;
    use miniz_oxide::inflate::{
      core::{
        decompress,
        inflate_flags::{TINFL_FLAG_PARSE_ZLIB_HEADER, TINFL_FLAG_USING_NON_WRAPPING_OUTPUT_BUF},
        DecompressorOxide,
      },
      TINFLStatus,
    };

    // start small and double up to the limit
    let first_len = size_limit.min(compressed.len().saturating_mul(4).max(MIN_OUTPUT_LEN));
    let mut out: Vec<u8> = Vec::new();
    out.try_reserve_exact(first_len)?;
    out.resize(first_len, 0);
    let r = &mut DecompressorOxide::new();
    let flags = TINFL_FLAG_PARSE_ZLIB_HEADER | TINFL_FLAG_USING_NON_WRAPPING_OUTPUT_BUF;
    let mut in_pos = 0;
    let mut out_pos = 0;
    let failure = loop {
      let (status, input_read, bytes_written) =
        decompress(r, &compressed[in_pos..], &mut out, out_pos, flags);
      in_pos += input_read;
      out_pos += bytes_written;
      log::trace!("inflate: {status:?}, {in_pos} in, {out_pos} out");
      match status {
        TINFLStatus::Done => {
          out.truncate(out_pos);
          return Ok(out);
        }
        TINFLStatus::HasMoreOutput => {
          if out.len() >= size_limit {
            // that's as much as was asked for
            out.truncate(out_pos);
            return Ok(out);
          }
          let new_len = out.len().saturating_mul(2).min(size_limit);
          out.try_reserve_exact(new_len - out.len())?;
          out.resize(new_len, 0);
        }
        TINFLStatus::Adler32Mismatch => break InflateFailure::Adler32Mismatch,
        TINFLStatus::FailedCannotMakeProgress | TINFLStatus::NeedsMoreInput => {
          break InflateFailure::UnexpectedEnd
        }
        TINFLStatus::Failed => break InflateFailure::Corrupt,
        TINFLStatus::BadParam => break InflateFailure::Other,
      }
    };
    Err(failure.into())
  }
}
