use png_rgba8::*;
use walkdir::WalkDir;

use super::{build_png, filter_rows, ihdr_data, push_chunk, rand_bytes};

const FIXTURE: &str = "tests/png/rgba_4x5_all_filters.png";

/// The fixture's pixels: rows 0 through 4 use filter types 0 through 4.
fn fixture_pixel(x: u32, y: u32) -> RGBA8 {
  RGBA8::new((x * 40 + y) as u8, (y * 50 + 3) as u8, (x * y * 17) as u8, (255 - x * 10) as u8)
}

#[test]
fn test_decode_png_file_fixture() {
  let pixels = decode_png_file(FIXTURE).unwrap();
  assert_eq!((pixels.width(), pixels.height(), pixels.stride()), (4, 5, 16));
  for y in 0..5 {
    for x in 0..4 {
      assert_eq!(pixels.pixel(x, y), Some(fixture_pixel(x, y)), "({x},{y})");
    }
  }
  assert_eq!(pixels.pixels().len(), 20);
}

#[test]
fn test_reader_and_slice_agree() {
  let bytes = std::fs::read(FIXTURE).unwrap();
  let from_slice = decode_png(&bytes).unwrap();
  let from_reader = decode_png_reader(&bytes[..]).unwrap();
  assert_eq!(from_slice, from_reader);
}

#[test]
fn test_png_read_header_fixture() {
  let bytes = std::fs::read(FIXTURE).unwrap();
  assert!(is_png_signature_correct(&bytes));
  let header = png_read_header(&bytes).unwrap();
  assert_eq!((header.width, header.height, header.bit_depth, header.color_type), (4, 5, 8, 6));
}

#[test]
fn test_missing_file_is_io_error() {
  assert_eq!(
    decode_png_file("tests/png/no_such_file.png"),
    Err(PngError::Io(std::io::ErrorKind::NotFound))
  );
}

#[test]
fn test_reader_huge_declared_length_is_truncation() {
  let mut bytes = PNG_SIGNATURE.to_vec();
  bytes.extend_from_slice(&[0x7F, 0xFF, 0xFF, 0xFF]);
  bytes.extend_from_slice(b"IHDR");
  assert_eq!(bytes.len(), 16);
  assert_eq!(decode_png_reader(&bytes[..]), Err(PngError::TruncatedStream));
  assert_eq!(decode_png(&bytes), Err(PngError::TruncatedStream));
}

#[test]
fn test_split_idat_decodes_like_single_idat() {
  let (width, height) = (7, 6);
  let pixels = rand_bytes(width as usize * 4 * height as usize);
  let filtered = filter_rows(&pixels, width, &[0, 1, 2, 3, 4]);
  let single = decode_png(&build_png(width, height, &filtered, 1)).unwrap();
  assert_eq!(single.as_bytes(), &pixels[..]);
  for pieces in 2..=9 {
    let split = decode_png(&build_png(width, height, &filtered, pieces)).unwrap();
    assert_eq!(split, single, "{pieces} pieces");
  }
}

#[test]
fn test_every_filter_round_trips() {
  let (width, height) = (3, 4);
  let pixels = rand_bytes(width as usize * 4 * height as usize);
  for filter in 0..=4 {
    let filtered = filter_rows(&pixels, width, &[filter]);
    let decoded = decode_png(&build_png(width, height, &filtered, 1)).unwrap();
    assert_eq!(decoded.into_bytes(), pixels, "filter {filter}");
  }
}

#[test]
fn test_flipped_data_bit_fails_decode() {
  let pixels = rand_bytes(2 * 4 * 2);
  let good = build_png(2, 2, &filter_rows(&pixels, 2, &[0]), 1);
  // signature, then the 25 byte IHDR chunk, then 8 bytes of IDAT length and type
  let first_idat_byte = 8 + 25 + 8;
  let mut bad = good.clone();
  bad[first_idat_byte + 1] ^= 0b0001_0000;
  match decode_png(&bad) {
    Err(PngError::CrcMismatch { chunk_index, expected, computed }) => {
      assert_eq!(chunk_index, 1);
      assert_ne!(expected, computed);
    }
    other => panic!("{other:?}"),
  }
}

#[test]
fn test_fixture_every_flipped_bit_fails() {
  let bytes = std::fs::read(FIXTURE).unwrap();
  for i in 0..bytes.len() {
    let mut bad = bytes.clone();
    bad[i] ^= 1;
    assert!(decode_png(&bad).is_err(), "byte {i}");
  }
}

#[test]
fn test_truecolor_without_alpha_is_rejected() {
  let mut bytes = PNG_SIGNATURE.to_vec();
  push_chunk(&mut bytes, b"IHDR", &ihdr_data(2, 2, 8, 2));
  push_chunk(&mut bytes, b"IDAT", &miniz_oxide::deflate::compress_to_vec_zlib(&[0; 14], 6));
  push_chunk(&mut bytes, b"IEND", &[]);
  assert_eq!(decode_png(&bytes), Err(PngError::UnsupportedProfile(Unsupported::ColorType(2))));
  assert_eq!(png_read_header(&bytes), Err(PngError::UnsupportedProfile(Unsupported::ColorType(2))));
}

#[test]
fn test_sixteen_bit_is_rejected() {
  let mut bytes = PNG_SIGNATURE.to_vec();
  push_chunk(&mut bytes, b"IHDR", &ihdr_data(2, 2, 16, 6));
  assert_eq!(png_read_header(&bytes), Err(PngError::UnsupportedProfile(Unsupported::BitDepth(16))));
}

#[test]
fn test_zlib_size_mismatch() {
  let filtered = filter_rows(&[9; 2 * 4 * 3], 2, &[1]);
  assert_eq!(filtered.len(), 27);
  let too_short = build_png(2, 3, &filtered[..26], 1);
  assert_eq!(decode_png(&too_short), Err(PngError::SizeMismatch { expected: 27, actual: 26 }));
  let mut padded = filtered.clone();
  padded.extend_from_slice(&[0; 100]);
  let too_long = build_png(2, 3, &padded, 1);
  assert_eq!(decode_png(&too_long), Err(PngError::SizeMismatch { expected: 27, actual: 28 }));
}

#[test]
fn test_corrupt_zlib_stream() {
  let mut bytes = PNG_SIGNATURE.to_vec();
  push_chunk(&mut bytes, b"IHDR", &ihdr_data(1, 1, 8, 6));
  push_chunk(&mut bytes, b"IDAT", &[0xFF; 12]);
  push_chunk(&mut bytes, b"IEND", &[]);
  assert!(matches!(decode_png(&bytes), Err(PngError::Decompress(_))));
  let z = miniz_oxide::deflate::compress_to_vec_zlib(&[0, 1, 2, 3, 4], 6);
  let mut bytes = PNG_SIGNATURE.to_vec();
  push_chunk(&mut bytes, b"IHDR", &ihdr_data(1, 1, 8, 6));
  push_chunk(&mut bytes, b"IDAT", &z[..z.len() - 5]);
  push_chunk(&mut bytes, b"IEND", &[]);
  assert_eq!(decode_png(&bytes), Err(PngError::Decompress(InflateFailure::UnexpectedEnd)));
}

#[test]
fn test_decode_no_panics() {
  // every file in the test folder, even non-png files shouldn't panic it.
  for entry in WalkDir::new("tests/").into_iter().filter_map(|e| e.ok()) {
    println!("{}", entry.path().display());
    let v = match std::fs::read(entry.path()) {
      Ok(v) => v,
      Err(e) => {
        println!("Error reading file: {e:?}");
        continue;
      }
    };
    let _ = png_read_header(&v);
    let _ = decode_png(&v);
    for _ in ChunkReader::new(ByteCursor::new(&v)) {
      //
    }
  }
  // even totally random data should never panic the decoder!
  for _ in 0..10 {
    let v = rand_bytes(1024);
    assert!(decode_png(&v).is_err());
    for _ in ChunkReader::new(ByteCursor::new(&v)) {
      //
    }
  }
  // nor random data after a correct signature
  for _ in 0..10 {
    let mut v = PNG_SIGNATURE.to_vec();
    v.extend(rand_bytes(1024));
    assert!(decode_png(&v).is_err());
    let _ = decode_png_reader(&v[..]);
  }
}
