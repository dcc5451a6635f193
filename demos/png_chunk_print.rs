use png_rgba8::{decode_png, ByteCursor, ByteSource, ChunkReader, PNG_SIGNATURE};

fn main() {
  let args: Vec<String> = std::env::args().collect();
  println!("ARGS: {args:?}");
  for file_arg in args[1..].iter() {
    let path = std::path::Path::new(file_arg);
    print!("Reading `{}`... ", path.display());
    let bytes = match std::fs::read(path) {
      Ok(bytes) => {
        println!("got {} bytes.", bytes.len());
        bytes
      }
      Err(e) => {
        println!("{e:?}");
        continue;
      }
    };
    let mut cursor = ByteCursor::new(&bytes);
    match cursor.read_array::<8>() {
      Ok(signature) if signature == PNG_SIGNATURE => (),
      other => {
        println!("Bad signature: {other:?}");
        continue;
      }
    }
    for (n, chunk_res) in ChunkReader::new(cursor).enumerate() {
      println!("{n}: {chunk_res:?}");
    }
    match decode_png(&bytes) {
      Ok(pixels) => println!("Decoded: {}x{}", pixels.width(), pixels.height()),
      Err(e) => println!("Decode failed: {e}"),
    }
  }
}
