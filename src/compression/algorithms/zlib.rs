//! Zlib compression and decompression

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use crate::{Error, Result};

/// Compress using zlib at the best compression level
pub(crate) fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(data)
        .map_err(|e| Error::compression(format!("zlib compression failed: {e}")))?;
    encoder
        .finish()
        .map_err(|e| Error::compression(format!("zlib compression failed: {e}")))
}

/// Decompress zlib data
pub(crate) fn decompress(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut decompressed = Vec::with_capacity(expected_size);

    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| Error::compression(format!("zlib decompression failed: {e}")))?;

    if decompressed.len() != expected_size {
        log::debug!(
            "zlib output size mismatch: expected {expected_size}, got {}",
            decompressed.len()
        );
    }

    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let original = b"Hello, World! This is a test of zlib compression in MPQ archives.";

        let compressed = compress(original).unwrap();
        let decompressed = decompress(&compressed, original.len()).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn test_repetitive_data_shrinks() {
        let original = vec![b'A'; 4096];
        let compressed = compress(&original).unwrap();
        assert!(compressed.len() < original.len() / 2);

        let decompressed = decompress(&compressed, original.len()).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn test_garbage_input_fails() {
        assert!(decompress(&[0xDE, 0xAD, 0xBE, 0xEF], 100).is_err());
    }
}
