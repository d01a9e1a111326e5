//! PKWare DCL decompression via pklib (read-only)

use pklib::explode_bytes;

use crate::{Error, Result};

/// Decompress PKWare DCL ("explode") data
pub(crate) fn decompress(data: &[u8], _expected_size: usize) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }

    explode_bytes(data)
        .map_err(|e| Error::compression(format!("PKWare decompression failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pklib::{implode_bytes, CompressionMode, DictionarySize};

    #[test]
    fn test_decompress_reference_stream() {
        let original = b"PKWare DCL payloads are read but never written.";

        let compressed =
            implode_bytes(original, CompressionMode::ASCII, DictionarySize::Size2K).unwrap();
        let decompressed = decompress(&compressed, original.len()).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(decompress(&[], 0).unwrap(), Vec::<u8>::new());
    }
}
