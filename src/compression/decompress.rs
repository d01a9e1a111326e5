//! Reader-side decompression dispatch

use super::algorithms;
use super::methods::flags;
use crate::{Error, Result};

/// Decompress a unit of data according to its method mask
///
/// `data` is the stored stream with the method byte already stripped. For
/// multi-method masks the methods were applied in order during compression,
/// so they unwind in reverse: BZip2 is tested first, then zlib, then PKWARE.
/// Masks naming Huffman, LZMA, Sparse or ADPCM are rejected as unsupported.
pub fn decompress(data: &[u8], method_mask: u8, expected_size: usize) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Err(Error::compression("empty compressed data"));
    }

    log::debug!(
        "decompressing {} bytes to {expected_size} with method 0x{method_mask:02X}",
        data.len()
    );

    // LZMA shares its value with ZLIB|BZIP2, so it must be tested as an
    // exact mask before any bit checks.
    if method_mask == flags::LZMA {
        return Err(Error::UnsupportedCompression(method_mask));
    }
    if method_mask & (flags::HUFFMAN | flags::SPARSE | flags::ADPCM_MONO | flags::ADPCM_STEREO)
        != 0
    {
        return Err(Error::UnsupportedCompression(method_mask));
    }

    if method_mask & flags::BZIP2 != 0 {
        algorithms::bzip2::decompress(data, expected_size)
    } else if method_mask & flags::ZLIB != 0 {
        algorithms::zlib::decompress(data, expected_size)
    } else if method_mask & flags::PKWARE != 0 {
        algorithms::pkware::decompress(data, expected_size)
    } else {
        Err(Error::UnsupportedCompression(method_mask))
    }
}
