//! BZip2 decompression (read-only; the writer never produces BZip2)

use bzip2::read::BzDecoder;
use std::io::Read;

use crate::{Error, Result};

/// Decompress BZip2 data
pub(crate) fn decompress(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let mut decoder = BzDecoder::new(data);
    let mut decompressed = Vec::with_capacity(expected_size);

    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| Error::compression(format!("bzip2 decompression failed: {e}")))?;

    Ok(decompressed)
}
