//! Writer-side compression

use super::algorithms;
use super::methods::flags;
use crate::Result;

/// Compress a unit of data for storage
///
/// Returns the method byte (always zlib) followed by the compressed stream.
/// Callers compare the result against the input length and store the raw
/// bytes instead when compression did not shrink the unit.
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let compressed = algorithms::zlib::compress(data)?;

    let mut result = Vec::with_capacity(1 + compressed.len());
    result.push(flags::ZLIB);
    result.extend_from_slice(&compressed);
    Ok(result)
}
