//! Checksums used by the MPQ format
//!
//! The (attributes) file stores standard CRC32 checksums (reversed polynomial
//! 0xEDB88320). Sector checksums use Adler-32 despite being called "sector
//! CRCs" throughout the format documentation.

/// CRC32 of the given bytes, as stored in the (attributes) file
#[inline]
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Adler-32 of the given bytes, as stored in sector CRC tables
#[inline]
pub fn adler32(data: &[u8]) -> u32 {
    adler2::adler32_slice(data)
}
