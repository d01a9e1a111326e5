//! Per-file encryption key derivation

use super::hash::hash_string;
use super::types::hash_type;
use crate::path::mpq_basename;
use crate::tables::BlockEntry;

/// Compute the encryption key for a file
///
/// The base key hashes only the basename of the archive path. Files flagged
/// with `FIX_KEY` adjust the key by the block's low file position and the
/// uncompressed size: `(base + file_pos) ^ file_size`.
pub fn file_key(archive_path: &str, file_pos: u64, file_size: u32, flags: u32) -> u32 {
    let key = hash_string(mpq_basename(archive_path), hash_type::FILE_KEY);

    if flags & BlockEntry::FLAG_FIX_KEY != 0 {
        key.wrapping_add(file_pos as u32) ^ file_size
    } else {
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_uses_basename_only() {
        assert_eq!(
            file_key("Data\\SubDir\\File.dat", 0, 0, 0),
            hash_string("File.dat", hash_type::FILE_KEY)
        );
        assert_eq!(
            file_key("Data/SubDir/File.dat", 0, 0, 0),
            file_key("File.dat", 0, 0, 0)
        );
    }

    #[test]
    fn test_fix_key_adjustment() {
        let base = hash_string("File.dat", hash_type::FILE_KEY);
        let adjusted = file_key(
            "Data\\File.dat",
            0x1000,
            0x2345,
            BlockEntry::FLAG_FIX_KEY,
        );
        assert_eq!(adjusted, base.wrapping_add(0x1000) ^ 0x2345);
    }

    #[test]
    fn test_fix_key_uses_low_32_bits_of_position() {
        let with_high_bits = file_key(
            "File.dat",
            0x1_0000_2000,
            0x10,
            BlockEntry::FLAG_FIX_KEY,
        );
        let low_only = file_key("File.dat", 0x2000, 0x10, BlockEntry::FLAG_FIX_KEY);
        assert_eq!(with_high_bits, low_only);
    }
}
