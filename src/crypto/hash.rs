//! The MPQ string hash algorithm

use super::table::ENCRYPTION_TABLE;

/// Hash a string using the MPQ hash algorithm
///
/// Path separators are normalized to backslash and ASCII letters are
/// uppercased before hashing, so lookups are case- and separator-insensitive.
pub fn hash_string(filename: &str, hash_type: u32) -> u32 {
    let mut seed1: u32 = 0x7FED_7FED;
    let mut seed2: u32 = 0xEEEE_EEEE;

    for &byte in filename.as_bytes() {
        let mut ch = byte;

        if ch == b'/' {
            ch = b'\\';
        }
        ch = ch.to_ascii_uppercase();

        let table_idx = (hash_type * 0x100 + ch as u32) as usize;
        seed1 = ENCRYPTION_TABLE[table_idx] ^ (seed1.wrapping_add(seed2));
        seed2 = (ch as u32)
            .wrapping_add(seed1)
            .wrapping_add(seed2)
            .wrapping_add(seed2 << 5)
            .wrapping_add(3);
    }

    seed1
}
