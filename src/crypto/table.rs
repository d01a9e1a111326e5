//! The shared encryption/hashing lookup table

use std::sync::LazyLock;

/// Lookup table used by both the string hash and the block cipher.
///
/// 0x500 entries: five banks of 256, indexed as `hash_type * 0x100 + byte`
/// by the hash function and as `0x400 + (key & 0xFF)` by the cipher. The
/// construction is deterministic, so the table is built once on first use
/// and is read-only afterwards.
pub(crate) static ENCRYPTION_TABLE: LazyLock<[u32; 0x500]> = LazyLock::new(|| {
    let mut table = [0u32; 0x500];
    let mut seed: u32 = 0x0010_0001;

    for index1 in 0..0x100 {
        let mut index2 = index1;
        for _ in 0..5 {
            seed = (seed.wrapping_mul(125).wrapping_add(3)) % 0x2AAAAB;
            let temp1 = (seed & 0xFFFF) << 16;

            seed = (seed.wrapping_mul(125).wrapping_add(3)) % 0x2AAAAB;
            let temp2 = seed & 0xFFFF;

            table[index2] = temp1 | temp2;
            index2 += 0x100;
        }
    }

    table
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_size() {
        assert_eq!(ENCRYPTION_TABLE.len(), 0x500);
    }

    #[test]
    fn test_table_is_deterministic() {
        // Recompute the generator independently and compare every slot.
        let mut seed: u32 = 0x0010_0001;
        for index1 in 0..0x100usize {
            let mut index2 = index1;
            for _ in 0..5 {
                seed = (seed * 125 + 3) % 0x2AAAAB;
                let temp1 = (seed & 0xFFFF) << 16;
                seed = (seed * 125 + 3) % 0x2AAAAB;
                let temp2 = seed & 0xFFFF;
                assert_eq!(ENCRYPTION_TABLE[index2], temp1 | temp2);
                index2 += 0x100;
            }
        }
    }

    #[test]
    fn test_table_has_no_trivial_runs() {
        // Sanity check that generation actually produced varied values.
        let distinct: std::collections::HashSet<u32> =
            ENCRYPTION_TABLE.iter().copied().collect();
        assert!(distinct.len() > 0x400);
    }
}
