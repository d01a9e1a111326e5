//! Encryption direction of the MPQ block cipher

use super::table::ENCRYPTION_TABLE;

/// Encrypt a block of u32 values in place
pub fn encrypt_block(data: &mut [u32], mut key: u32) {
    let mut seed: u32 = 0xEEEE_EEEE;

    for value in data.iter_mut() {
        seed = seed.wrapping_add(ENCRYPTION_TABLE[0x400 + (key & 0xFF) as usize]);

        let plain = *value;
        *value = plain ^ key.wrapping_add(seed);

        key = (!key << 0x15).wrapping_add(0x1111_1111) | (key >> 0x0B);
        seed = plain
            .wrapping_add(seed)
            .wrapping_add(seed << 5)
            .wrapping_add(3);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::decryption::decrypt_block;
    use crate::crypto::{hash_string, hash_type};

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let original = [0x12345678u32, 0xDEADBEEF, 0xCAFEBABE, 0xF00DF00D];
        let key = hash_string("(hash table)", hash_type::FILE_KEY);

        let mut data = original;
        encrypt_block(&mut data, key);
        assert_ne!(data, original, "encryption should change the data");

        decrypt_block(&mut data, key);
        assert_eq!(data, original);
    }

    #[test]
    fn test_round_trip_with_block_table_key() {
        let original = [0x11111111u32, 0x22222222, 0x33333333, 0x44444444];
        let key = hash_string("(block table)", hash_type::FILE_KEY);

        let mut data = original;
        encrypt_block(&mut data, key);
        decrypt_block(&mut data, key);
        assert_eq!(data, original);
    }

    #[test]
    fn test_single_value_and_zeros() {
        let key = hash_string("(hash table)", hash_type::FILE_KEY);

        let mut single = [0xABCDEF01u32];
        encrypt_block(&mut single, key);
        decrypt_block(&mut single, key);
        assert_eq!(single, [0xABCDEF01]);

        let mut zeros = [0u32; 4];
        encrypt_block(&mut zeros, key);
        decrypt_block(&mut zeros, key);
        assert_eq!(zeros, [0u32; 4]);
    }

    #[test]
    fn test_different_keys_produce_different_output() {
        let original = [0x12345678u32, 0x9ABCDEF0];

        let mut data1 = original;
        let mut data2 = original;
        encrypt_block(&mut data1, 0x11111111);
        encrypt_block(&mut data2, 0x22222222);

        assert_ne!(data1, data2);
        assert_ne!(data1, original);
        assert_ne!(data2, original);
    }
}
