//! Decryption direction of the MPQ block cipher

use super::table::ENCRYPTION_TABLE;

/// Decrypt a block of u32 values in place
///
/// Exact inverse of [`encrypt_block`](super::encrypt_block): the seed update
/// uses the decrypted value, which is what makes the two directions
/// symmetric.
pub fn decrypt_block(data: &mut [u32], mut key: u32) {
    let mut seed: u32 = 0xEEEE_EEEE;

    for value in data.iter_mut() {
        seed = seed.wrapping_add(ENCRYPTION_TABLE[0x400 + (key & 0xFF) as usize]);

        let plain = *value ^ key.wrapping_add(seed);
        *value = plain;

        key = (!key << 0x15).wrapping_add(0x1111_1111) | (key >> 0x0B);
        seed = plain
            .wrapping_add(seed)
            .wrapping_add(seed << 5)
            .wrapping_add(3);
    }
}

/// Decrypt an arbitrary byte buffer in place
///
/// The cipher operates on u32 words: the buffer is zero-padded to a multiple
/// of four, decoded as little-endian words, decrypted, then re-emitted and
/// truncated to the original length.
pub fn decrypt_bytes(data: &mut [u8], key: u32) {
    if data.is_empty() {
        return;
    }

    let word_count = data.len().div_ceil(4);
    let mut words = vec![0u32; word_count];
    for (i, word) in words.iter_mut().enumerate() {
        let mut buf = [0u8; 4];
        let start = i * 4;
        let end = (start + 4).min(data.len());
        buf[..end - start].copy_from_slice(&data[start..end]);
        *word = u32::from_le_bytes(buf);
    }

    decrypt_block(&mut words, key);

    for (i, word) in words.iter().enumerate() {
        let bytes = word.to_le_bytes();
        let start = i * 4;
        let end = (start + 4).min(data.len());
        data[start..end].copy_from_slice(&bytes[..end - start]);
    }
}
