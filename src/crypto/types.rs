//! Hash type constants

/// Hash types for MPQ string hashing
///
/// Each type selects a 256-entry bank of the encryption table, so the same
/// string produces four independent 32-bit hashes.
pub mod hash_type {
    /// Starting index for hash table probing
    pub const TABLE_OFFSET: u32 = 0;
    /// First part of the filename hash stored in the hash table
    pub const NAME_A: u32 = 1;
    /// Second part of the filename hash stored in the hash table
    pub const NAME_B: u32 = 2;
    /// File encryption key derivation
    pub const FILE_KEY: u32 = 3;
}
