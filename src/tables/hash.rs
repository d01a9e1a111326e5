//! Hash table implementation for MPQ archives
//!
//! The hash table is an open-addressed, linearly probed index from name
//! hashes to block table slots. On disk it is encrypted with a key derived
//! from the fixed string `(hash table)`.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Seek, SeekFrom, Write};

use crate::crypto::{decrypt_block, encrypt_block, hash_string, hash_type};
use crate::{Error, Result};

/// Hash table entry (16 bytes on disk)
#[derive(Debug, Clone, Copy)]
pub struct HashEntry {
    /// First hash of the normalized file name
    pub name_a: u32,
    /// Second hash of the normalized file name
    pub name_b: u32,
    /// Locale ID (0 = neutral)
    pub locale: u16,
    /// Platform ID (vestigial, always 0 in practice)
    pub platform: u16,
    /// Block table index or one of the sentinel values
    pub block_index: u32,
}

impl HashEntry {
    /// Slot has never been used; terminates a probe sequence
    pub const EMPTY_NEVER_USED: u32 = 0xFFFFFFFF;
    /// Slot was deleted; a probe sequence continues past it
    pub const EMPTY_DELETED: u32 = 0xFFFFFFFE;

    /// Create an empty (never used) entry in its on-disk form
    pub fn empty() -> Self {
        HashEntry {
            name_a: 0xFFFFFFFF,
            name_b: 0xFFFFFFFF,
            locale: 0xFFFF,
            platform: 0xFFFF,
            block_index: Self::EMPTY_NEVER_USED,
        }
    }

    /// Check if this entry has never been used
    pub fn is_empty(&self) -> bool {
        self.block_index == Self::EMPTY_NEVER_USED
    }

    /// Check if this entry was deleted
    pub fn is_deleted(&self) -> bool {
        self.block_index == Self::EMPTY_DELETED
    }

    /// Check if this entry references a block
    pub fn is_occupied(&self) -> bool {
        self.block_index < Self::EMPTY_DELETED
    }
}

/// The archive's name index
#[derive(Debug)]
pub struct HashTable {
    entries: Vec<HashEntry>,
    mask: u32,
}

impl HashTable {
    /// Create a new hash table filled with empty entries
    ///
    /// The size must be a power of two so that probe positions can be
    /// computed with a mask.
    pub fn new(size: u32) -> Result<Self> {
        if size == 0 || !size.is_power_of_two() {
            return Err(Error::invalid_format(format!(
                "hash table size must be a power of two, got {size}"
            )));
        }

        Ok(HashTable {
            entries: vec![HashEntry::empty(); size as usize],
            mask: size - 1,
        })
    }

    /// Read and decrypt a hash table
    pub fn read<R: Read + Seek>(reader: &mut R, offset: u64, size: u32) -> Result<Self> {
        if size == 0 || !size.is_power_of_two() {
            return Err(Error::invalid_format(format!(
                "hash table size must be a power of two, got {size}"
            )));
        }

        reader.seek(SeekFrom::Start(offset))?;

        let mut raw = vec![0u32; size as usize * 4];
        reader.read_u32_into::<LittleEndian>(&mut raw)?;
        decrypt_block(&mut raw, hash_string("(hash table)", hash_type::FILE_KEY));

        let entries = raw
            .chunks_exact(4)
            .map(|chunk| HashEntry {
                name_a: chunk[0],
                name_b: chunk[1],
                locale: (chunk[2] & 0xFFFF) as u16,
                platform: (chunk[2] >> 16) as u16,
                block_index: chunk[3],
            })
            .collect();

        Ok(HashTable {
            entries,
            mask: size - 1,
        })
    }

    /// Encrypt and write the table
    ///
    /// The locale and platform halves are packed into a single u32 as
    /// `locale | (platform << 16)` to match the on-disk column layout the
    /// encryption operates on.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut raw = Vec::with_capacity(self.entries.len() * 4);
        for entry in &self.entries {
            raw.push(entry.name_a);
            raw.push(entry.name_b);
            raw.push(entry.locale as u32 | ((entry.platform as u32) << 16));
            raw.push(entry.block_index);
        }

        encrypt_block(&mut raw, hash_string("(hash table)", hash_type::FILE_KEY));

        for value in raw {
            writer.write_u32::<LittleEndian>(value)?;
        }
        Ok(())
    }

    /// Reset every entry to the empty sentinel
    pub fn clear(&mut self) {
        self.entries.fill(HashEntry::empty());
    }

    /// Number of slots
    pub fn size(&self) -> u32 {
        self.entries.len() as u32
    }

    /// Get a specific entry
    pub fn get(&self, index: usize) -> Option<&HashEntry> {
        self.entries.get(index)
    }

    /// All entries
    pub fn entries(&self) -> &[HashEntry] {
        &self.entries
    }

    /// Look up a file by name
    ///
    /// Probing starts at `hash(name, TABLE_OFFSET) & mask` and advances
    /// linearly; the first never-used slot terminates the search, deleted
    /// slots are skipped.
    pub fn find(&self, name: &str) -> Option<&HashEntry> {
        let name_a = hash_string(name, hash_type::NAME_A);
        let name_b = hash_string(name, hash_type::NAME_B);
        let start = hash_string(name, hash_type::TABLE_OFFSET) & self.mask;

        for i in 0..=self.mask {
            let entry = &self.entries[((start + i) & self.mask) as usize];

            if entry.is_empty() {
                return None;
            }
            if entry.is_deleted() {
                continue;
            }
            if entry.name_a == name_a && entry.name_b == name_b {
                return Some(entry);
            }
        }

        None
    }

    /// Insert a file into the first free slot of its probe sequence
    pub fn insert(&mut self, name: &str, block_index: u32) -> Result<()> {
        let name_a = hash_string(name, hash_type::NAME_A);
        let name_b = hash_string(name, hash_type::NAME_B);
        let start = hash_string(name, hash_type::TABLE_OFFSET) & self.mask;

        for i in 0..=self.mask {
            let entry = &mut self.entries[((start + i) & self.mask) as usize];

            if entry.is_empty() || entry.is_deleted() {
                *entry = HashEntry {
                    name_a,
                    name_b,
                    locale: 0,
                    platform: 0,
                    block_index,
                };
                return Ok(());
            }
        }

        Err(Error::HashTableFull)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_entry_states() {
        let empty = HashEntry::empty();
        assert!(empty.is_empty());
        assert!(!empty.is_deleted());
        assert!(!empty.is_occupied());

        let deleted = HashEntry {
            block_index: HashEntry::EMPTY_DELETED,
            ..HashEntry::empty()
        };
        assert!(!deleted.is_empty());
        assert!(deleted.is_deleted());
        assert!(!deleted.is_occupied());

        let occupied = HashEntry {
            name_a: 0x12345678,
            name_b: 0x9ABCDEF0,
            locale: 0,
            platform: 0,
            block_index: 0,
        };
        assert!(occupied.is_occupied());
    }

    #[test]
    fn test_size_must_be_power_of_two() {
        assert!(HashTable::new(16).is_ok());
        assert!(HashTable::new(1024).is_ok());
        assert!(HashTable::new(0).is_err());
        assert!(HashTable::new(15).is_err());
        assert!(HashTable::new(100).is_err());
    }

    #[test]
    fn test_insert_and_find() {
        let mut table = HashTable::new(16).unwrap();
        table.insert("Data\\Test1.txt", 0).unwrap();
        table.insert("Data\\SubDir\\Test2.txt", 1).unwrap();

        assert_eq!(table.find("Data\\Test1.txt").unwrap().block_index, 0);
        assert_eq!(
            table.find("Data\\SubDir\\Test2.txt").unwrap().block_index,
            1
        );
        // Lookup normalizes separators and case through the hash function.
        assert_eq!(table.find("data/test1.TXT").unwrap().block_index, 0);
        assert!(table.find("Missing.txt").is_none());
    }

    #[test]
    fn test_insert_until_full() {
        let mut table = HashTable::new(16).unwrap();
        for i in 0..16 {
            table.insert(&format!("file{i}.dat"), i).unwrap();
        }

        match table.insert("one_too_many.dat", 16) {
            Err(Error::HashTableFull) => {}
            other => panic!("expected HashTableFull, got {other:?}"),
        }
    }

    #[test]
    fn test_encrypted_round_trip() {
        let mut table = HashTable::new(16).unwrap();
        table.insert("Data\\A.txt", 0).unwrap();
        table.insert("Data\\B.txt", 1).unwrap();

        let mut buf = Vec::new();
        table.write(&mut buf).unwrap();
        assert_eq!(buf.len(), 16 * 16);

        // The serialized form must not leak the plaintext sentinels.
        let first_word = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        assert_ne!(first_word, 0xFFFFFFFF);

        let parsed = HashTable::read(&mut Cursor::new(&buf), 0, 16).unwrap();
        assert_eq!(parsed.find("Data\\A.txt").unwrap().block_index, 0);
        assert_eq!(parsed.find("Data\\B.txt").unwrap().block_index, 1);
        assert!(parsed.find("Data\\C.txt").is_none());
    }

    #[test]
    fn test_deleted_slot_is_reused_and_probed_past() {
        let mut table = HashTable::new(16).unwrap();
        table.insert("collider.txt", 5).unwrap();

        // A deleted slot in the probe path is reusable for insertion and
        // must not terminate a lookup.
        let start = hash_string("collider.txt", hash_type::TABLE_OFFSET) & 15;
        table.entries[start as usize].block_index = HashEntry::EMPTY_DELETED;
        table.insert("collider.txt", 7).unwrap();
        assert_eq!(table.find("collider.txt").unwrap().block_index, 7);
    }
}
