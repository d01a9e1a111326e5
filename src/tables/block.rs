//! Block table implementation for MPQ archives

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Seek, SeekFrom, Write};

use crate::crypto::{decrypt_block, encrypt_block, hash_string, hash_type};
use crate::Result;

/// Block table entry (16 bytes on disk)
#[derive(Debug, Clone, Copy)]
pub struct BlockEntry {
    /// Offset of the file data, low 32 bits, relative to the archive origin
    pub file_pos: u32,
    /// Stored (compressed) file size
    pub compressed_size: u32,
    /// Uncompressed file size
    pub file_size: u32,
    /// File flags
    pub flags: u32,
}

impl BlockEntry {
    /// File is compressed with PKWARE DCL (read-only, never produced)
    pub const FLAG_IMPLODE: u32 = 0x0000_0100;
    /// File is compressed with one or more methods named by a prefix byte
    pub const FLAG_COMPRESS: u32 = 0x0000_0200;
    /// File contents are encrypted with a filename-derived key
    pub const FLAG_ENCRYPTED: u32 = 0x0001_0000;
    /// Encryption key is adjusted by the block position and file size
    pub const FLAG_FIX_KEY: u32 = 0x0002_0000;
    /// Entry is an incremental patch payload
    pub const FLAG_PATCH_FILE: u32 = 0x0010_0000;
    /// File is stored as one blob instead of sectors
    pub const FLAG_SINGLE_UNIT: u32 = 0x0100_0000;
    /// Entry is a deletion tombstone used by patch archives
    pub const FLAG_DELETE_MARKER: u32 = 0x0200_0000;
    /// Per-sector (or trailing, for single-unit) Adler-32 checksums present
    pub const FLAG_SECTOR_CRC: u32 = 0x0400_0000;
    /// Slot is live
    pub const FLAG_EXISTS: u32 = 0x8000_0000;

    /// Check if the file is compressed (multi-method or PKWARE implode)
    pub fn is_compressed(&self) -> bool {
        self.flags & (Self::FLAG_COMPRESS | Self::FLAG_IMPLODE) != 0
    }

    /// Check if the file is encrypted
    pub fn is_encrypted(&self) -> bool {
        self.flags & Self::FLAG_ENCRYPTED != 0
    }

    /// Check if the encryption key is position-adjusted
    pub fn has_fix_key(&self) -> bool {
        self.flags & Self::FLAG_FIX_KEY != 0
    }

    /// Check if the file is stored as a single unit
    pub fn is_single_unit(&self) -> bool {
        self.flags & Self::FLAG_SINGLE_UNIT != 0
    }

    /// Check if the file carries sector checksums
    pub fn has_sector_crc(&self) -> bool {
        self.flags & Self::FLAG_SECTOR_CRC != 0
    }

    /// Check if the file is a patch payload
    pub fn is_patch_file(&self) -> bool {
        self.flags & Self::FLAG_PATCH_FILE != 0
    }

    /// Check if the entry is a deletion tombstone
    pub fn is_delete_marker(&self) -> bool {
        self.flags & Self::FLAG_DELETE_MARKER != 0
    }

    /// Check if the slot is live
    pub fn exists(&self) -> bool {
        self.flags & Self::FLAG_EXISTS != 0
    }
}

/// Parallel array of file entries
#[derive(Debug, Default)]
pub struct BlockTable {
    entries: Vec<BlockEntry>,
}

impl BlockTable {
    /// Create an empty block table
    pub fn new() -> Self {
        BlockTable {
            entries: Vec::new(),
        }
    }

    /// Read and decrypt a block table
    pub fn read<R: Read + Seek>(reader: &mut R, offset: u64, size: u32) -> Result<Self> {
        reader.seek(SeekFrom::Start(offset))?;

        let mut raw = vec![0u32; size as usize * 4];
        reader.read_u32_into::<LittleEndian>(&mut raw)?;
        decrypt_block(&mut raw, hash_string("(block table)", hash_type::FILE_KEY));

        let entries = raw
            .chunks_exact(4)
            .map(|chunk| BlockEntry {
                file_pos: chunk[0],
                compressed_size: chunk[1],
                file_size: chunk[2],
                flags: chunk[3],
            })
            .collect();

        Ok(BlockTable { entries })
    }

    /// Encrypt and write the table
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut raw = Vec::with_capacity(self.entries.len() * 4);
        for entry in &self.entries {
            raw.push(entry.file_pos);
            raw.push(entry.compressed_size);
            raw.push(entry.file_size);
            raw.push(entry.flags);
        }

        encrypt_block(&mut raw, hash_string("(block table)", hash_type::FILE_KEY));

        for value in raw {
            writer.write_u32::<LittleEndian>(value)?;
        }
        Ok(())
    }

    /// Append an entry, returning its index
    pub fn push(&mut self, entry: BlockEntry) -> u32 {
        self.entries.push(entry);
        (self.entries.len() - 1) as u32
    }

    /// Get a specific entry
    pub fn get(&self, index: usize) -> Option<&BlockEntry> {
        self.entries.get(index)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries
    pub fn entries(&self) -> &[BlockEntry] {
        &self.entries
    }
}

/// High 16 bits of file positions, one slot per block entry (V2 archives)
#[derive(Debug)]
pub struct HiBlockTable {
    entries: Vec<u16>,
}

impl HiBlockTable {
    /// Create a table of the given size, all zero
    pub fn new(size: usize) -> Self {
        HiBlockTable {
            entries: vec![0; size],
        }
    }

    /// Read a hi-block table (stored unencrypted)
    pub fn read<R: Read + Seek>(reader: &mut R, offset: u64, size: u32) -> Result<Self> {
        reader.seek(SeekFrom::Start(offset))?;

        let mut entries = vec![0u16; size as usize];
        reader.read_u16_into::<LittleEndian>(&mut entries)?;

        Ok(HiBlockTable { entries })
    }

    /// Write the table
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        for &entry in &self.entries {
            writer.write_u16::<LittleEndian>(entry)?;
        }
        Ok(())
    }

    /// Get the high half for a block slot
    pub fn get(&self, index: usize) -> u16 {
        self.entries.get(index).copied().unwrap_or(0)
    }

    /// Set the high half for a block slot, growing the table as needed
    pub fn set(&mut self, index: usize, value: u16) {
        if index >= self.entries.len() {
            self.entries.resize(index + 1, 0);
        }
        self.entries[index] = value;
    }

    /// Check if any entry is non-zero, i.e. the table must be written
    pub fn is_needed(&self) -> bool {
        self.entries.iter().any(|&v| v != 0)
    }

    /// All entries
    pub fn entries(&self) -> &[u16] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_entry_flags() {
        let compressed = BlockEntry {
            file_pos: 0,
            compressed_size: 100,
            file_size: 200,
            flags: BlockEntry::FLAG_COMPRESS | BlockEntry::FLAG_EXISTS,
        };
        assert!(compressed.is_compressed());
        assert!(!compressed.is_encrypted());
        assert!(compressed.exists());

        let imploded = BlockEntry {
            flags: BlockEntry::FLAG_IMPLODE | BlockEntry::FLAG_EXISTS,
            ..compressed
        };
        assert!(imploded.is_compressed());

        let tombstone = BlockEntry {
            file_pos: 0,
            compressed_size: 0,
            file_size: 0,
            flags: BlockEntry::FLAG_DELETE_MARKER | BlockEntry::FLAG_EXISTS,
        };
        assert!(tombstone.is_delete_marker());
        assert!(!tombstone.is_compressed());

        let encrypted = BlockEntry {
            file_pos: 0,
            compressed_size: 64,
            file_size: 64,
            flags: BlockEntry::FLAG_ENCRYPTED
                | BlockEntry::FLAG_FIX_KEY
                | BlockEntry::FLAG_EXISTS,
        };
        assert!(encrypted.is_encrypted());
        assert!(encrypted.has_fix_key());
    }

    #[test]
    fn test_encrypted_round_trip() {
        let mut table = BlockTable::new();
        table.push(BlockEntry {
            file_pos: 0x2C,
            compressed_size: 40,
            file_size: 52,
            flags: BlockEntry::FLAG_EXISTS
                | BlockEntry::FLAG_COMPRESS
                | BlockEntry::FLAG_SINGLE_UNIT,
        });
        table.push(BlockEntry {
            file_pos: 0x54,
            compressed_size: 0,
            file_size: 0,
            flags: BlockEntry::FLAG_EXISTS | BlockEntry::FLAG_DELETE_MARKER,
        });

        let mut buf = Vec::new();
        table.write(&mut buf).unwrap();
        assert_eq!(buf.len(), 2 * 16);

        let parsed = BlockTable::read(&mut Cursor::new(&buf), 0, 2).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.get(0).unwrap().file_pos, 0x2C);
        assert_eq!(parsed.get(0).unwrap().compressed_size, 40);
        assert_eq!(parsed.get(0).unwrap().file_size, 52);
        assert!(parsed.get(1).unwrap().is_delete_marker());
    }

    #[test]
    fn test_hi_block_table() {
        let mut table = HiBlockTable::new(2);
        assert!(!table.is_needed());

        table.set(1, 0x0001);
        assert!(table.is_needed());
        assert_eq!(table.get(0), 0);
        assert_eq!(table.get(1), 1);
        assert_eq!(table.get(99), 0);

        let mut buf = Vec::new();
        table.write(&mut buf).unwrap();
        let parsed = HiBlockTable::read(&mut Cursor::new(&buf), 0, 2).unwrap();
        assert_eq!(parsed.entries(), &[0, 1]);
    }
}
