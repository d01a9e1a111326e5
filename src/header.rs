//! MPQ header structures and parsing
//!
//! Archives may be preceded by an arbitrary user-data envelope; the real
//! header is located by scanning successive 512-byte alignments for the
//! `MPQ\x1A` magic. Every offset stored in the header is relative to the
//! byte position of the header itself.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Seek, SeekFrom, Write};

use crate::{Error, Result};

/// MPQ archive header magic (`MPQ\x1A`, little-endian)
pub const MPQ_MAGIC: u32 = 0x1A51504D;

/// Header alignment requirement for the magic scan (512 bytes)
pub const HEADER_ALIGNMENT: u64 = 0x200;

/// Default sector size shift (4096-byte sectors)
pub const DEFAULT_SECTOR_SIZE_SHIFT: u16 = 12;

/// MPQ format version
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FormatVersion {
    /// Version 1 - original format, 32-byte header, archives up to 4 GiB
    V1 = 0,
    /// Version 2 - Burning Crusade, 44-byte header, 64-bit file positions
    V2 = 1,
}

impl FormatVersion {
    /// Get the header size for this version
    pub fn header_size(&self) -> u32 {
        match self {
            FormatVersion::V1 => 0x20,
            FormatVersion::V2 => 0x2C,
        }
    }

    /// Create from the raw version number stored in the header
    pub fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(FormatVersion::V1),
            1 => Some(FormatVersion::V2),
            _ => None,
        }
    }
}

/// Main MPQ header structure (V1 base fields plus optional V2 extension)
#[derive(Debug, Clone)]
pub struct MpqHeader {
    /// Size of the archive header (0x20 for V1, 0x2C for V2)
    pub header_size: u32,
    /// Size of the archive data following the header (informational in V2)
    pub archive_size: u32,
    /// Format version
    pub format_version: FormatVersion,
    /// Log2 of the sector size in bytes
    pub sector_size_shift: u16,
    /// Offset to the hash table, low 32 bits, relative to the header
    pub hash_table_pos: u32,
    /// Offset to the block table, low 32 bits, relative to the header
    pub block_table_pos: u32,
    /// Number of entries in the hash table
    pub hash_table_size: u32,
    /// Number of entries in the block table
    pub block_table_size: u32,
    /// Offset to the hi-block table (V2, zero when absent)
    pub hi_block_table_pos: Option<u64>,
    /// High 16 bits of the hash table offset (V2)
    pub hash_table_pos_hi: Option<u16>,
    /// High 16 bits of the block table offset (V2)
    pub block_table_pos_hi: Option<u16>,
}

impl MpqHeader {
    /// Create a header for a new archive with empty tables
    pub fn new(version: FormatVersion, hash_table_size: u32) -> Self {
        MpqHeader {
            header_size: version.header_size(),
            archive_size: 0,
            format_version: version,
            sector_size_shift: DEFAULT_SECTOR_SIZE_SHIFT,
            hash_table_pos: 0,
            block_table_pos: 0,
            hash_table_size,
            block_table_size: 0,
            hi_block_table_pos: (version == FormatVersion::V2).then_some(0),
            hash_table_pos_hi: (version == FormatVersion::V2).then_some(0),
            block_table_pos_hi: (version == FormatVersion::V2).then_some(0),
        }
    }

    /// Read an MPQ header, positioned at the magic
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let magic = reader.read_u32::<LittleEndian>()?;
        if magic != MPQ_MAGIC {
            return Err(Error::invalid_format(format!(
                "invalid MPQ magic: 0x{magic:08X}"
            )));
        }

        let header_size = reader.read_u32::<LittleEndian>()?;
        let archive_size = reader.read_u32::<LittleEndian>()?;
        let format_version_raw = reader.read_u16::<LittleEndian>()?;
        let sector_size_shift = reader.read_u16::<LittleEndian>()?;
        let hash_table_pos = reader.read_u32::<LittleEndian>()?;
        let block_table_pos = reader.read_u32::<LittleEndian>()?;
        let hash_table_size = reader.read_u32::<LittleEndian>()?;
        let block_table_size = reader.read_u32::<LittleEndian>()?;

        let format_version = FormatVersion::from_raw(format_version_raw)
            .ok_or(Error::UnsupportedVersion(format_version_raw))?;

        if header_size < format_version.header_size() {
            return Err(Error::invalid_format(format!(
                "header size 0x{header_size:X} too small for version {format_version:?}"
            )));
        }

        let mut header = MpqHeader {
            header_size,
            archive_size,
            format_version,
            sector_size_shift,
            hash_table_pos,
            block_table_pos,
            hash_table_size,
            block_table_size,
            hi_block_table_pos: None,
            hash_table_pos_hi: None,
            block_table_pos_hi: None,
        };

        if format_version >= FormatVersion::V2 {
            header.hi_block_table_pos = Some(reader.read_u64::<LittleEndian>()?);
            header.hash_table_pos_hi = Some(reader.read_u16::<LittleEndian>()?);
            header.block_table_pos_hi = Some(reader.read_u16::<LittleEndian>()?);
        }

        Ok(header)
    }

    /// Write the header, positioned at its target offset
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(MPQ_MAGIC)?;
        writer.write_u32::<LittleEndian>(self.header_size)?;
        writer.write_u32::<LittleEndian>(self.archive_size)?;
        writer.write_u16::<LittleEndian>(self.format_version as u16)?;
        writer.write_u16::<LittleEndian>(self.sector_size_shift)?;
        writer.write_u32::<LittleEndian>(self.hash_table_pos)?;
        writer.write_u32::<LittleEndian>(self.block_table_pos)?;
        writer.write_u32::<LittleEndian>(self.hash_table_size)?;
        writer.write_u32::<LittleEndian>(self.block_table_size)?;

        if self.format_version >= FormatVersion::V2 {
            writer.write_u64::<LittleEndian>(self.hi_block_table_pos.unwrap_or(0))?;
            writer.write_u16::<LittleEndian>(self.hash_table_pos_hi.unwrap_or(0))?;
            writer.write_u16::<LittleEndian>(self.block_table_pos_hi.unwrap_or(0))?;
        }

        Ok(())
    }

    /// Get the full hash table offset, relative to the header
    pub fn hash_table_pos_64(&self) -> u64 {
        let hi = self.hash_table_pos_hi.unwrap_or(0) as u64;
        (hi << 32) | self.hash_table_pos as u64
    }

    /// Get the full block table offset, relative to the header
    pub fn block_table_pos_64(&self) -> u64 {
        let hi = self.block_table_pos_hi.unwrap_or(0) as u64;
        (hi << 32) | self.block_table_pos as u64
    }

    /// Set the full hash table offset
    pub fn set_hash_table_pos_64(&mut self, pos: u64) {
        self.hash_table_pos = pos as u32;
        if self.format_version >= FormatVersion::V2 {
            self.hash_table_pos_hi = Some((pos >> 32) as u16);
        }
    }

    /// Set the full block table offset
    pub fn set_block_table_pos_64(&mut self, pos: u64) {
        self.block_table_pos = pos as u32;
        if self.format_version >= FormatVersion::V2 {
            self.block_table_pos_hi = Some((pos >> 32) as u16);
        }
    }

    /// Sector size in bytes
    pub fn sector_size(&self) -> usize {
        1usize << self.sector_size_shift
    }
}

/// Locate the MPQ header in a file
///
/// Scans successive 512-byte alignments for the archive magic, which skips
/// any user-data envelope in front of the archive. Returns the byte offset
/// of the header (the archive origin) along with the parsed header.
pub fn find_header<R: Read + Seek>(reader: &mut R) -> Result<(u64, MpqHeader)> {
    let file_size = reader.seek(SeekFrom::End(0))?;
    let mut offset = 0u64;

    while offset < file_size {
        reader.seek(SeekFrom::Start(offset))?;

        match reader.read_u32::<LittleEndian>() {
            Ok(MPQ_MAGIC) => {
                reader.seek(SeekFrom::Start(offset))?;
                let header = MpqHeader::read(reader)?;
                return Ok((offset, header));
            }
            Ok(_) | Err(_) => {
                offset += HEADER_ALIGNMENT;
            }
        }
    }

    Err(Error::invalid_format("no MPQ header found"))
}
