//! The (attributes) special file
//!
//! Version 100, flag mask naming which per-block attribute columns are
//! present. This implementation emits and consumes only the CRC32 column;
//! one u32 per block table slot, with the (attributes) slot itself stored
//! as zero.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use crate::{Error, Result};

/// Parsed or to-be-written (attributes) contents
#[derive(Debug, Clone)]
pub struct Attributes {
    /// Attributes format version (always 100)
    pub version: u32,
    /// Flag mask of present columns
    pub flags: u32,
    /// CRC32 of each block slot's uncompressed contents
    pub crc32s: Vec<u32>,
}

impl Attributes {
    /// Expected attributes version
    pub const VERSION: u32 = 100;
    /// CRC32 column present
    pub const FLAG_CRC32: u32 = 0x0000_0001;
    /// FILETIME column present (not produced)
    pub const FLAG_FILETIME: u32 = 0x0000_0002;
    /// MD5 column present (not produced)
    pub const FLAG_MD5: u32 = 0x0000_0004;

    /// Serialize an attributes blob holding one CRC32 per block slot
    pub fn build(crc32s: &[u32]) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(8 + crc32s.len() * 4);
        data.write_u32::<LittleEndian>(Self::VERSION)?;
        data.write_u32::<LittleEndian>(Self::FLAG_CRC32)?;
        for &crc in crc32s {
            data.write_u32::<LittleEndian>(crc)?;
        }
        Ok(data)
    }

    /// Parse an attributes blob for an archive with `block_count` slots
    pub fn parse(data: &[u8], block_count: usize) -> Result<Self> {
        if data.len() < 8 {
            return Err(Error::invalid_format("attributes file too small"));
        }

        let mut cursor = Cursor::new(data);
        let version = cursor.read_u32::<LittleEndian>()?;
        if version != Self::VERSION {
            return Err(Error::invalid_format(format!(
                "unsupported attributes version: {version}"
            )));
        }
        let flags = cursor.read_u32::<LittleEndian>()?;

        let mut crc32s = Vec::new();
        if flags & Self::FLAG_CRC32 != 0 {
            if data.len() < 8 + block_count * 4 {
                return Err(Error::invalid_format("attributes CRC32 column truncated"));
            }
            crc32s.reserve(block_count);
            for _ in 0..block_count {
                crc32s.push(cursor.read_u32::<LittleEndian>()?);
            }
        }

        Ok(Attributes {
            version,
            flags,
            crc32s,
        })
    }
}
