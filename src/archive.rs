//! Read-only MPQ archive handling
//!
//! [`Archive`] opens an existing archive, locates its header behind any
//! user-data envelope, decrypts the directory tables, and decodes file
//! payloads: per-sector or single-unit storage, optional encryption with
//! filename-derived keys, optional compression with a method prefix byte,
//! and optional sector checksums.

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::checksum::adler32;
use crate::compression;
use crate::crypto::{decrypt_block, decrypt_bytes, file_key, SignatureInfo};
use crate::header::{find_header, FormatVersion, MpqHeader};
use crate::path::normalize_mpq_path;
use crate::special_files::{parse_listfile, PatchMetadata};
use crate::tables::{BlockEntry, BlockTable, HashTable, HiBlockTable};
use crate::{Error, Result};

/// Resolved location and flags of a file inside an archive
#[derive(Debug, Clone)]
pub struct FileInfo {
    /// Normalized archive path used for the lookup
    pub name: String,
    /// Index into the block table
    pub block_index: usize,
    /// File position relative to the archive origin (64-bit, hi-block applied)
    pub file_pos: u64,
    /// Stored (compressed) size in bytes
    pub compressed_size: u64,
    /// Uncompressed size in bytes
    pub file_size: u64,
    /// Block flags
    pub flags: u32,
}

impl FileInfo {
    /// Check if the file is compressed
    pub fn is_compressed(&self) -> bool {
        self.flags & (BlockEntry::FLAG_COMPRESS | BlockEntry::FLAG_IMPLODE) != 0
    }

    /// Check if the file is encrypted
    pub fn is_encrypted(&self) -> bool {
        self.flags & BlockEntry::FLAG_ENCRYPTED != 0
    }

    /// Check if the file is stored as a single unit
    pub fn is_single_unit(&self) -> bool {
        self.flags & BlockEntry::FLAG_SINGLE_UNIT != 0
    }

    /// Check if the file carries sector checksums
    pub fn has_sector_crc(&self) -> bool {
        self.flags & BlockEntry::FLAG_SECTOR_CRC != 0
    }

    /// Check if the file is a patch payload
    pub fn is_patch_file(&self) -> bool {
        self.flags & BlockEntry::FLAG_PATCH_FILE != 0
    }

    /// Check if the entry is a deletion tombstone
    pub fn is_delete_marker(&self) -> bool {
        self.flags & BlockEntry::FLAG_DELETE_MARKER != 0
    }
}

/// A read-only MPQ archive
#[derive(Debug)]
pub struct Archive {
    file: File,
    path: PathBuf,
    archive_offset: u64,
    header: MpqHeader,
    hash_table: HashTable,
    block_table: BlockTable,
    hi_block_table: Option<HiBlockTable>,
    sector_size: usize,
}

impl Archive {
    /// Open an existing MPQ archive for reading
    ///
    /// Supports both V1 and V2 archives; later format versions are rejected.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file =
            File::open(path).map_err(|e| Error::io(format!("open {}", path.display()), e))?;

        let (archive_offset, header) = find_header(&mut file)?;

        let hash_table = HashTable::read(
            &mut file,
            archive_offset + header.hash_table_pos_64(),
            header.hash_table_size,
        )?;

        let block_table = BlockTable::read(
            &mut file,
            archive_offset + header.block_table_pos_64(),
            header.block_table_size,
        )?;

        let hi_block_table = match header.hi_block_table_pos {
            Some(pos) if pos != 0 => Some(HiBlockTable::read(
                &mut file,
                archive_offset + pos,
                header.block_table_size,
            )?),
            _ => None,
        };

        log::debug!(
            "opened {}: origin 0x{archive_offset:X}, {} hash slots, {} blocks",
            path.display(),
            header.hash_table_size,
            header.block_table_size
        );

        Ok(Archive {
            file,
            path: path.to_path_buf(),
            sector_size: header.sector_size(),
            archive_offset,
            header,
            hash_table,
            block_table,
            hi_block_table,
        })
    }

    /// Look up a file, returning its resolved location and flags
    ///
    /// Only entries whose block slot is live (EXISTS flag set) are returned.
    /// Deletion markers are live entries; callers that want override
    /// semantics check [`FileInfo::is_delete_marker`].
    pub fn find_file(&self, name: &str) -> Option<FileInfo> {
        let name = normalize_mpq_path(name);

        let hash_entry = self.hash_table.find(&name)?;
        let block_index = hash_entry.block_index as usize;
        let block = self.block_table.get(block_index)?;
        if !block.exists() {
            return None;
        }

        let hi = self
            .hi_block_table
            .as_ref()
            .map(|t| t.get(block_index))
            .unwrap_or(0) as u64;

        Some(FileInfo {
            name,
            block_index,
            file_pos: (hi << 32) | block.file_pos as u64,
            compressed_size: block.compressed_size as u64,
            file_size: block.file_size as u64,
            flags: block.flags,
        })
    }

    /// Check whether the archive contains the given file
    ///
    /// Deletion markers report `false`.
    pub fn has_file(&self, name: &str) -> bool {
        self.find_file(name)
            .map(|info| !info.is_delete_marker())
            .unwrap_or(false)
    }

    /// Check whether the file is a deletion tombstone
    pub fn is_delete_marker(&self, name: &str) -> bool {
        self.find_file(name)
            .map(|info| info.is_delete_marker())
            .unwrap_or(false)
    }

    /// Check whether the file is flagged as a patch payload
    pub fn is_patch_file(&self, name: &str) -> bool {
        self.find_file(name)
            .map(|info| info.is_patch_file())
            .unwrap_or(false)
    }

    /// Read a file's contents into memory
    pub fn read_file(&mut self, name: &str) -> Result<Vec<u8>> {
        let info = self
            .find_file(name)
            .ok_or_else(|| Error::FileNotFound(normalize_mpq_path(name)))?;
        self.read_file_data(&info)
    }

    /// Extract a file to the given destination path
    ///
    /// Parent directories of the destination are created as needed.
    pub fn extract_file<P: AsRef<Path>>(&mut self, name: &str, dest: P) -> Result<()> {
        let data = self.read_file(name)?;
        let dest = dest.as_ref();

        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| Error::io(format!("create {}", parent.display()), e))?;
            }
        }
        fs::write(dest, data).map_err(|e| Error::io(format!("write {}", dest.display()), e))
    }

    /// List the archive's contents by reading the (listfile)
    pub fn list_files(&mut self) -> Result<Vec<String>> {
        let data = self.read_file("(listfile)")?;
        Ok(parse_listfile(&data))
    }

    /// Read and parse the (signature) special file, if present
    pub fn read_signature(&mut self) -> Result<Option<SignatureInfo>> {
        let Some(info) = self.find_file("(signature)") else {
            return Ok(None);
        };

        let data = self.read_file_data(&info)?;
        SignatureInfo::parse(&data).map(Some)
    }

    /// Read and parse the (patch_metadata) special file, if present
    pub fn patch_metadata(&mut self) -> Result<Option<PatchMetadata>> {
        let Some(info) = self.find_file("(patch_metadata)") else {
            return Ok(None);
        };

        let data = self.read_file_data(&info)?;
        PatchMetadata::parse(&data).map(Some)
    }

    /// Number of live entries in the block table
    pub fn file_count(&self) -> usize {
        self.block_table
            .entries()
            .iter()
            .filter(|e| e.exists())
            .count()
    }

    /// Sector size in bytes
    pub fn sector_size(&self) -> usize {
        self.sector_size
    }

    /// Format version of the archive
    pub fn format_version(&self) -> FormatVersion {
        self.header.format_version
    }

    /// The archive header
    pub fn header(&self) -> &MpqHeader {
        &self.header
    }

    /// Byte offset of the header within the backing file
    pub fn archive_offset(&self) -> u64 {
        self.archive_offset
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the archive, releasing the backing file
    pub fn close(self) -> Result<()> {
        drop(self.file);
        Ok(())
    }

    /// Read and fully decode a file's payload
    pub(crate) fn read_file_data(&mut self, info: &FileInfo) -> Result<Vec<u8>> {
        self.file
            .seek(SeekFrom::Start(self.archive_offset + info.file_pos))?;
        let mut data = vec![0u8; info.compressed_size as usize];
        self.file
            .read_exact(&mut data)
            .map_err(|e| Error::io(format!("read {}", info.name), e))?;

        if info.is_single_unit() {
            self.decode_single_unit(data, info)
        } else if info.is_compressed() || info.is_encrypted() {
            let key = info.is_encrypted().then(|| {
                file_key(
                    &info.name,
                    info.file_pos,
                    info.file_size as u32,
                    info.flags,
                )
            });
            self.decode_sectored(data, info, key)
        } else {
            // Raw contiguous payload.
            Ok(data)
        }
    }

    /// Decode a single-unit payload: decrypt, verify the trailing checksum,
    /// then decompress
    fn decode_single_unit(&self, mut data: Vec<u8>, info: &FileInfo) -> Result<Vec<u8>> {
        if info.is_encrypted() {
            let key = file_key(
                &info.name,
                info.file_pos,
                info.file_size as u32,
                info.flags,
            );
            decrypt_bytes(&mut data, key);
        }

        if info.has_sector_crc() {
            if data.len() < 4 {
                return Err(Error::invalid_format(format!(
                    "missing trailing checksum for {}",
                    info.name
                )));
            }
            let split = data.len() - 4;
            let expected =
                u32::from_le_bytes([data[split], data[split + 1], data[split + 2], data[split + 3]]);
            // The writer checksums the stored bytes, before any decompression.
            let actual = adler32(&data[..split]);
            if actual != expected {
                return Err(Error::ChecksumMismatch {
                    file: info.name.clone(),
                    expected,
                    actual,
                });
            }
            data.truncate(split);
        }

        if info.is_compressed() && (data.len() as u64) < info.file_size {
            if data.is_empty() {
                return Err(Error::compression(format!(
                    "empty compressed payload for {}",
                    info.name
                )));
            }
            compression::decompress(&data[1..], data[0], info.file_size as usize)
        } else {
            Ok(data)
        }
    }

    /// Decode a sectored payload
    ///
    /// Layout: a (numSectors+1)-entry offset table, an optional per-sector
    /// checksum table, then the concatenated sector payloads. With
    /// encryption, the offset table uses `key - 1`, the checksum table
    /// `key - 1 + numSectors`, and sector `i` uses `key + i`.
    fn decode_sectored(
        &self,
        data: Vec<u8>,
        info: &FileInfo,
        key: Option<u32>,
    ) -> Result<Vec<u8>> {
        let sector_size = self.sector_size as u64;
        let num_sectors = info.file_size.div_ceil(sector_size) as usize;
        let offset_table_size = (num_sectors + 1) * 4;

        if data.len() < offset_table_size {
            return Err(Error::invalid_format(format!(
                "payload of {} too small for sector offset table",
                info.name
            )));
        }

        let mut offsets: Vec<u32> = data[..offset_table_size]
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        if let Some(key) = key {
            decrypt_block(&mut offsets, key.wrapping_sub(1));
        }

        // Sector offsets are absolute within the stored blob and must
        // delimit it exactly.
        for pair in offsets.windows(2) {
            if pair[1] < pair[0] {
                return Err(Error::invalid_format(format!(
                    "non-monotonic sector offsets in {}: {} then {}",
                    info.name, pair[0], pair[1]
                )));
            }
        }
        if offsets.iter().any(|&o| o as usize > data.len()) {
            return Err(Error::invalid_format(format!(
                "sector offset out of range in {}",
                info.name
            )));
        }
        if offsets[num_sectors] as usize != data.len() {
            return Err(Error::invalid_format(format!(
                "sector offsets of {} do not cover the stored payload",
                info.name
            )));
        }

        let mut crc_table: Option<Vec<u32>> = None;
        if info.has_sector_crc() {
            let crc_table_end = offset_table_size + num_sectors * 4;
            // Tolerate archives that set the flag without storing a table:
            // the first sector offset reveals whether one is present.
            if offsets[0] as usize >= crc_table_end {
                if crc_table_end > data.len() {
                    return Err(Error::invalid_format(format!(
                        "sector checksum table of {} out of range",
                        info.name
                    )));
                }
                let mut crcs: Vec<u32> = data[offset_table_size..crc_table_end]
                    .chunks_exact(4)
                    .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect();
                if let Some(key) = key {
                    decrypt_block(
                        &mut crcs,
                        key.wrapping_sub(1).wrapping_add(num_sectors as u32),
                    );
                }
                crc_table = Some(crcs);
            }
        }

        let mut result = Vec::with_capacity(info.file_size as usize);

        for i in 0..num_sectors {
            let start = offsets[i] as usize;
            let end = offsets[i + 1] as usize;
            let mut sector = data[start..end].to_vec();

            if let Some(key) = key {
                decrypt_bytes(&mut sector, key.wrapping_add(i as u32));
            }

            // The last sector may be shorter than the sector size.
            let expected_len = if i == num_sectors - 1 {
                (info.file_size - (i as u64) * sector_size) as usize
            } else {
                sector_size as usize
            };

            let sector_out = if info.is_compressed() && sector.len() < expected_len {
                if sector.is_empty() {
                    return Err(Error::compression(format!(
                        "empty sector {i} in {}",
                        info.name
                    )));
                }
                compression::decompress(&sector[1..], sector[0], expected_len)?
            } else {
                sector
            };

            if let Some(crcs) = &crc_table {
                let actual = adler32(&sector_out);
                if actual != crcs[i] {
                    return Err(Error::ChecksumMismatch {
                        file: format!("{} sector {i}", info.name),
                        expected: crcs[i],
                        actual,
                    });
                }
            }

            result.extend_from_slice(&sector_out);
        }

        Ok(result)
    }
}
