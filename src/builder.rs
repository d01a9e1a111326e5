//! Archive creation
//!
//! [`ArchiveBuilder`] accumulates files in a pending queue and serializes
//! the whole archive on [`close`](ArchiveBuilder::close): payloads first,
//! then the auto-generated (listfile) and (attributes), then the encrypted
//! directory tables, and finally the backfilled header. The archive is
//! written to a sibling temporary file and atomically renamed over the
//! target, with a byte-copy fallback when rename fails.

use std::fs;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::checksum::{adler32, crc32};
use crate::compression;
use crate::header::{FormatVersion, MpqHeader, DEFAULT_SECTOR_SIZE_SHIFT};
use crate::path::{fold_mpq_path, normalize_mpq_path};
use crate::special_files::Attributes;
use crate::tables::{BlockEntry, BlockTable, HashTable, HiBlockTable};
use crate::{Error, Result};

/// Options for adding a file to an archive
#[derive(Debug, Clone, Default)]
pub struct AddFileOptions {
    /// Generate sector checksums for the file
    pub with_crc: bool,
    /// Flag the entry as a patch payload
    pub as_patch_file: bool,
}

impl AddFileOptions {
    /// Create default options: no checksums, not a patch file
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable sector checksum generation
    pub fn with_crc(mut self) -> Self {
        self.with_crc = true;
        self
    }

    /// Flag the file as a patch payload
    pub fn as_patch_file(mut self) -> Self {
        self.as_patch_file = true;
        self
    }
}

/// File queued for serialization
#[derive(Debug, Clone)]
pub(crate) struct PendingFile {
    /// Normalized archive path
    pub(crate) archive_name: String,
    /// Source bytes; empty for deletion markers
    pub(crate) data: Vec<u8>,
    /// Generate sector checksums
    pub(crate) with_crc: bool,
    /// Flag as a patch payload
    pub(crate) as_patch_file: bool,
    /// Entry is a deletion tombstone
    pub(crate) is_delete_marker: bool,
}

impl PendingFile {
    pub(crate) fn new(archive_name: String, data: Vec<u8>, options: AddFileOptions) -> Self {
        PendingFile {
            archive_name,
            data,
            with_crc: options.with_crc,
            as_patch_file: options.as_patch_file,
            is_delete_marker: false,
        }
    }

    pub(crate) fn delete_marker(archive_name: String) -> Self {
        PendingFile {
            archive_name,
            data: Vec::new(),
            with_crc: false,
            as_patch_file: false,
            is_delete_marker: true,
        }
    }
}

/// Writer for new MPQ archives
///
/// Created with [`create`](ArchiveBuilder::create); files accumulate in
/// memory and nothing touches the target path until [`close`](ArchiveBuilder::close)
/// succeeds. Dropping the builder without closing discards the temporary
/// file and leaves the target untouched.
#[derive(Debug)]
pub struct ArchiveBuilder {
    path: PathBuf,
    temp: NamedTempFile,
    version: FormatVersion,
    sector_size_shift: u16,
    hash_table_size: u32,
    pending_files: Vec<PendingFile>,
}

impl ArchiveBuilder {
    /// Create a new V1 archive
    ///
    /// `max_files` sizes the hash table: the smallest power of two that is
    /// at least 1.5 times the file count, and never below 16.
    pub fn create<P: AsRef<Path>>(path: P, max_files: usize) -> Result<Self> {
        Self::create_with_version(path, max_files, FormatVersion::V1)
    }

    /// Create a new archive with the given format version
    ///
    /// V2 is required for archives that may grow past 4 GiB and is accepted
    /// by Burning Crusade and later clients.
    pub fn create_with_version<P: AsRef<Path>>(
        path: P,
        max_files: usize,
        version: FormatVersion,
    ) -> Result<Self> {
        let path = path.as_ref();

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)
            .map_err(|e| Error::io(format!("create {}", parent.display()), e))?;

        let temp = NamedTempFile::new_in(&parent)
            .map_err(|e| Error::io(format!("create temporary file in {}", parent.display()), e))?;

        Ok(ArchiveBuilder {
            path: path.to_path_buf(),
            temp,
            version,
            sector_size_shift: DEFAULT_SECTOR_SIZE_SHIFT,
            hash_table_size: hash_table_size_for(max_files),
            pending_files: Vec::new(),
        })
    }

    /// Queue a file from disk under the given archive path
    pub fn add_file<P: AsRef<Path>>(&mut self, src_path: P, archive_path: &str) -> Result<()> {
        self.add_file_with_options(src_path, archive_path, AddFileOptions::new())
    }

    /// Queue a file from disk with explicit options
    pub fn add_file_with_options<P: AsRef<Path>>(
        &mut self,
        src_path: P,
        archive_path: &str,
        options: AddFileOptions,
    ) -> Result<()> {
        let src_path = src_path.as_ref();
        let data = fs::read(src_path)
            .map_err(|e| Error::io(format!("read {}", src_path.display()), e))?;
        self.add_file_data_with_options(data, archive_path, options)
    }

    /// Queue in-memory bytes under the given archive path
    pub fn add_file_data(&mut self, data: Vec<u8>, archive_path: &str) -> Result<()> {
        self.add_file_data_with_options(data, archive_path, AddFileOptions::new())
    }

    /// Queue in-memory bytes with explicit options
    pub fn add_file_data_with_options(
        &mut self,
        data: Vec<u8>,
        archive_path: &str,
        options: AddFileOptions,
    ) -> Result<()> {
        self.pending_files.push(PendingFile::new(
            normalize_mpq_path(archive_path),
            data,
            options,
        ));
        Ok(())
    }

    /// Queue a deletion marker for the given archive path
    ///
    /// Used in patch archives to shadow a file in lower-priority archives.
    pub fn add_delete_marker(&mut self, archive_path: &str) -> Result<()> {
        self.pending_files
            .push(PendingFile::delete_marker(normalize_mpq_path(archive_path)));
        Ok(())
    }

    /// Check whether the pending queue holds the given file
    pub fn has_file(&self, archive_path: &str) -> bool {
        let key = fold_mpq_path(archive_path);
        for pf in &self.pending_files {
            if fold_mpq_path(&pf.archive_name) == key {
                return !pf.is_delete_marker;
            }
        }
        false
    }

    /// Serialize the archive and atomically move it into place
    pub fn close(mut self) -> Result<()> {
        write_archive(
            self.temp.as_file_mut(),
            self.version,
            self.sector_size_shift,
            self.hash_table_size,
            &self.pending_files,
        )?;
        self.temp.as_file_mut().flush()?;

        persist_archive(self.temp, &self.path)
    }
}

/// Hash table size for a creation request: the smallest power of two that
/// is at least `ceil(max_files * 1.5)`, and never below 16
fn hash_table_size_for(max_files: usize) -> u32 {
    let target = ((max_files as f64) * 1.5).ceil() as u32;
    target.next_power_of_two().max(16)
}

/// Rename the finished temporary file over the target path
///
/// A failed rename (typically a cross-device link) falls back to a byte
/// copy followed by removal of the temporary.
pub(crate) fn persist_archive(temp: NamedTempFile, path: &Path) -> Result<()> {
    match temp.persist(path) {
        Ok(_) => Ok(()),
        Err(persist_err) => {
            let temp = persist_err.file;
            fs::copy(temp.path(), path)
                .map_err(|e| Error::io(format!("copy archive to {}", path.display()), e))?;
            temp.close()
                .map_err(|e| Error::io("remove temporary archive", e))?;
            Ok(())
        }
    }
}

/// Serialize a complete archive from the pending queue
///
/// Files are written in insertion order; block and hash table slots are
/// assigned in that order, then (listfile) and (attributes) are appended,
/// the directory tables are encrypted and written, and the header is
/// backfilled at offset zero.
pub(crate) fn write_archive<W: Write + Seek>(
    writer: &mut W,
    version: FormatVersion,
    sector_size_shift: u16,
    hash_table_size: u32,
    pending_files: &[PendingFile],
) -> Result<()> {
    let sector_size = 1usize << sector_size_shift;

    let mut header = MpqHeader::new(version, hash_table_size);
    header.sector_size_shift = sector_size_shift;

    let mut hash_table = HashTable::new(hash_table_size)?;
    let mut block_table = BlockTable::new();
    let mut hi_block_table = HiBlockTable::new(0);

    writer.seek(SeekFrom::Start(header.header_size as u64))?;

    // The attributes file carries one CRC32 per block slot, including the
    // (listfile) and (attributes) slots appended after the user files.
    let has_specials = !pending_files.is_empty();
    let total_blocks = pending_files.len() + if has_specials { 2 } else { 0 };
    let mut attr_crc32s = vec![0u32; total_blocks];
    let mut listfile_content = String::new();

    for (i, pf) in pending_files.iter().enumerate() {
        let file_pos = writer.stream_position()?;

        if pf.is_delete_marker {
            let block_index = block_table.push(BlockEntry {
                file_pos: file_pos as u32,
                compressed_size: 0,
                file_size: 0,
                flags: BlockEntry::FLAG_EXISTS | BlockEntry::FLAG_DELETE_MARKER,
            });
            hi_block_table.set(block_index as usize, (file_pos >> 32) as u16);
            hash_table.insert(&pf.archive_name, block_index)?;
            listfile_content.push_str(&pf.archive_name);
            listfile_content.push_str("\r\n");
            continue;
        }

        let (blob, mut flags) = if pf.data.len() > sector_size * 2 {
            encode_sectored(&pf.data, sector_size, pf.with_crc)?
        } else {
            encode_single_unit(&pf.data, pf.with_crc)?
        };
        if pf.as_patch_file {
            flags |= BlockEntry::FLAG_PATCH_FILE;
        }

        writer.write_all(&blob)?;

        let block_index = block_table.push(BlockEntry {
            file_pos: file_pos as u32,
            compressed_size: blob.len() as u32,
            file_size: pf.data.len() as u32,
            flags,
        });
        hi_block_table.set(block_index as usize, (file_pos >> 32) as u16);
        hash_table.insert(&pf.archive_name, block_index)?;
        attr_crc32s[i] = crc32(&pf.data);
        listfile_content.push_str(&pf.archive_name);
        listfile_content.push_str("\r\n");
    }

    if has_specials {
        // (listfile): the accumulated names, one per CRLF-terminated line.
        let listfile_data = listfile_content.into_bytes();
        let file_pos = writer.stream_position()?;
        let (blob, flags) = encode_single_unit(&listfile_data, false)?;
        writer.write_all(&blob)?;

        let block_index = block_table.push(BlockEntry {
            file_pos: file_pos as u32,
            compressed_size: blob.len() as u32,
            file_size: listfile_data.len() as u32,
            flags,
        });
        hi_block_table.set(block_index as usize, (file_pos >> 32) as u16);
        hash_table.insert("(listfile)", block_index)?;
        attr_crc32s[pending_files.len()] = crc32(&listfile_data);

        // (attributes): its own slot keeps a zero CRC32.
        let attributes_data = Attributes::build(&attr_crc32s)?;
        let file_pos = writer.stream_position()?;
        let (blob, flags) = encode_single_unit(&attributes_data, false)?;
        writer.write_all(&blob)?;

        let block_index = block_table.push(BlockEntry {
            file_pos: file_pos as u32,
            compressed_size: blob.len() as u32,
            file_size: attributes_data.len() as u32,
            flags,
        });
        hi_block_table.set(block_index as usize, (file_pos >> 32) as u16);
        hash_table.insert("(attributes)", block_index)?;
    }

    let hash_table_pos = writer.stream_position()?;
    hash_table.write(writer)?;

    let block_table_pos = writer.stream_position()?;
    block_table.write(writer)?;

    let mut hi_block_table_pos = None;
    if version == FormatVersion::V2 && hi_block_table.is_needed() {
        hi_block_table_pos = Some(writer.stream_position()?);
        hi_block_table.write(writer)?;
    }

    let total_size = writer.stream_position()?;

    header.archive_size = (total_size - header.header_size as u64) as u32;
    header.set_hash_table_pos_64(hash_table_pos);
    header.set_block_table_pos_64(block_table_pos);
    header.block_table_size = block_table.len() as u32;
    if version == FormatVersion::V2 {
        header.hi_block_table_pos = Some(hi_block_table_pos.unwrap_or(0));
    }

    writer.seek(SeekFrom::Start(0))?;
    header.write(writer)?;

    Ok(())
}

/// Encode a single-unit payload
///
/// The whole payload is compressed as one blob and kept only if that
/// shrank it. A requested checksum is computed over the stored bytes and
/// appended; the stored size in the block entry includes those four bytes.
fn encode_single_unit(data: &[u8], with_crc: bool) -> Result<(Vec<u8>, u32)> {
    let mut flags = BlockEntry::FLAG_EXISTS | BlockEntry::FLAG_SINGLE_UNIT;

    let compressed = compression::compress(data)?;
    let mut blob = if compressed.len() < data.len() {
        flags |= BlockEntry::FLAG_COMPRESS;
        compressed
    } else {
        data.to_vec()
    };

    if with_crc {
        flags |= BlockEntry::FLAG_SECTOR_CRC;
        let crc = adler32(&blob);
        blob.extend_from_slice(&crc.to_le_bytes());
    }

    Ok((blob, flags))
}

/// Encode a sectored payload
///
/// Each sector is compressed independently and stored raw when compression
/// did not shrink it. The blob is the (numSectors+1)-entry offset table,
/// the optional checksum table over the uncompressed sector bytes, then
/// the concatenated sector payloads.
fn encode_sectored(data: &[u8], sector_size: usize, with_crc: bool) -> Result<(Vec<u8>, u32)> {
    let mut flags = BlockEntry::FLAG_EXISTS | BlockEntry::FLAG_COMPRESS;
    if with_crc {
        flags |= BlockEntry::FLAG_SECTOR_CRC;
    }

    let num_sectors = data.len().div_ceil(sector_size);
    let offset_table_size = (num_sectors + 1) * 4;
    let crc_table_size = if with_crc { num_sectors * 4 } else { 0 };

    let mut offsets = Vec::with_capacity(num_sectors + 1);
    let mut sector_crcs = Vec::with_capacity(if with_crc { num_sectors } else { 0 });
    let mut sectors = Vec::with_capacity(num_sectors);

    let mut current_offset = (offset_table_size + crc_table_size) as u32;
    for chunk in data.chunks(sector_size) {
        let compressed = compression::compress(chunk)?;
        let stored = if compressed.len() < chunk.len() {
            compressed
        } else {
            chunk.to_vec()
        };

        offsets.push(current_offset);
        current_offset += stored.len() as u32;
        if with_crc {
            sector_crcs.push(adler32(chunk));
        }
        sectors.push(stored);
    }
    offsets.push(current_offset);

    let mut blob = Vec::with_capacity(current_offset as usize);
    for offset in &offsets {
        blob.extend_from_slice(&offset.to_le_bytes());
    }
    for crc in &sector_crcs {
        blob.extend_from_slice(&crc.to_le_bytes());
    }
    for sector in &sectors {
        blob.extend_from_slice(sector);
    }

    Ok((blob, flags))
}
