//! Archive modification
//!
//! [`MutableArchive`] opens an existing archive and stages changes: new or
//! replacement files, deletion markers, and removals. Nothing is written
//! until [`close`](MutableArchive::close), which decodes every surviving
//! file out of the old archive, merges the staged changes, and rewrites the
//! whole archive through the same serializer the builder uses, atomically
//! replacing the original.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::archive::{Archive, FileInfo};
use crate::builder::{persist_archive, write_archive, AddFileOptions, PendingFile};
use crate::path::{fold_mpq_path, normalize_mpq_path};
use crate::{Error, Result};

/// A handle for modifying an existing MPQ archive
#[derive(Debug)]
pub struct MutableArchive {
    archive: Archive,
    temp: NamedTempFile,
    pending_files: Vec<PendingFile>,
    removed_files: HashSet<String>,
}

impl MutableArchive {
    /// Open an existing archive for modification
    ///
    /// The backing file is never touched in place: a sibling temporary file
    /// receives the rewritten archive on close.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let archive = Archive::open(&path)?;

        let parent = match path.as_ref().parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let temp = NamedTempFile::new_in(&parent)
            .map_err(|e| Error::io(format!("create temporary file in {}", parent.display()), e))?;

        Ok(MutableArchive {
            archive,
            temp,
            pending_files: Vec::new(),
            removed_files: HashSet::new(),
        })
    }

    /// Queue a file from disk; replaces any existing file of the same name
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

    /// Queue in-memory bytes; replaces any existing file of the same name
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
    pub fn add_delete_marker(&mut self, archive_path: &str) -> Result<()> {
        self.pending_files
            .push(PendingFile::delete_marker(normalize_mpq_path(archive_path)));
        Ok(())
    }

    /// Mark an existing file for removal from the rewritten archive
    pub fn remove_file(&mut self, archive_path: &str) -> Result<()> {
        if !self.archive.has_file(archive_path) {
            return Err(Error::FileNotFound(normalize_mpq_path(archive_path)));
        }
        self.removed_files.insert(fold_mpq_path(archive_path));
        Ok(())
    }

    /// Look up a file in the backing archive
    pub fn find_file(&self, name: &str) -> Option<FileInfo> {
        self.archive.find_file(name)
    }

    /// Check whether the backing archive contains the given file
    pub fn has_file(&self, name: &str) -> bool {
        self.archive.has_file(name)
    }

    /// Read a file from the backing archive
    pub fn read_file(&mut self, name: &str) -> Result<Vec<u8>> {
        self.archive.read_file(name)
    }

    /// Extract a file from the backing archive
    pub fn extract_file<P: AsRef<Path>>(&mut self, name: &str, dest: P) -> Result<()> {
        self.archive.extract_file(name, dest)
    }

    /// List the backing archive's contents
    pub fn list_files(&mut self) -> Result<Vec<String>> {
        self.archive.list_files()
    }

    /// Rewrite the archive with all staged changes and atomically replace
    /// the original
    ///
    /// On any error the original archive is left untouched and the
    /// temporary file is removed.
    pub fn close(mut self) -> Result<()> {
        let merged = self.build_merged_pending()?;

        let version = self.archive.format_version();
        let sector_size_shift = self.archive.header().sector_size_shift;
        let hash_table_size = self.archive.header().hash_table_size;
        let path = self.archive.path().to_path_buf();

        let MutableArchive {
            archive, mut temp, ..
        } = self;
        // Release the source handle before replacing the file.
        archive.close()?;

        write_archive(
            temp.as_file_mut(),
            version,
            sector_size_shift,
            hash_table_size,
            &merged,
        )?;
        temp.as_file_mut().flush()?;

        persist_archive(temp, &path)
    }

    /// Rehydrate the pending queue from the existing archive
    ///
    /// Every listed file that is not removed and not an auto-generated
    /// special is decoded into memory, keeping its sector-checksum
    /// preference and patch flag. Staged replacements win over the stored
    /// version by normalized name; staged files that replace nothing are
    /// appended in insertion order.
    fn build_merged_pending(&mut self) -> Result<Vec<PendingFile>> {
        let listed = self.archive.list_files()?;

        // Collapse staged duplicates: the last add for a name wins.
        let mut staged: Vec<PendingFile> = Vec::new();
        let mut staged_index: HashMap<String, usize> = HashMap::new();
        for pf in self.pending_files.drain(..) {
            let key = fold_mpq_path(&pf.archive_name);
            match staged_index.get(&key) {
                Some(&i) => staged[i] = pf,
                None => {
                    staged_index.insert(key, staged.len());
                    staged.push(pf);
                }
            }
        }
        let mut consumed = vec![false; staged.len()];

        let mut merged = Vec::new();
        for name in listed {
            let name = normalize_mpq_path(&name);
            let key = fold_mpq_path(&name);

            if self.removed_files.contains(&key) {
                continue;
            }
            // Auto-generated specials are rebuilt by the serializer.
            if key == "(LISTFILE)" || key == "(ATTRIBUTES)" {
                continue;
            }

            if let Some(&i) = staged_index.get(&key) {
                if !consumed[i] {
                    merged.push(staged[i].clone());
                    consumed[i] = true;
                }
                continue;
            }

            // Names listed but not resolvable are dropped rather than
            // failing the whole rewrite.
            let Some(info) = self.archive.find_file(&name) else {
                log::warn!("listed file {name} not found in archive, skipping");
                continue;
            };

            if info.is_delete_marker() {
                merged.push(PendingFile::delete_marker(name));
                continue;
            }

            let data = self.archive.read_file_data(&info)?;
            merged.push(PendingFile {
                archive_name: name,
                data,
                with_crc: info.has_sector_crc(),
                as_patch_file: info.is_patch_file(),
                is_delete_marker: false,
            });
        }

        for (i, pf) in staged.into_iter().enumerate() {
            if !consumed[i] {
                merged.push(pf);
            }
        }

        Ok(merged)
    }
}
