//! Patch chain overlay resolver
//!
//! A [`PatchChain`] layers multiple archives into one virtual filesystem.
//! Archives are ordered by ascending priority (the last archive wins), and
//! a higher-priority archive overrides lower ones per file, including via
//! deletion markers that make a file disappear from the merged view.
//!
//! A resolved-name cache maps normalized names to the owning archive. The
//! cache is an optimization only: resolution always re-validates against a
//! fresh block lookup, invalidating and rebuilding the cache when the
//! lookup fails. When any member archive cannot enumerate its (listfile),
//! the resolver degrades to a linear per-query search.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::archive::{Archive, FileInfo};
use crate::path::{fold_mpq_path, normalize_mpq_path};
use crate::special_files::PatchMetadata;
use crate::{Error, Result};

/// Name resolution cache state
#[derive(Debug)]
enum NameCache {
    /// Not built yet
    Stale,
    /// Folded name to archive index (highest priority owner)
    Built(HashMap<String, usize>),
    /// Listfile enumeration failed; resolve by linear search
    Degraded,
}

/// A prioritized overlay of MPQ archives
#[derive(Debug)]
pub struct PatchChain {
    /// Members in ascending priority; the last archive wins
    archives: Vec<ChainMember>,
    /// Patch metadata per member path, read eagerly at open
    metadata: HashMap<PathBuf, PatchMetadata>,
    cache: NameCache,
}

#[derive(Debug)]
struct ChainMember {
    archive: Archive,
    path: PathBuf,
}

impl PatchChain {
    /// Open a chain of archives in ascending priority order
    ///
    /// If any member fails to open, the already-opened members are closed
    /// and the error is returned.
    pub fn open<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut archives: Vec<ChainMember> = Vec::with_capacity(paths.len());
        let mut metadata = HashMap::new();

        for path in paths {
            let path = path.as_ref();
            let mut archive = match Archive::open(path) {
                Ok(archive) => archive,
                Err(err) => {
                    for member in archives {
                        let _ = member.archive.close();
                    }
                    return Err(err);
                }
            };

            if let Ok(Some(meta)) = archive.patch_metadata() {
                metadata.insert(path.to_path_buf(), meta);
            }

            archives.push(ChainMember {
                archive,
                path: path.to_path_buf(),
            });
        }

        Ok(PatchChain {
            archives,
            metadata,
            cache: NameCache::Stale,
        })
    }

    /// Number of archives in the chain
    pub fn archive_count(&self) -> usize {
        self.archives.len()
    }

    /// Check whether the merged view contains the given file
    ///
    /// A deletion marker in the winning archive shadows every
    /// lower-priority version, so the file reports as absent.
    pub fn has_file(&mut self, name: &str) -> bool {
        match self.resolve(name) {
            Some((_, info)) => !info.is_delete_marker(),
            None => false,
        }
    }

    /// Read the winning version of a file into memory
    pub fn read_file(&mut self, name: &str) -> Result<Vec<u8>> {
        let name = normalize_mpq_path(name);
        let (index, info) = self
            .resolve(&name)
            .ok_or_else(|| Error::FileNotFound(format!("{name} (not in patch chain)")))?;

        if info.is_delete_marker() {
            return Err(Error::MarkedForDeletion(name));
        }
        self.archives[index].archive.read_file_data(&info)
    }

    /// Extract the winning version of a file to the given destination
    pub fn extract_file<P: AsRef<Path>>(&mut self, name: &str, dest: P) -> Result<()> {
        let name = normalize_mpq_path(name);
        let (index, info) = self
            .resolve(&name)
            .ok_or_else(|| Error::FileNotFound(format!("{name} (not in patch chain)")))?;

        if info.is_delete_marker() {
            return Err(Error::MarkedForDeletion(name));
        }
        self.archives[index].archive.extract_file(&name, dest)
    }

    /// Check whether any archive carries the file as a patch payload
    ///
    /// Scans from highest to lowest priority with fresh block lookups.
    pub fn has_patch_file(&self, name: &str) -> bool {
        for member in self.archives.iter().rev() {
            if let Some(info) = member.archive.find_file(name) {
                if info.is_patch_file() {
                    return true;
                }
            }
        }
        false
    }

    /// Union of every member's listed contents
    ///
    /// Names are deduplicated case-insensitively; a member that cannot
    /// enumerate its listfile is skipped with a warning.
    pub fn list_files(&mut self) -> Result<Vec<String>> {
        let mut seen = HashMap::new();
        let mut result = Vec::new();

        for member in self.archives.iter_mut() {
            let files = match member.archive.list_files() {
                Ok(files) => files,
                Err(err) => {
                    log::warn!(
                        "listing {} failed ({err}), continuing with remaining archives",
                        member.path.display()
                    );
                    continue;
                }
            };
            for file in files {
                let key = fold_mpq_path(&file);
                if seen.insert(key, ()).is_none() {
                    result.push(file);
                }
            }
        }

        Ok(result)
    }

    /// Patch metadata of a member archive, if it carried (patch_metadata)
    pub fn patch_metadata<P: AsRef<Path>>(&self, archive_path: P) -> Option<&PatchMetadata> {
        self.metadata.get(archive_path.as_ref())
    }

    /// Close every member archive
    ///
    /// All members are closed even if one fails; the first error is
    /// returned.
    pub fn close(self) -> Result<()> {
        let mut first_err = None;
        for member in self.archives {
            if let Err(err) = member.archive.close() {
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Resolve a name to its winning archive and block info
    ///
    /// The cache maps listed names to their owner; the authoritative answer
    /// is always a fresh block lookup. A cache hit whose lookup fails
    /// invalidates the cache and retries once; names missing from the cache
    /// (unlisted files) and degraded mode fall back to a linear scan from
    /// highest to lowest priority.
    fn resolve(&mut self, name: &str) -> Option<(usize, FileInfo)> {
        let name = normalize_mpq_path(name);
        let key = fold_mpq_path(&name);

        if matches!(self.cache, NameCache::Stale) {
            self.rebuild_cache();
        }

        if let Some(index) = self.cached_owner(&key) {
            if let Some(info) = self.archives[index].archive.find_file(&name) {
                return Some((index, info));
            }
            // Cached owner no longer resolves; rebuild and retry once.
            self.rebuild_cache();
            if let Some(index) = self.cached_owner(&key) {
                if let Some(info) = self.archives[index].archive.find_file(&name) {
                    return Some((index, info));
                }
            }
        }

        // Unlisted names and degraded mode: scan archives directly.
        for (index, member) in self.archives.iter().enumerate().rev() {
            if let Some(info) = member.archive.find_file(&name) {
                return Some((index, info));
            }
        }
        None
    }

    /// Cache lookup of a folded name's owning archive index
    fn cached_owner(&self, key: &str) -> Option<usize> {
        match &self.cache {
            NameCache::Built(map) => map.get(key).copied(),
            _ => None,
        }
    }

    /// Rebuild the name cache from member listfiles
    ///
    /// Iterates from highest to lowest priority, recording each name on
    /// first sight. Any enumeration failure puts the resolver into
    /// degraded (linear search) mode.
    fn rebuild_cache(&mut self) {
        let mut map = HashMap::new();

        for (index, member) in self.archives.iter_mut().enumerate().rev() {
            match member.archive.list_files() {
                Ok(files) => {
                    for file in files {
                        map.entry(fold_mpq_path(&file)).or_insert(index);
                    }
                }
                Err(err) => {
                    log::warn!(
                        "listing {} failed ({err}), patch chain falls back to linear search",
                        member.path.display()
                    );
                    self.cache = NameCache::Degraded;
                    return;
                }
            }
        }

        self.cache = NameCache::Built(map);
    }
}
