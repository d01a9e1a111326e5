//! Path utilities for MPQ archives
//!
//! MPQ archives use backslashes (`\`) as path separators internally,
//! regardless of the host operating system. Lookups are case-insensitive:
//! the hash function uppercases ASCII letters, so `a/B`, `A\b` and `a\b`
//! all name the same file.

/// Normalize a path for storage in an MPQ archive
///
/// Converts forward slashes to backslashes to match MPQ format requirements.
pub fn normalize_mpq_path(path: &str) -> String {
    path.replace('/', "\\")
}

/// Case-folded form of a normalized path, for case-insensitive comparisons
pub(crate) fn fold_mpq_path(path: &str) -> String {
    normalize_mpq_path(path).to_ascii_uppercase()
}

/// The basename of an archive path, used for file key derivation
pub(crate) fn mpq_basename(path: &str) -> &str {
    match path.rfind(['\\', '/']) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_mpq_path() {
        assert_eq!(normalize_mpq_path("path/to/file.txt"), "path\\to\\file.txt");
        assert_eq!(
            normalize_mpq_path("path\\to\\file.txt"),
            "path\\to\\file.txt"
        );
        assert_eq!(
            normalize_mpq_path("path/to\\file.txt"),
            "path\\to\\file.txt"
        );
        assert_eq!(normalize_mpq_path(""), "");
        assert_eq!(normalize_mpq_path("file.txt"), "file.txt");
    }

    #[test]
    fn test_fold_mpq_path() {
        assert_eq!(fold_mpq_path("Data/File.txt"), "DATA\\FILE.TXT");
        assert_eq!(fold_mpq_path("data\\file.txt"), "DATA\\FILE.TXT");
    }

    #[test]
    fn test_mpq_basename() {
        assert_eq!(mpq_basename("dir\\sub\\file.txt"), "file.txt");
        assert_eq!(mpq_basename("dir/sub/file.txt"), "file.txt");
        assert_eq!(mpq_basename("file.txt"), "file.txt");
        assert_eq!(mpq_basename(""), "");
    }
}
