//! (listfile) parsing
//!
//! The auto-generated (listfile) holds one archive path per `\r\n`-terminated
//! line. Third-party listfiles may use bare `\n`, carry comments (`;`, `#`)
//! or trailing metadata after a semicolon; parsing tolerates all of these.

/// Parse a (listfile) into individual archive paths
///
/// Empty lines, comments and the `(listfile)` self-entry are dropped.
pub fn parse_listfile(data: &[u8]) -> Vec<String> {
    let content = match std::str::from_utf8(data) {
        Ok(s) => s.to_string(),
        Err(_) => {
            log::warn!("(listfile) contains invalid UTF-8, using lossy conversion");
            String::from_utf8_lossy(data).into_owned()
        }
    };

    content
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                return None;
            }

            let name = match line.find(';') {
                Some(pos) => line[..pos].trim_end(),
                None => line,
            };

            if name.is_empty() || name.eq_ignore_ascii_case("(listfile)") {
                None
            } else {
                Some(name.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_crlf_terminated() {
        let content = b"Data\\Test1.txt\r\nData\\SubDir\\Test2.txt\r\n";
        let files = parse_listfile(content);
        assert_eq!(files, ["Data\\Test1.txt", "Data\\SubDir\\Test2.txt"]);
    }

    #[test]
    fn test_parse_bare_newlines() {
        let files = parse_listfile(b"file1.txt\nfile2.dat\nfile3.bin");
        assert_eq!(files, ["file1.txt", "file2.dat", "file3.bin"]);
    }

    #[test]
    fn test_self_entry_is_dropped() {
        let files = parse_listfile(b"file1.txt\r\n(listfile)\r\nfile2.txt\r\n");
        assert_eq!(files, ["file1.txt", "file2.txt"]);
    }

    #[test]
    fn test_comments_and_metadata() {
        let content = b"; comment line\nfile1.txt\n# another comment\nfile2.dat;1234\n\n";
        let files = parse_listfile(content);
        assert_eq!(files, ["file1.txt", "file2.dat"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_listfile(b"").is_empty());
        assert!(parse_listfile(b"\r\n\r\n").is_empty());
    }
}
