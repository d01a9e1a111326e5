//! Patch chain override, deletion and priority scenarios

use std::path::{Path, PathBuf};

use mpq::{Archive, ArchiveBuilder, Error, PatchChain};
use tempfile::TempDir;

fn create_archive(dir: &Path, name: &str, files: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(name);
    let mut builder = ArchiveBuilder::create(&path, files.len().max(1)).unwrap();
    for (archive_path, data) in files {
        builder.add_file_data(data.to_vec(), archive_path).unwrap();
    }
    builder.close().unwrap();
    path
}

#[test]
fn test_patch_overrides_base() {
    let temp = TempDir::new().unwrap();

    let base = create_archive(
        temp.path(),
        "base.mpq",
        &[("Data\\File.txt", b"Base content")],
    );
    let patch = create_archive(
        temp.path(),
        "patch.mpq",
        &[("Data\\File.txt", b"Patched content")],
    );

    let mut chain = PatchChain::open(&[&base, &patch]).unwrap();
    assert_eq!(chain.archive_count(), 2);
    assert!(chain.has_file("Data\\File.txt"));
    assert_eq!(chain.read_file("Data\\File.txt").unwrap(), b"Patched content");

    let dest = temp.path().join("out/File.txt");
    chain.extract_file("Data\\File.txt", &dest).unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), b"Patched content");

    chain.close().unwrap();
}

#[test]
fn test_deletion_marker_shadows_base() {
    let temp = TempDir::new().unwrap();

    let base = create_archive(temp.path(), "base.mpq", &[("Data\\File.txt", b"Base")]);

    let patch_path = temp.path().join("patch.mpq");
    let mut builder = ArchiveBuilder::create(&patch_path, 10).unwrap();
    builder.add_delete_marker("Data\\File.txt").unwrap();
    builder.close().unwrap();

    let mut chain = PatchChain::open(&[base, patch_path]).unwrap();
    assert!(!chain.has_file("Data\\File.txt"));

    let dest = temp.path().join("out/File.txt");
    match chain.extract_file("Data\\File.txt", &dest) {
        Err(Error::MarkedForDeletion(name)) => assert_eq!(name, "Data\\File.txt"),
        other => panic!("expected MarkedForDeletion, got {other:?}"),
    }
    match chain.read_file("Data\\File.txt") {
        Err(Error::MarkedForDeletion(_)) => {}
        other => panic!("expected MarkedForDeletion, got {other:?}"),
    }
}

#[test]
fn test_multi_patch_priority() {
    let temp = TempDir::new().unwrap();

    let versions = ["1.0.0", "1.1.0", "1.2.0", "1.3.0"];
    let paths: Vec<PathBuf> = versions
        .iter()
        .enumerate()
        .map(|(i, v)| {
            create_archive(
                temp.path(),
                &format!("chain{i}.mpq"),
                &[("Data\\Version.txt", v.as_bytes())],
            )
        })
        .collect();

    let mut chain = PatchChain::open(&paths).unwrap();
    assert_eq!(chain.archive_count(), 4);
    assert_eq!(chain.read_file("Data\\Version.txt").unwrap(), b"1.3.0");

    chain.close().unwrap();
}

#[test]
fn test_base_survives_unrelated_patch() {
    let temp = TempDir::new().unwrap();

    let base = create_archive(
        temp.path(),
        "base.mpq",
        &[("only_in_base.txt", b"base data")],
    );
    let patch = create_archive(
        temp.path(),
        "patch.mpq",
        &[("only_in_patch.txt", b"patch data")],
    );

    let mut chain = PatchChain::open(&[base, patch]).unwrap();
    assert_eq!(chain.read_file("only_in_base.txt").unwrap(), b"base data");
    assert_eq!(chain.read_file("only_in_patch.txt").unwrap(), b"patch data");
    assert!(!chain.has_file("in_neither.txt"));
    assert!(matches!(
        chain.read_file("in_neither.txt"),
        Err(Error::FileNotFound(_))
    ));
}

#[test]
fn test_list_files_union() {
    let temp = TempDir::new().unwrap();

    let base = create_archive(
        temp.path(),
        "base.mpq",
        &[("a.txt", b"1"), ("b.txt", b"2")],
    );
    let patch = create_archive(
        temp.path(),
        "patch.mpq",
        &[("B.TXT", b"2'"), ("c.txt", b"3")],
    );

    let mut chain = PatchChain::open(&[base, patch]).unwrap();
    let files = chain.list_files().unwrap();

    // b.txt and B.TXT collapse case-insensitively.
    assert_eq!(files.len(), 3);
    assert!(files.iter().any(|f| f.eq_ignore_ascii_case("a.txt")));
    assert!(files.iter().any(|f| f.eq_ignore_ascii_case("b.txt")));
    assert!(files.iter().any(|f| f.eq_ignore_ascii_case("c.txt")));
}

#[test]
fn test_has_patch_file() {
    let temp = TempDir::new().unwrap();

    let base = create_archive(temp.path(), "base.mpq", &[("Data\\File.txt", b"full")]);

    let patch_path = temp.path().join("patch.mpq");
    let mut builder = ArchiveBuilder::create(&patch_path, 10).unwrap();
    builder
        .add_file_data_with_options(
            b"delta".to_vec(),
            "Data\\File.txt",
            mpq::AddFileOptions::new().as_patch_file(),
        )
        .unwrap();
    builder.close().unwrap();

    let chain = PatchChain::open(&[base.clone(), patch_path]).unwrap();
    assert!(chain.has_patch_file("Data\\File.txt"));
    assert!(!chain.has_patch_file("Data\\Other.txt"));

    let base_only = PatchChain::open(&[base]).unwrap();
    assert!(!base_only.has_patch_file("Data\\File.txt"));
}

#[test]
fn test_patch_metadata_absent() {
    let temp = TempDir::new().unwrap();

    let base = create_archive(temp.path(), "base.mpq", &[("f.txt", b"x")]);
    let chain = PatchChain::open(&[&base]).unwrap();
    assert!(chain.patch_metadata(&base).is_none());
}

#[test]
fn test_open_failure_closes_earlier_members() {
    let temp = TempDir::new().unwrap();

    let good = create_archive(temp.path(), "good.mpq", &[("f.txt", b"x")]);
    let missing = temp.path().join("missing.mpq");

    assert!(PatchChain::open(&[good, missing]).is_err());
}

#[test]
fn test_unlisted_file_resolves_through_linear_scan() {
    let temp = TempDir::new().unwrap();

    let base = create_archive(temp.path(), "base.mpq", &[("listed.txt", b"data")]);

    // The cache is built from listfiles; a name missing from every listfile
    // must still resolve through direct hash table lookups.
    let mut chain = PatchChain::open(&[&base]).unwrap();
    assert!(chain.has_file("(listfile)"));
    assert_eq!(chain.read_file("listed.txt").unwrap(), b"data");
}

#[test]
fn test_single_archive_chain_behaves_like_archive() {
    let temp = TempDir::new().unwrap();

    let content: &[u8] = b"same bytes through either API";
    let path = create_archive(temp.path(), "single.mpq", &[("Data\\X.bin", content)]);

    let mut direct = Archive::open(&path).unwrap();
    let mut chain = PatchChain::open(&[&path]).unwrap();

    assert_eq!(
        direct.read_file("Data\\X.bin").unwrap(),
        chain.read_file("Data\\X.bin").unwrap()
    );
}
