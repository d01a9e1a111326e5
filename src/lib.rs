//! # mpq - MPQ Archive Library
//!
//! A pure-Rust reader and writer for the MPQ ("Mo'PaQ") archive container
//! used by Blizzard Entertainment games from Diablo through World of
//! Warcraft 3.3.5a. Archives produced here are bit-compatible with
//! StormLib-based tooling, and archives written by third-party tools read
//! back correctly, including those hidden behind a user-data envelope.
//!
//! ## Format support
//!
//! - MPQ format versions 1 and 2 (V2 adds 64-bit file positions via the
//!   hi-block table); versions 3 and 4 are rejected
//! - Zlib compression on write; zlib, BZip2 and PKWARE DCL on read
//! - Encrypted files on read, including `FIX_KEY` position-adjusted keys
//! - Per-sector and single-unit storage with optional Adler-32 checksums
//! - Auto-generated `(listfile)` and `(attributes)`; `(signature)` and
//!   `(patch_metadata)` parsing
//! - Patch chain overlays with priority-ordered overrides and deletion
//!   markers
//!
//! ## Examples
//!
//! ### Creating an archive
//!
//! ```no_run
//! use mpq::ArchiveBuilder;
//!
//! # fn main() -> Result<(), mpq::Error> {
//! let mut builder = ArchiveBuilder::create("patch.mpq", 100)?;
//! builder.add_file("local/readme.txt", "Data\\Readme.txt")?;
//! builder.add_file_data(b"hello".to_vec(), "Data\\Hello.txt")?;
//! builder.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Reading an archive
//!
//! ```no_run
//! use mpq::Archive;
//!
//! # fn main() -> Result<(), mpq::Error> {
//! let mut archive = Archive::open("game.mpq")?;
//! for name in archive.list_files()? {
//!     println!("{name}");
//! }
//! let data = archive.read_file("Data\\Hello.txt")?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Layering patches
//!
//! ```no_run
//! use mpq::PatchChain;
//!
//! # fn main() -> Result<(), mpq::Error> {
//! let mut chain = PatchChain::open(&["base.mpq", "patch.mpq", "patch-2.mpq"])?;
//! // The highest-priority version wins; deletion markers shadow the rest.
//! let data = chain.read_file("Data\\Config.txt")?;
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod archive;
pub mod builder;
pub mod checksum;
pub mod compression;
pub mod crypto;
pub mod error;
pub mod header;
pub mod modification;
pub mod patch_chain;
pub mod path;
pub mod special_files;
pub mod tables;

pub use archive::{Archive, FileInfo};
pub use builder::{AddFileOptions, ArchiveBuilder};
pub use crypto::{decrypt_block, encrypt_block, hash_string, hash_type, SignatureInfo};
pub use error::{Error, Result};
pub use header::{FormatVersion, MpqHeader};
pub use modification::MutableArchive;
pub use patch_chain::PatchChain;
pub use special_files::{Attributes, PatchMetadata};
pub use tables::{BlockEntry, BlockTable, HashEntry, HashTable, HiBlockTable};
