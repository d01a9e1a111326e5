//! The (patch_metadata) special file

use byteorder::{ByteOrder, LittleEndian};

use crate::{Error, Result};

/// Metadata describing an incremental patch payload
///
/// The fixed 36-byte prefix identifies the base file a patch applies to;
/// any bytes beyond it are opaque patch data.
#[derive(Debug, Clone)]
pub struct PatchMetadata {
    /// MD5 of the base file the patch applies to
    pub base_md5: [u8; 16],
    /// MD5 of the patch file itself
    pub patch_md5: [u8; 16],
    /// Size of the base file in bytes
    pub base_file_size: u32,
}

impl PatchMetadata {
    /// Size of the fixed metadata prefix
    pub const HEADER_SIZE: usize = 36;

    /// Parse a (patch_metadata) blob
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::HEADER_SIZE {
            return Err(Error::invalid_format(format!(
                "patch metadata too small: {} bytes",
                data.len()
            )));
        }

        let mut base_md5 = [0u8; 16];
        let mut patch_md5 = [0u8; 16];
        base_md5.copy_from_slice(&data[0..16]);
        patch_md5.copy_from_slice(&data[16..32]);

        Ok(PatchMetadata {
            base_md5,
            patch_md5,
            base_file_size: LittleEndian::read_u32(&data[32..36]),
        })
    }
}
