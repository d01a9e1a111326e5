//! Parsing of the (signature) special file
//!
//! The blob is parsed but not cryptographically verified; [`SignatureInfo::verify`]
//! only sanity-checks the signature size against its declared version.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::{Error, Result};

/// Parsed contents of the (signature) special file
#[derive(Debug, Clone)]
pub struct SignatureInfo {
    /// Signature version (0 = weak, 1 = strong)
    pub version: u32,
    /// Raw signature bytes
    pub signature: Vec<u8>,
}

impl SignatureInfo {
    /// Minimum signature size for a weak (version 0) signature
    pub const WEAK_SIGNATURE_MIN_SIZE: usize = 64;
    /// Minimum signature size for a strong (version 1) signature
    pub const STRONG_SIGNATURE_MIN_SIZE: usize = 256;

    /// Parse a (signature) blob: version (u32 LE), length (u32 LE), then bytes
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 8 {
            return Err(Error::invalid_format(format!(
                "signature data too small: {} bytes",
                data.len()
            )));
        }

        let mut cursor = Cursor::new(data);
        let version = cursor.read_u32::<LittleEndian>()?;
        let length = cursor.read_u32::<LittleEndian>()? as usize;

        if data.len() < 8 + length {
            return Err(Error::invalid_format(format!(
                "signature data truncated: expected {} bytes, got {}",
                8 + length,
                data.len()
            )));
        }

        Ok(SignatureInfo {
            version,
            signature: data[8..8 + length].to_vec(),
        })
    }

    /// Sanity-check the signature blob
    ///
    /// Cryptographic verification against Blizzard's public keys is out of
    /// scope; this only validates that the blob is plausible for its version.
    pub fn verify(&self) -> Result<()> {
        if self.signature.is_empty() {
            return Err(Error::invalid_format("empty signature"));
        }

        match self.version {
            0 => {
                if self.signature.len() < Self::WEAK_SIGNATURE_MIN_SIZE {
                    return Err(Error::invalid_format(format!(
                        "weak signature too short: {} bytes",
                        self.signature.len()
                    )));
                }
            }
            1 => {
                if self.signature.len() < Self::STRONG_SIGNATURE_MIN_SIZE {
                    return Err(Error::invalid_format(format!(
                        "strong signature too short: {} bytes",
                        self.signature.len()
                    )));
                }
            }
            other => {
                return Err(Error::invalid_format(format!(
                    "unknown signature version: {other}"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature_blob(version: u32, payload: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&version.to_le_bytes());
        data.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        data.extend_from_slice(payload);
        data
    }

    #[test]
    fn test_parse_round_trip() {
        let payload = vec![0xABu8; 64];
        let blob = signature_blob(0, &payload);

        let info = SignatureInfo::parse(&blob).unwrap();
        assert_eq!(info.version, 0);
        assert_eq!(info.signature, payload);
    }

    #[test]
    fn test_parse_rejects_truncated() {
        assert!(SignatureInfo::parse(&[0u8; 4]).is_err());

        let mut blob = signature_blob(0, &[0u8; 64]);
        blob.truncate(40);
        assert!(SignatureInfo::parse(&blob).is_err());
    }

    #[test]
    fn test_verify_size_requirements() {
        assert!(SignatureInfo::parse(&signature_blob(0, &[0u8; 64]))
            .unwrap()
            .verify()
            .is_ok());
        assert!(SignatureInfo::parse(&signature_blob(0, &[0u8; 32]))
            .unwrap()
            .verify()
            .is_err());

        assert!(SignatureInfo::parse(&signature_blob(1, &[0u8; 256]))
            .unwrap()
            .verify()
            .is_ok());
        assert!(SignatureInfo::parse(&signature_blob(1, &[0u8; 128]))
            .unwrap()
            .verify()
            .is_err());

        assert!(SignatureInfo::parse(&signature_blob(7, &[0u8; 256]))
            .unwrap()
            .verify()
            .is_err());
    }
}
