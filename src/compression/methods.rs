//! Compression method flags

/// Compression method flags, OR-combined in the prefix byte
pub mod flags {
    /// Huffman encoding (WAVE files only, unsupported)
    pub const HUFFMAN: u8 = 0x01;
    /// Deflate/zlib compression
    pub const ZLIB: u8 = 0x02;
    /// PKWare DCL compression (read-only)
    pub const PKWARE: u8 = 0x08;
    /// BZip2 compression (read-only)
    pub const BZIP2: u8 = 0x10;
    /// Sparse/RLE compression (SC2+, unsupported)
    pub const SPARSE: u8 = 0x20;
    /// IMA ADPCM mono (unsupported)
    pub const ADPCM_MONO: u8 = 0x40;
    /// IMA ADPCM stereo (unsupported)
    pub const ADPCM_STEREO: u8 = 0x80;
    /// LZMA compression (SC2+, unsupported; an exact value, not a bit)
    pub const LZMA: u8 = 0x12;
}
