//! Individual compression algorithm backends

pub(crate) mod bzip2;
pub(crate) mod pkware;
pub(crate) mod zlib;
