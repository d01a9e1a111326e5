//! Compression support for MPQ file payloads
//!
//! Every compressed unit (a single-unit blob or an individual sector) is
//! prefixed with a one-byte method mask. The writer only ever emits zlib;
//! the reader additionally understands BZip2 and PKWARE DCL payloads
//! produced by other tools.

mod algorithms;
mod compress;
mod decompress;
mod methods;

pub use compress::compress;
pub use decompress::decompress;
pub use methods::flags;
