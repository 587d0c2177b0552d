//! Message decoders for surfmon
//!
//! This crate turns raw client messages into canonical bytes and recovers
//! identifying fields from them:
//!
//! - **normalize**: textual encodings (quoted, `\x`-escaped, 8-bit) to bytes
//! - **hexdump**: offset / hex / ASCII rendering
//! - **extract**: delimiter heuristics for the six known fields
//!
//! Nothing here is a cipher. The "decrypt" naming of the client format is
//! historical; decoding is best-effort text splitting.

pub mod decoder;
pub mod extract;
pub mod hexdump;
pub mod normalize;

pub use decoder::WindsurfDecoder;
pub use extract::{ExtractOptions, FieldExtractor};
pub use hexdump::hex_dump;
pub use normalize::normalize;
