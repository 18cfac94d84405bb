//! CBOR binary format (RFC 8949 subset, definite-length only).
//!
//! Major-type framing with minimal-width integer arguments; semantic tags
//! carry timestamps, URIs, UUIDs, bignums, and decimal fractions. Big-endian
//! byte ordering throughout.

pub mod decode;
pub mod encode;
pub mod major;

pub use decode::decode_value;
pub use encode::encode_value;
