//! Generic tree codec bridge.
//!
//! Separates "map a typed value to an intermediate tree" from "serialize a
//! tree to bytes": typed encode/decode logic composes the keyed, unkeyed,
//! and single-value containers here, and the format modules (`cbor`, `der`)
//! consume or produce the resulting `AnyValue` trees. Containers are
//! single-use objects scoped to one encode or decode call.

pub mod decode;
pub mod encode;
pub mod transform;

pub use decode::{Decode, MapDecoder, SeqDecoder};
pub use encode::{Encode, MapEncoder, SeqEncoder};
pub use transform::Transform;
