//! Wireval — a multi-format serialization toolkit.
//!
//! A format-agnostic canonical value model plus codecs that translate
//! between that model and concrete wire formats. Typed values lower into
//! [`AnyValue`](value::AnyValue) trees through the bridge containers, and
//! the format modules serialize trees to bytes; decoding mirrors the path.
//!
//! # Architecture
//!
//! - **`value`** — Canonical `AnyValue` tagged union and support types
//! - **`tree`** — Generic encode/decode bridge (keyed, unkeyed, and
//!   single-value containers)
//! - **`der`** — ASN.1 DER codec, schema-driven
//! - **`cbor`** — CBOR codec (RFC 8949 subset, definite-length only)
//! - **`poly`** — Polymorphic references gated by an allow-list registry
//!
//! All operations are synchronous recursive tree walks over in-memory
//! buffers; the only state that outlives a call is the
//! [`TypeIndex`](poly::TypeIndex).

pub mod cbor;
pub mod der;
pub mod error;
pub mod poly;
pub mod tree;
pub mod value;

pub use error::CodecError;

/// Decoder recursion limit. Nesting beyond this fails with
/// [`CodecError::DepthExceeded`] instead of exhausting the stack.
pub const MAX_NESTING_DEPTH: usize = 128;
