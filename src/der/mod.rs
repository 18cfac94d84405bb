//! ASN.1 DER binary format (ITU-T X.690 distinguished encoding).
//!
//! Schema-driven: a [`Schema`](schema::Schema) describes the expected
//! structure, and the codec walks value and schema in lockstep. Byte-exact
//! with standard DER — minimal lengths, minimal two's-complement integers,
//! definite lengths only.

pub mod codec;
pub mod reader;
pub mod schema;
pub mod writer;

pub use codec::{decode_value, encode_value};
pub use reader::DerReader;
pub use schema::{Field, Schema, Tag};
pub use writer::DerWriter;
