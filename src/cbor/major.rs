//! CBOR major-type and header constants (RFC 8949).

// Major types (high 3 bits of the initial byte).
pub const UNSIGNED: u8 = 0;
pub const NEGATIVE: u8 = 1;
pub const BYTES: u8 = 2;
pub const TEXT: u8 = 3;
pub const ARRAY: u8 = 4;
pub const MAP: u8 = 5;
pub const TAG: u8 = 6;
pub const SIMPLE: u8 = 7;

// Additional-info codes (low 5 bits). 0..=23 embed the argument directly.
pub const AI_U8: u8 = 24;
pub const AI_U16: u8 = 25;
pub const AI_U32: u8 = 26;
pub const AI_U64: u8 = 27;
pub const AI_INDEFINITE: u8 = 31;

// Simple values (major 7, argument).
pub const SIMPLE_FALSE: u8 = 20;
pub const SIMPLE_TRUE: u8 = 21;
pub const SIMPLE_NULL: u8 = 22;
pub const SIMPLE_UNDEFINED: u8 = 23;

// Float widths (major 7, additional info).
pub const FLOAT_16: u8 = 25;
pub const FLOAT_32: u8 = 26;
pub const FLOAT_64: u8 = 27;

// Semantic tags (major 6).
pub const TAG_EPOCH_TIME: u64 = 1;
pub const TAG_POS_BIGNUM: u64 = 2;
pub const TAG_NEG_BIGNUM: u64 = 3;
pub const TAG_DECIMAL_FRACTION: u64 = 4;
pub const TAG_URI: u64 = 32;
pub const TAG_UUID: u64 = 37;
