//! The canonical format-agnostic value model.

use std::fmt;

use num_bigint::{BigInt, BigUint};

use super::map::ValueMap;
use super::num::{f16_to_f64, Decimal, Timestamp};

/// A value in the canonical intermediate model that every format codec
/// normalizes into and out of.
///
/// Decode normalizes, encode preserves intent: the narrow integer variants
/// exist so a caller can request a particular width at encode time, but
/// decoding always produces `I64`/`U64` (or the arbitrary-precision
/// variants on overflow) — wire formats keep values, not declared widths.
/// Float widths are kept on decode only by formats that distinguish them
/// on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyValue {
    Nil,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    BigInt(BigInt),
    BigUint(BigUint),
    /// Raw IEEE 754 binary16 bits.
    F16(u16),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    String(String),
    Bytes(Vec<u8>),
    Url(url::Url),
    Uuid(uuid::Uuid),
    Timestamp(Timestamp),
    List(Vec<AnyValue>),
    Map(ValueMap),
}

impl AnyValue {
    /// Short kind name used in error descriptors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "bool",
            Self::I8(_) => "i8",
            Self::I16(_) => "i16",
            Self::I32(_) => "i32",
            Self::I64(_) => "i64",
            Self::U8(_) => "u8",
            Self::U16(_) => "u16",
            Self::U32(_) => "u32",
            Self::U64(_) => "u64",
            Self::BigInt(_) => "bigint",
            Self::BigUint(_) => "biguint",
            Self::F16(_) => "f16",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::Decimal(_) => "decimal",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Url(_) => "url",
            Self::Uuid(_) => "uuid",
            Self::Timestamp(_) => "timestamp",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Returns the value as a string reference, if it is a `String` variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns any signed or unsigned integer variant as an i64, when it
    /// fits. No coercion from bool, floats, or decimals.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::I8(v) => Some(i64::from(*v)),
            Self::I16(v) => Some(i64::from(*v)),
            Self::I32(v) => Some(i64::from(*v)),
            Self::I64(v) => Some(*v),
            Self::U8(v) => Some(i64::from(*v)),
            Self::U16(v) => Some(i64::from(*v)),
            Self::U32(v) => Some(i64::from(*v)),
            Self::U64(v) => i64::try_from(*v).ok(),
            Self::BigInt(v) => i64::try_from(v).ok(),
            Self::BigUint(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Returns any non-negative integer variant as a u64, when it fits.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::I8(v) => u64::try_from(*v).ok(),
            Self::I16(v) => u64::try_from(*v).ok(),
            Self::I32(v) => u64::try_from(*v).ok(),
            Self::I64(v) => u64::try_from(*v).ok(),
            Self::U8(v) => Some(u64::from(*v)),
            Self::U16(v) => Some(u64::from(*v)),
            Self::U32(v) => Some(u64::from(*v)),
            Self::U64(v) => Some(*v),
            Self::BigInt(v) => u64::try_from(v).ok(),
            Self::BigUint(v) => u64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Returns any float variant widened to f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::F16(bits) => Some(f16_to_f64(*bits)),
            Self::F32(v) => Some(f64::from(*v)),
            Self::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AnyValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Any integer variant, signed or unsigned, at any width.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::I8(_)
                | Self::I16(_)
                | Self::I32(_)
                | Self::I64(_)
                | Self::U8(_)
                | Self::U16(_)
                | Self::U32(_)
                | Self::U64(_)
                | Self::BigInt(_)
                | Self::BigUint(_)
        )
    }

    /// Widens any integer variant to a `BigInt`.
    pub fn to_bigint(&self) -> Option<BigInt> {
        match self {
            Self::I8(v) => Some(BigInt::from(*v)),
            Self::I16(v) => Some(BigInt::from(*v)),
            Self::I32(v) => Some(BigInt::from(*v)),
            Self::I64(v) => Some(BigInt::from(*v)),
            Self::U8(v) => Some(BigInt::from(*v)),
            Self::U16(v) => Some(BigInt::from(*v)),
            Self::U32(v) => Some(BigInt::from(*v)),
            Self::U64(v) => Some(BigInt::from(*v)),
            Self::BigInt(v) => Some(v.clone()),
            Self::BigUint(v) => Some(BigInt::from(v.clone())),
            _ => None,
        }
    }
}

// -- Convenience conversions --

impl From<bool> for AnyValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i8> for AnyValue {
    fn from(v: i8) -> Self {
        Self::I8(v)
    }
}

impl From<i16> for AnyValue {
    fn from(v: i16) -> Self {
        Self::I16(v)
    }
}

impl From<i32> for AnyValue {
    fn from(v: i32) -> Self {
        Self::I32(v)
    }
}

impl From<i64> for AnyValue {
    fn from(v: i64) -> Self {
        Self::I64(v)
    }
}

impl From<u8> for AnyValue {
    fn from(v: u8) -> Self {
        Self::U8(v)
    }
}

impl From<u16> for AnyValue {
    fn from(v: u16) -> Self {
        Self::U16(v)
    }
}

impl From<u32> for AnyValue {
    fn from(v: u32) -> Self {
        Self::U32(v)
    }
}

impl From<u64> for AnyValue {
    fn from(v: u64) -> Self {
        Self::U64(v)
    }
}

impl From<BigInt> for AnyValue {
    fn from(v: BigInt) -> Self {
        Self::BigInt(v)
    }
}

impl From<BigUint> for AnyValue {
    fn from(v: BigUint) -> Self {
        Self::BigUint(v)
    }
}

impl From<f32> for AnyValue {
    fn from(v: f32) -> Self {
        Self::F32(v)
    }
}

impl From<f64> for AnyValue {
    fn from(v: f64) -> Self {
        Self::F64(v)
    }
}

impl From<Decimal> for AnyValue {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<String> for AnyValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for AnyValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<Vec<u8>> for AnyValue {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

impl From<url::Url> for AnyValue {
    fn from(u: url::Url) -> Self {
        Self::Url(u)
    }
}

impl From<uuid::Uuid> for AnyValue {
    fn from(u: uuid::Uuid) -> Self {
        Self::Uuid(u)
    }
}

impl From<Timestamp> for AnyValue {
    fn from(t: Timestamp) -> Self {
        Self::Timestamp(t)
    }
}

impl From<Vec<AnyValue>> for AnyValue {
    fn from(v: Vec<AnyValue>) -> Self {
        Self::List(v)
    }
}

impl From<ValueMap> for AnyValue {
    fn from(m: ValueMap) -> Self {
        Self::Map(m)
    }
}

impl fmt::Display for AnyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "nil"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::I8(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::U8(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::BigInt(v) => write!(f, "{v}"),
            Self::BigUint(v) => write!(f, "{v}"),
            Self::F16(bits) => write!(f, "{}", f16_to_f64(*bits)),
            Self::F32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::String(s) => write!(f, "\"{s}\""),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::Url(u) => write!(f, "{u}"),
            Self::Uuid(u) => write!(f, "{u}"),
            Self::Timestamp(t) => write!(f, "timestamp({}.{:09})", t.seconds, t.nanos),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}
