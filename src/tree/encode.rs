//! Tree construction: typed values → `AnyValue` trees.

use indexmap::IndexMap;
use num_bigint::{BigInt, BigUint};

use super::transform::Transform;
use crate::error::CodecError;
use crate::value::{AnyValue, Decimal, Timestamp, ValueMap};

/// A type that can lower itself into the canonical tree.
///
/// For a scalar, the impl is the single-value container: it produces
/// exactly one leaf. Structured types compose a [`MapEncoder`] or
/// [`SeqEncoder`] and return its finished tree.
pub trait Encode {
    fn encode(&self) -> Result<AnyValue, CodecError>;
}

/// Keyed container: builds an insertion-ordered string-keyed mapping.
///
/// Single-use — construct, fill, `finish`. Encoding is pure tree
/// construction; no output is produced until a format writer consumes the
/// finished tree.
#[derive(Debug, Default)]
pub struct MapEncoder {
    entries: IndexMap<String, AnyValue>,
}

impl MapEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes `value` under `key`. A repeated key overwrites in place.
    pub fn encode<T: Encode + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<(), CodecError> {
        let tree = value.encode()?;
        self.entries.insert(key.into(), tree);
        Ok(())
    }

    /// Escape hatch: stores an already-built tree under `key`.
    pub fn encode_any(&mut self, key: impl Into<String>, value: AnyValue) {
        self.entries.insert(key.into(), value);
    }

    /// Encodes `value` through a transformer pair.
    pub fn encode_with<T, U: Encode>(
        &mut self,
        key: impl Into<String>,
        value: &T,
        transform: &Transform<T, U>,
    ) -> Result<(), CodecError> {
        let intermediate = (transform.encode)(value)?;
        self.encode(key, &intermediate)
    }

    /// Consumes the container into a map tree, keys in insertion order.
    pub fn finish(self) -> AnyValue {
        AnyValue::Map(
            self.entries
                .into_iter()
                .map(|(k, v)| (AnyValue::String(k), v))
                .collect::<ValueMap>(),
        )
    }
}

/// Unkeyed container: builds an ordered sequence.
#[derive(Debug, Default)]
pub struct SeqEncoder {
    items: Vec<AnyValue>,
}

impl SeqEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Appends an encoded value.
    pub fn encode<T: Encode + ?Sized>(&mut self, value: &T) -> Result<(), CodecError> {
        self.items.push(value.encode()?);
        Ok(())
    }

    /// Escape hatch: appends an already-built tree.
    pub fn encode_any(&mut self, value: AnyValue) {
        self.items.push(value);
    }

    /// Appends `value` through a transformer pair.
    pub fn encode_with<T, U: Encode>(
        &mut self,
        value: &T,
        transform: &Transform<T, U>,
    ) -> Result<(), CodecError> {
        let intermediate = (transform.encode)(value)?;
        self.encode(&intermediate)
    }

    /// Consumes the container into a list tree.
    pub fn finish(self) -> AnyValue {
        AnyValue::List(self.items)
    }
}

// -- Scalar impls (the single-value container) --

macro_rules! encode_via_from {
    ($($ty:ty),+ $(,)?) => {
        $(impl Encode for $ty {
            fn encode(&self) -> Result<AnyValue, CodecError> {
                Ok(AnyValue::from(self.clone()))
            }
        })+
    };
}

encode_via_from!(
    bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, String, BigInt, BigUint, Decimal,
    Timestamp, url::Url, uuid::Uuid,
);

impl Encode for str {
    fn encode(&self) -> Result<AnyValue, CodecError> {
        Ok(AnyValue::String(self.to_owned()))
    }
}

/// Identity: the untyped escape hatch for data without a static shape.
impl Encode for AnyValue {
    fn encode(&self) -> Result<AnyValue, CodecError> {
        Ok(self.clone())
    }
}

/// `None` lowers to nil.
impl<T: Encode> Encode for Option<T> {
    fn encode(&self) -> Result<AnyValue, CodecError> {
        match self {
            Some(v) => v.encode(),
            None => Ok(AnyValue::Nil),
        }
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self) -> Result<AnyValue, CodecError> {
        let mut seq = SeqEncoder::new();
        for item in self {
            seq.encode(item)?;
        }
        Ok(seq.finish())
    }
}
