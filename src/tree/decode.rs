//! Tree consumption: `AnyValue` trees → typed values.

use num_bigint::{BigInt, BigUint, Sign};

use super::transform::Transform;
use crate::error::CodecError;
use crate::value::{AnyValue, Decimal, Timestamp, ValueMap};

/// A type that can lift itself out of the canonical tree.
pub trait Decode: Sized {
    fn decode(value: &AnyValue) -> Result<Self, CodecError>;
}

/// Keyed container view over a map tree.
///
/// Single-use, scoped to one decode call. Lookup is by string key; missing
/// required keys and nil-where-required are distinct errors so callers can
/// tell absence from explicit null.
#[derive(Debug)]
pub struct MapDecoder<'a> {
    map: &'a ValueMap,
}

impl<'a> MapDecoder<'a> {
    /// Views `tree` as a keyed container.
    pub fn new(tree: &'a AnyValue) -> Result<Self, CodecError> {
        match tree {
            AnyValue::Map(map) => Ok(Self { map }),
            other => Err(CodecError::structural("map", other.kind())),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.get_str(key).is_some()
    }

    /// Decodes the required value under `key`.
    pub fn decode<T: Decode>(&self, key: &str) -> Result<T, CodecError> {
        let value = self
            .map
            .get_str(key)
            .ok_or_else(|| CodecError::KeyNotFound(key.to_owned()))?;
        if value.is_nil() {
            // Option<T> accepts nil; anything else required a value here.
            return T::decode(value).map_err(|_| CodecError::ValueNotFound(key.to_owned()));
        }
        T::decode(value)
    }

    /// Decodes the value under `key`, or `None` when the key is missing or
    /// maps to nil.
    pub fn decode_if_present<T: Decode>(&self, key: &str) -> Result<Option<T>, CodecError> {
        match self.map.get_str(key) {
            None => Ok(None),
            Some(AnyValue::Nil) => Ok(None),
            Some(value) => T::decode(value).map(Some),
        }
    }

    /// Escape hatch: the raw tree under `key`.
    pub fn decode_any(&self, key: &str) -> Result<&'a AnyValue, CodecError> {
        self.map
            .get_str(key)
            .ok_or_else(|| CodecError::KeyNotFound(key.to_owned()))
    }

    /// Decodes through a transformer pair.
    pub fn decode_with<T, U: Decode>(
        &self,
        key: &str,
        transform: &Transform<T, U>,
    ) -> Result<T, CodecError> {
        let intermediate: U = self.decode(key)?;
        (transform.decode)(intermediate)
    }
}

/// Unkeyed container view over a list tree, with a read cursor.
#[derive(Debug)]
pub struct SeqDecoder<'a> {
    items: &'a [AnyValue],
    cursor: usize,
}

impl<'a> SeqDecoder<'a> {
    /// Views `tree` as an unkeyed container.
    pub fn new(tree: &'a AnyValue) -> Result<Self, CodecError> {
        match tree {
            AnyValue::List(items) => Ok(Self { items, cursor: 0 }),
            other => Err(CodecError::structural("list", other.kind())),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True when the cursor has consumed every element.
    pub fn is_at_end(&self) -> bool {
        self.cursor >= self.items.len()
    }

    /// Decodes the next element and advances the cursor.
    pub fn decode<T: Decode>(&mut self) -> Result<T, CodecError> {
        let value = self.next_value()?;
        T::decode(value)
    }

    /// Escape hatch: the next raw tree, advancing the cursor.
    pub fn decode_any(&mut self) -> Result<&'a AnyValue, CodecError> {
        self.next_value()
    }

    /// Decodes the next element through a transformer pair.
    pub fn decode_with<T, U: Decode>(
        &mut self,
        transform: &Transform<T, U>,
    ) -> Result<T, CodecError> {
        let intermediate: U = self.decode()?;
        (transform.decode)(intermediate)
    }

    fn next_value(&mut self) -> Result<&'a AnyValue, CodecError> {
        let value = self
            .items
            .get(self.cursor)
            .ok_or(CodecError::IndexOutOfRange {
                index: self.cursor,
                len: self.items.len(),
            })?;
        self.cursor += 1;
        Ok(value)
    }
}

// -- Scalar impls (the single-value container) --

impl Decode for bool {
    fn decode(value: &AnyValue) -> Result<Self, CodecError> {
        value
            .as_bool()
            .ok_or_else(|| CodecError::structural("bool", value.kind()))
    }
}

macro_rules! decode_signed {
    ($($ty:ty),+ $(,)?) => {
        $(impl Decode for $ty {
            fn decode(value: &AnyValue) -> Result<Self, CodecError> {
                let wide = value
                    .as_i64()
                    .ok_or_else(|| CodecError::structural(stringify!($ty), value.kind()))?;
                <$ty>::try_from(wide).map_err(|_| {
                    CodecError::InvalidValue(format!(
                        "{wide} does not fit in {}",
                        stringify!($ty)
                    ))
                })
            }
        })+
    };
}

macro_rules! decode_unsigned {
    ($($ty:ty),+ $(,)?) => {
        $(impl Decode for $ty {
            fn decode(value: &AnyValue) -> Result<Self, CodecError> {
                let wide = value
                    .as_u64()
                    .ok_or_else(|| CodecError::structural(stringify!($ty), value.kind()))?;
                <$ty>::try_from(wide).map_err(|_| {
                    CodecError::InvalidValue(format!(
                        "{wide} does not fit in {}",
                        stringify!($ty)
                    ))
                })
            }
        })+
    };
}

decode_signed!(i8, i16, i32, i64);
decode_unsigned!(u8, u16, u32, u64);

impl Decode for f64 {
    fn decode(value: &AnyValue) -> Result<Self, CodecError> {
        value
            .as_f64()
            .ok_or_else(|| CodecError::structural("float", value.kind()))
    }
}

impl Decode for f32 {
    fn decode(value: &AnyValue) -> Result<Self, CodecError> {
        f64::decode(value).map(|v| v as f32)
    }
}

impl Decode for String {
    fn decode(value: &AnyValue) -> Result<Self, CodecError> {
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| CodecError::structural("string", value.kind()))
    }
}

impl Decode for BigInt {
    fn decode(value: &AnyValue) -> Result<Self, CodecError> {
        value
            .to_bigint()
            .ok_or_else(|| CodecError::structural("integer", value.kind()))
    }
}

impl Decode for BigUint {
    fn decode(value: &AnyValue) -> Result<Self, CodecError> {
        let wide = value
            .to_bigint()
            .ok_or_else(|| CodecError::structural("integer", value.kind()))?;
        match wide.sign() {
            Sign::Minus => Err(CodecError::InvalidValue(format!(
                "{wide} is negative, expected unsigned"
            ))),
            _ => Ok(wide.magnitude().clone()),
        }
    }
}

impl Decode for Decimal {
    fn decode(value: &AnyValue) -> Result<Self, CodecError> {
        match value {
            AnyValue::Decimal(d) => Ok(d.clone()),
            other => Err(CodecError::structural("decimal", other.kind())),
        }
    }
}

impl Decode for Timestamp {
    fn decode(value: &AnyValue) -> Result<Self, CodecError> {
        match value {
            AnyValue::Timestamp(t) => Ok(*t),
            other => Err(CodecError::structural("timestamp", other.kind())),
        }
    }
}

impl Decode for url::Url {
    fn decode(value: &AnyValue) -> Result<Self, CodecError> {
        match value {
            AnyValue::Url(u) => Ok(u.clone()),
            other => Err(CodecError::structural("url", other.kind())),
        }
    }
}

impl Decode for uuid::Uuid {
    fn decode(value: &AnyValue) -> Result<Self, CodecError> {
        match value {
            AnyValue::Uuid(u) => Ok(*u),
            other => Err(CodecError::structural("uuid", other.kind())),
        }
    }
}

/// Identity: the untyped escape hatch.
impl Decode for AnyValue {
    fn decode(value: &AnyValue) -> Result<Self, CodecError> {
        Ok(value.clone())
    }
}

/// Nil lifts to `None`.
impl<T: Decode> Decode for Option<T> {
    fn decode(value: &AnyValue) -> Result<Self, CodecError> {
        match value {
            AnyValue::Nil => Ok(None),
            other => T::decode(other).map(Some),
        }
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(value: &AnyValue) -> Result<Self, CodecError> {
        let mut seq = SeqDecoder::new(value)?;
        let mut items = Vec::with_capacity(seq.len());
        while !seq.is_at_end() {
            items.push(seq.decode()?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::encode::MapEncoder;

    fn sample_map() -> AnyValue {
        let mut enc = MapEncoder::new();
        enc.encode("name", "Ada").unwrap();
        enc.encode("age", &36i64).unwrap();
        enc.encode_any("note", AnyValue::Nil);
        enc.finish()
    }

    #[test]
    fn keyed_decode_and_missing_key() {
        let tree = sample_map();
        let dec = MapDecoder::new(&tree).unwrap();

        assert_eq!(dec.decode::<String>("name").unwrap(), "Ada");
        assert_eq!(dec.decode::<i64>("age").unwrap(), 36);
        assert_eq!(
            dec.decode_any("name").unwrap(),
            &AnyValue::String("Ada".into())
        );

        match dec.decode::<String>("missing") {
            Err(CodecError::KeyNotFound(key)) => assert_eq!(key, "missing"),
            other => panic!("expected KeyNotFound, got {other:?}"),
        }
    }

    #[test]
    fn nil_under_required_key() {
        let tree = sample_map();
        let dec = MapDecoder::new(&tree).unwrap();

        // Required non-optional decode of a nil value.
        match dec.decode::<String>("note") {
            Err(CodecError::ValueNotFound(key)) => assert_eq!(key, "note"),
            other => panic!("expected ValueNotFound, got {other:?}"),
        }
        // Optional forms see absence.
        assert_eq!(dec.decode_if_present::<String>("note").unwrap(), None);
        assert_eq!(dec.decode::<Option<String>>("note").unwrap(), None);
    }

    #[test]
    fn optional_missing_key_is_none() {
        let tree = sample_map();
        let dec = MapDecoder::new(&tree).unwrap();
        assert_eq!(dec.decode_if_present::<i64>("nope").unwrap(), None);
    }

    #[test]
    fn unkeyed_cursor_and_exhaustion() {
        let tree = AnyValue::List(vec![AnyValue::I64(1), AnyValue::I64(2)]);
        let mut seq = SeqDecoder::new(&tree).unwrap();

        assert!(!seq.is_at_end());
        assert_eq!(seq.decode::<i64>().unwrap(), 1);
        assert_eq!(seq.decode::<i64>().unwrap(), 2);
        assert!(seq.is_at_end());

        match seq.decode::<i64>() {
            Err(CodecError::IndexOutOfRange { index: 2, len: 2 }) => {}
            other => panic!("expected IndexOutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn shape_mismatch_is_structural() {
        assert!(matches!(
            MapDecoder::new(&AnyValue::I64(1)),
            Err(CodecError::Structural { .. })
        ));
        assert!(matches!(
            SeqDecoder::new(&AnyValue::Bool(true)),
            Err(CodecError::Structural { .. })
        ));
    }

    #[test]
    fn normalized_integers_narrow_on_demand() {
        // Wire decode produces canonical widths; a typed u8 field narrows.
        assert_eq!(u8::decode(&AnyValue::U64(200)).unwrap(), 200);
        assert!(matches!(
            u8::decode(&AnyValue::U64(300)),
            Err(CodecError::InvalidValue(_))
        ));
        assert_eq!(i8::decode(&AnyValue::I64(-5)).unwrap(), -5);
        // No numeric coercion from bool.
        assert!(bool::decode(&AnyValue::I64(1)).is_err());
    }

    #[test]
    fn bigint_accepts_any_integer_width() {
        assert_eq!(
            BigInt::decode(&AnyValue::U64(u64::MAX)).unwrap(),
            BigInt::from(u64::MAX)
        );
        assert!(matches!(
            BigUint::decode(&AnyValue::I64(-1)),
            Err(CodecError::InvalidValue(_))
        ));
    }
}
