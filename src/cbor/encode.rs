//! CBOR encoding: `AnyValue` → bytes.

use bytes::{BufMut, BytesMut};
use num_bigint::{BigInt, BigUint, Sign};

use super::major;
use crate::value::{AnyValue, Decimal, Timestamp, ValueMap};

/// Encodes an `AnyValue` into the buffer as a single CBOR data item.
///
/// Every `AnyValue` has a CBOR representation, so encoding cannot fail.
/// Integer variants are written at the smallest width CBOR permits for the
/// value; float variants keep their tagged width — an equal-valued half and
/// double are different wire data.
pub fn encode_value(buf: &mut BytesMut, value: &AnyValue) {
    match value {
        AnyValue::Nil => encode_simple(buf, major::SIMPLE_NULL),
        AnyValue::Bool(b) => {
            encode_simple(buf, if *b { major::SIMPLE_TRUE } else { major::SIMPLE_FALSE });
        }
        AnyValue::I8(v) => encode_i64(buf, i64::from(*v)),
        AnyValue::I16(v) => encode_i64(buf, i64::from(*v)),
        AnyValue::I32(v) => encode_i64(buf, i64::from(*v)),
        AnyValue::I64(v) => encode_i64(buf, *v),
        AnyValue::U8(v) => encode_header(buf, major::UNSIGNED, u64::from(*v)),
        AnyValue::U16(v) => encode_header(buf, major::UNSIGNED, u64::from(*v)),
        AnyValue::U32(v) => encode_header(buf, major::UNSIGNED, u64::from(*v)),
        AnyValue::U64(v) => encode_header(buf, major::UNSIGNED, *v),
        AnyValue::BigInt(v) => encode_bigint(buf, v),
        AnyValue::BigUint(v) => encode_biguint(buf, v),
        AnyValue::F16(bits) => {
            buf.put_u8(initial_byte(major::SIMPLE, major::FLOAT_16));
            buf.put_u16(*bits);
        }
        AnyValue::F32(v) => {
            buf.put_u8(initial_byte(major::SIMPLE, major::FLOAT_32));
            buf.put_f32(*v);
        }
        AnyValue::F64(v) => {
            buf.put_u8(initial_byte(major::SIMPLE, major::FLOAT_64));
            buf.put_f64(*v);
        }
        AnyValue::Decimal(d) => encode_decimal(buf, d),
        AnyValue::String(s) => encode_text(buf, s),
        AnyValue::Bytes(b) => encode_bytes(buf, b),
        AnyValue::Url(u) => {
            encode_header(buf, major::TAG, major::TAG_URI);
            encode_text(buf, u.as_str());
        }
        AnyValue::Uuid(u) => {
            encode_header(buf, major::TAG, major::TAG_UUID);
            encode_bytes(buf, u.as_bytes());
        }
        AnyValue::Timestamp(t) => encode_timestamp(buf, t),
        AnyValue::List(items) => encode_list(buf, items),
        AnyValue::Map(map) => encode_map(buf, map),
    }
}

/// Writes the initial byte and the argument at the strictly minimal width:
/// 0-23 inline, then 1/2/4/8-byte arguments.
pub fn encode_header(buf: &mut BytesMut, major: u8, value: u64) {
    if value < 24 {
        buf.put_u8(initial_byte(major, value as u8));
    } else if value <= u64::from(u8::MAX) {
        buf.put_u8(initial_byte(major, major::AI_U8));
        buf.put_u8(value as u8);
    } else if value <= u64::from(u16::MAX) {
        buf.put_u8(initial_byte(major, major::AI_U16));
        buf.put_u16(value as u16);
    } else if value <= u64::from(u32::MAX) {
        buf.put_u8(initial_byte(major, major::AI_U32));
        buf.put_u32(value as u32);
    } else {
        buf.put_u8(initial_byte(major, major::AI_U64));
        buf.put_u64(value);
    }
}

fn initial_byte(major: u8, info: u8) -> u8 {
    (major << 5) | info
}

fn encode_simple(buf: &mut BytesMut, value: u8) {
    buf.put_u8(initial_byte(major::SIMPLE, value));
}

fn encode_i64(buf: &mut BytesMut, value: i64) {
    if value >= 0 {
        encode_header(buf, major::UNSIGNED, value as u64);
    } else {
        // Major 1 stores -(1 + n).
        encode_header(buf, major::NEGATIVE, !(value as u64));
    }
}

/// Preferred serialization: native majors up to 64 bits, bignum tags beyond.
fn encode_bigint(buf: &mut BytesMut, value: &BigInt) {
    match value.sign() {
        Sign::NoSign | Sign::Plus => encode_biguint(buf, value.magnitude()),
        Sign::Minus => {
            // n = -1 - value, non-negative by construction.
            let n = (-value) - 1u8;
            let magnitude = n.magnitude();
            if let Ok(small) = u64::try_from(magnitude) {
                encode_header(buf, major::NEGATIVE, small);
            } else {
                encode_header(buf, major::TAG, major::TAG_NEG_BIGNUM);
                encode_bytes(buf, &magnitude.to_bytes_be());
            }
        }
    }
}

fn encode_biguint(buf: &mut BytesMut, value: &BigUint) {
    if let Ok(small) = u64::try_from(value) {
        encode_header(buf, major::UNSIGNED, small);
    } else {
        encode_header(buf, major::TAG, major::TAG_POS_BIGNUM);
        encode_bytes(buf, &value.to_bytes_be());
    }
}

/// Tag 4: `[exponent, mantissa]`, mantissa as a bignum when needed.
fn encode_decimal(buf: &mut BytesMut, d: &Decimal) {
    encode_header(buf, major::TAG, major::TAG_DECIMAL_FRACTION);
    encode_header(buf, major::ARRAY, 2);
    encode_i64(buf, d.exponent);
    encode_bigint(buf, &d.mantissa);
}

/// Tag 1: integer epoch seconds, or a float when there is a nanosecond part.
fn encode_timestamp(buf: &mut BytesMut, t: &Timestamp) {
    encode_header(buf, major::TAG, major::TAG_EPOCH_TIME);
    if t.nanos == 0 {
        encode_i64(buf, t.seconds);
    } else {
        let epoch = t.seconds as f64 + f64::from(t.nanos) / 1e9;
        buf.put_u8(initial_byte(major::SIMPLE, major::FLOAT_64));
        buf.put_f64(epoch);
    }
}

fn encode_text(buf: &mut BytesMut, s: &str) {
    encode_header(buf, major::TEXT, s.len() as u64);
    buf.put_slice(s.as_bytes());
}

fn encode_bytes(buf: &mut BytesMut, b: &[u8]) {
    encode_header(buf, major::BYTES, b.len() as u64);
    buf.put_slice(b);
}

fn encode_list(buf: &mut BytesMut, items: &[AnyValue]) {
    encode_header(buf, major::ARRAY, items.len() as u64);
    for item in items {
        encode_value(buf, item);
    }
}

/// Map entries are written in insertion order — no canonical sort. Payloads
/// get hashed and signed; reordering would break that silently.
fn encode_map(buf: &mut BytesMut, map: &ValueMap) {
    encode_header(buf, major::MAP, map.len() as u64);
    for (key, value) in map.iter() {
        encode_value(buf, key);
        encode_value(buf, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(value: &AnyValue) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_value(&mut buf, value);
        buf.to_vec()
    }

    #[test]
    fn simple_values() {
        assert_eq!(encoded(&AnyValue::Nil), [0xF6]);
        assert_eq!(encoded(&AnyValue::Bool(false)), [0xF4]);
        assert_eq!(encoded(&AnyValue::Bool(true)), [0xF5]);
    }

    #[test]
    fn minimal_width_integers() {
        // Width boundaries: 23/24, one/two/four-byte arguments.
        assert_eq!(encoded(&AnyValue::U64(0)), [0x00]);
        assert_eq!(encoded(&AnyValue::U64(23)), [0x17]);
        assert_eq!(encoded(&AnyValue::U64(24)), [0x18, 24]);
        assert_eq!(encoded(&AnyValue::U64(500)), [0x19, 0x01, 0xF4]);
        assert_eq!(encoded(&AnyValue::U64(70000)), [0x1A, 0x00, 0x01, 0x11, 0x70]);
        assert_eq!(
            encoded(&AnyValue::U64(u64::from(u32::MAX) + 1)),
            [0x1B, 0, 0, 0, 1, 0, 0, 0, 0]
        );
    }

    #[test]
    fn negative_integers() {
        assert_eq!(encoded(&AnyValue::I64(-1)), [0x20]);
        assert_eq!(encoded(&AnyValue::I64(-24)), [0x37]);
        assert_eq!(encoded(&AnyValue::I64(-25)), [0x38, 24]);
        assert_eq!(encoded(&AnyValue::I64(-500)), [0x39, 0x01, 0xF3]);
        // i64::MIN: n = 2^63 - 1, full 8-byte argument.
        let mut expected = vec![0x3B];
        expected.extend_from_slice(&(u64::MAX >> 1).to_be_bytes());
        assert_eq!(encoded(&AnyValue::I64(i64::MIN)), expected);
    }

    #[test]
    fn narrow_widths_still_minimal() {
        // A declared-width value uses the smallest wire form for the value.
        assert_eq!(encoded(&AnyValue::I32(10)), [0x0A]);
        assert_eq!(encoded(&AnyValue::U16(500)), [0x19, 0x01, 0xF4]);
        assert_eq!(encoded(&AnyValue::I8(-2)), [0x21]);
    }

    #[test]
    fn float_widths_kept_not_minimized() {
        assert_eq!(encoded(&AnyValue::F16(0x3C00)), [0xF9, 0x3C, 0x00]);
        assert_eq!(encoded(&AnyValue::F32(1.0)), [0xFA, 0x3F, 0x80, 0x00, 0x00]);
        // An equal-valued double stays a double.
        assert_eq!(
            encoded(&AnyValue::F64(1.0)),
            [0xFB, 0x3F, 0xF0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn strings_and_bytes() {
        assert_eq!(encoded(&AnyValue::String("a".into())), [0x61, 0x41]);
        assert_eq!(encoded(&AnyValue::Bytes(vec![0xDE, 0xAD])), [0x42, 0xDE, 0xAD]);
        assert_eq!(encoded(&AnyValue::String(String::new())), [0x60]);
    }

    #[test]
    fn small_bignum_uses_native_major() {
        assert_eq!(encoded(&AnyValue::BigInt(BigInt::from(10))), [0x0A]);
        assert_eq!(encoded(&AnyValue::BigInt(BigInt::from(-500))), [0x39, 0x01, 0xF3]);
    }

    #[test]
    fn oversize_bignum_uses_tag() {
        // 2^64 needs tag 2 wrapping 9 magnitude bytes.
        let big = BigUint::from(1u8) << 64;
        let bytes = encoded(&AnyValue::BigUint(big));
        assert_eq!(&bytes[..2], &[0xC2, 0x49]);
        assert_eq!(&bytes[2..], &[1, 0, 0, 0, 0, 0, 0, 0, 0]);

        // -(2^64 + 1): n = 2^64, still 9 bytes under tag 3.
        let neg = -(BigInt::from(1u8) << 64usize) - 1;
        let bytes = encoded(&AnyValue::BigInt(neg));
        assert_eq!(&bytes[..2], &[0xC3, 0x49]);
        assert_eq!(&bytes[2..], &[1, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn decimal_fraction_tag() {
        // 273.15 as 27315 * 10^-2 (the RFC 8949 example).
        let d = Decimal::new(27315, -2);
        assert_eq!(
            encoded(&AnyValue::Decimal(d)),
            [0xC4, 0x82, 0x21, 0x19, 0x6A, 0xB3]
        );
    }

    #[test]
    fn timestamp_tag() {
        let t = Timestamp::from_seconds(1_363_896_240);
        assert_eq!(
            encoded(&AnyValue::Timestamp(t)),
            [0xC1, 0x1A, 0x51, 0x4B, 0x67, 0xB0]
        );
    }

    #[test]
    fn map_insertion_order_on_wire() {
        let map: ValueMap = [
            ("c".into(), AnyValue::I64(1)),
            ("a".into(), AnyValue::I64(2)),
            ("b".into(), AnyValue::I64(3)),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            encoded(&AnyValue::Map(map)),
            [0xA3, 0x61, 0x63, 0x01, 0x61, 0x61, 0x02, 0x61, 0x62, 0x03]
        );
    }
}
