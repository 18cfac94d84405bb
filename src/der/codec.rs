//! Schema-driven structural codec: `AnyValue` ⇄ DER bytes.

use bytes::BytesMut;

use super::reader::{integer_value, oid_value, DerReader};
use super::schema::{Field, Schema};
use super::writer::{integer_content, oid_content, DerWriter};
use crate::error::CodecError;
use crate::value::{AnyValue, ValueMap};
use crate::MAX_NESTING_DEPTH;

/// Encodes `value` against `schema` into the buffer.
///
/// The walk is lockstep: a sequence schema takes a string-keyed map and
/// emits its fields in declared order; a set-of takes a list. Any value
/// that does not fit its schema node fails with `InvalidValue` before any
/// output reaches the caller's buffer.
pub fn encode_value(
    buf: &mut BytesMut,
    value: &AnyValue,
    schema: &Schema,
) -> Result<(), CodecError> {
    let mut writer = DerWriter::new();
    encode_node(&mut writer, value, schema)?;
    let encoded = writer.finish();
    tracing::trace!(bytes = encoded.len(), "encoded DER value");
    buf.extend_from_slice(&encoded);
    Ok(())
}

/// Decodes DER bytes against `schema`, consuming the whole input.
pub fn decode_value(data: &[u8], schema: &Schema) -> Result<AnyValue, CodecError> {
    let mut reader = DerReader::new(data);
    let value = decode_node(&mut reader, schema, 0)?;
    if !reader.is_at_end() {
        return Err(CodecError::corrupted_at(
            "trailing bytes after value",
            reader.position(),
        ));
    }
    tracing::trace!(bytes = data.len(), kind = value.kind(), "decoded DER value");
    Ok(value)
}

fn encode_node(writer: &mut DerWriter, value: &AnyValue, schema: &Schema) -> Result<(), CodecError> {
    match schema {
        Schema::Boolean => {
            let b = value.as_bool().ok_or_else(|| mismatch(schema, value))?;
            writer.append(expect_tag(schema), &[if b { 0xFF } else { 0x00 }]);
        }
        Schema::Integer => {
            let n = value.to_bigint().ok_or_else(|| mismatch(schema, value))?;
            writer.append(expect_tag(schema), &integer_content(&n));
        }
        Schema::Null => {
            if !value.is_nil() {
                return Err(mismatch(schema, value));
            }
            writer.append(expect_tag(schema), &[]);
        }
        Schema::OctetString => {
            let bytes = value.as_bytes().ok_or_else(|| mismatch(schema, value))?;
            writer.append(expect_tag(schema), bytes);
        }
        Schema::Utf8String => {
            let s = value.as_str().ok_or_else(|| mismatch(schema, value))?;
            writer.append(expect_tag(schema), s.as_bytes());
        }
        Schema::PrintableString => {
            let s = value.as_str().ok_or_else(|| mismatch(schema, value))?;
            if let Some(c) = s.chars().find(|c| !is_printable(*c)) {
                return Err(CodecError::InvalidValue(format!(
                    "character {c:?} is not allowed in PrintableString"
                )));
            }
            writer.append(expect_tag(schema), s.as_bytes());
        }
        Schema::Ia5String => {
            let s = value.as_str().ok_or_else(|| mismatch(schema, value))?;
            if !s.is_ascii() {
                return Err(CodecError::InvalidValue(
                    "IA5String content must be ASCII".into(),
                ));
            }
            writer.append(expect_tag(schema), s.as_bytes());
        }
        Schema::ObjectIdentifier => {
            let s = value.as_str().ok_or_else(|| mismatch(schema, value))?;
            writer.append(expect_tag(schema), &oid_content(s)?);
        }
        Schema::BitString => {
            let bytes = value.as_bytes().ok_or_else(|| mismatch(schema, value))?;
            // Leading octet counts unused bits; octet-aligned means zero.
            let mut content = Vec::with_capacity(bytes.len() + 1);
            content.push(0x00);
            content.extend_from_slice(bytes);
            writer.append(expect_tag(schema), &content);
        }
        Schema::Sequence(fields) => {
            let map = value.as_map().ok_or_else(|| mismatch(schema, value))?;
            check_unknown_keys(map, fields)?;
            let mut inner = DerWriter::new();
            for field in fields {
                match map.get_str(&field.name) {
                    Some(AnyValue::Nil) if field.optional && !matches!(field.schema, Schema::Null) => {}
                    Some(v) => encode_node(&mut inner, v, &field.schema)?,
                    None if field.optional => {}
                    None => return Err(CodecError::KeyNotFound(field.name.clone())),
                }
            }
            writer.append(expect_tag(schema), &inner.finish());
        }
        Schema::SetOf(element) => {
            let items = value.as_list().ok_or_else(|| mismatch(schema, value))?;
            let mut inner = DerWriter::new();
            for item in items {
                encode_node(&mut inner, item, element)?;
            }
            writer.append(expect_tag(schema), &inner.finish());
        }
        Schema::Choice(alternatives) => {
            let alt = alternatives
                .iter()
                .map(|(_, alt)| alt)
                .find(|alt| accepts_value(alt, value))
                .ok_or_else(|| mismatch(schema, value))?;
            encode_node(writer, value, alt)?;
        }
    }
    Ok(())
}

fn decode_node(
    reader: &mut DerReader<'_>,
    schema: &Schema,
    depth: usize,
) -> Result<AnyValue, CodecError> {
    if depth >= MAX_NESTING_DEPTH {
        return Err(CodecError::DepthExceeded {
            limit: MAX_NESTING_DEPTH,
        });
    }

    if let Schema::Choice(alternatives) = schema {
        let wire = reader.peek_tag()?;
        let (_, alt) = alternatives
            .iter()
            .find(|(_, alt)| alt.accepts_tag(wire))
            .ok_or_else(|| CodecError::structural(schema.describe(), wire))?;
        return decode_node(reader, alt, depth + 1);
    }

    let (wire, content, content_pos) = reader.read_tlv()?;
    let expected = expect_tag(schema);
    if wire != expected {
        return Err(CodecError::structural(
            format!("{} (tag {expected})", schema.describe()),
            wire,
        ));
    }

    match schema {
        Schema::Boolean => match content {
            [0x00] => Ok(AnyValue::Bool(false)),
            [0xFF] => Ok(AnyValue::Bool(true)),
            _ => Err(CodecError::corrupted_at(
                "BOOLEAN content must be a single 0x00 or 0xFF octet",
                content_pos,
            )),
        },
        Schema::Integer => {
            let n = integer_value(content, content_pos)?;
            // Normalize: the canonical 64-bit variant when it fits.
            Ok(match i64::try_from(&n) {
                Ok(small) => AnyValue::I64(small),
                Err(_) => AnyValue::BigInt(n),
            })
        }
        Schema::Null => {
            if !content.is_empty() {
                return Err(CodecError::corrupted_at(
                    "NULL content must be empty",
                    content_pos,
                ));
            }
            Ok(AnyValue::Nil)
        }
        Schema::OctetString => Ok(AnyValue::Bytes(content.to_vec())),
        Schema::Utf8String => decode_text(content, content_pos),
        Schema::PrintableString => {
            let value = decode_text(content, content_pos)?;
            if let Some(s) = value.as_str() {
                if let Some(c) = s.chars().find(|c| !is_printable(*c)) {
                    return Err(CodecError::corrupted_at(
                        format!("character {c:?} is not allowed in PrintableString"),
                        content_pos,
                    ));
                }
            }
            Ok(value)
        }
        Schema::Ia5String => {
            let value = decode_text(content, content_pos)?;
            if value.as_str().is_some_and(|s| !s.is_ascii()) {
                return Err(CodecError::corrupted_at(
                    "IA5String content must be ASCII",
                    content_pos,
                ));
            }
            Ok(value)
        }
        Schema::ObjectIdentifier => Ok(AnyValue::String(oid_value(content, content_pos)?)),
        Schema::BitString => {
            let [unused, rest @ ..] = content else {
                return Err(CodecError::corrupted_at(
                    "BIT STRING content needs an unused-bits octet",
                    content_pos,
                ));
            };
            if *unused != 0 {
                return Err(CodecError::corrupted_at(
                    format!("unsupported non-octet-aligned BIT STRING ({unused} unused bits)"),
                    content_pos,
                ));
            }
            Ok(AnyValue::Bytes(rest.to_vec()))
        }
        Schema::Sequence(fields) => {
            let mut inner = DerReader::nested(content, content_pos);
            let mut map = ValueMap::with_capacity(fields.len());
            for field in fields {
                if inner.is_at_end() {
                    if field.optional {
                        continue;
                    }
                    return Err(CodecError::KeyNotFound(field.name.clone()));
                }
                let wire = inner.peek_tag()?;
                if !field.schema.accepts_tag(wire) {
                    if field.optional {
                        continue;
                    }
                    return Err(CodecError::structural(
                        format!("{} for field {:?}", field.schema.describe(), field.name),
                        wire,
                    ));
                }
                let value = decode_node(&mut inner, &field.schema, depth + 1)?;
                map.insert(AnyValue::String(field.name.clone()), value);
            }
            if !inner.is_at_end() {
                return Err(CodecError::corrupted_at(
                    "trailing data in SEQUENCE",
                    inner.position(),
                ));
            }
            Ok(AnyValue::Map(map))
        }
        Schema::SetOf(element) => {
            let mut inner = DerReader::nested(content, content_pos);
            let mut items = Vec::new();
            while !inner.is_at_end() {
                items.push(decode_node(&mut inner, element, depth + 1)?);
            }
            Ok(AnyValue::List(items))
        }
        // Handled above.
        Schema::Choice(_) => unreachable!("choice resolved before tag dispatch"),
    }
}

fn decode_text(content: &[u8], position: usize) -> Result<AnyValue, CodecError> {
    let s = std::str::from_utf8(content).map_err(|e| {
        CodecError::corrupted_at("invalid UTF-8 in string content", position + e.valid_up_to())
    })?;
    Ok(AnyValue::String(s.to_owned()))
}

fn expect_tag(schema: &Schema) -> super::schema::Tag {
    // Every non-choice schema has exactly one tag.
    schema
        .expected_tag()
        .expect("choice schemas are resolved before tag emission")
}

fn mismatch(schema: &Schema, value: &AnyValue) -> CodecError {
    CodecError::InvalidValue(format!(
        "{} value cannot encode as {}",
        value.kind(),
        schema.describe()
    ))
}

/// Whether a value's kind can encode under this schema node. Used for
/// choice-alternative selection; first declared match wins.
fn accepts_value(schema: &Schema, value: &AnyValue) -> bool {
    match schema {
        Schema::Boolean => value.as_bool().is_some(),
        Schema::Integer => value.is_integer(),
        Schema::Null => value.is_nil(),
        Schema::OctetString | Schema::BitString => value.as_bytes().is_some(),
        Schema::Utf8String | Schema::PrintableString | Schema::Ia5String
        | Schema::ObjectIdentifier => value.as_str().is_some(),
        Schema::Sequence(_) => value.as_map().is_some(),
        Schema::SetOf(_) => value.as_list().is_some(),
        Schema::Choice(alternatives) => {
            alternatives.iter().any(|(_, alt)| accepts_value(alt, value))
        }
    }
}

fn check_unknown_keys(map: &ValueMap, fields: &[Field]) -> Result<(), CodecError> {
    for key in map.keys() {
        let Some(name) = key.as_str() else {
            return Err(CodecError::InvalidValue(format!(
                "SEQUENCE keys must be strings, got {}",
                key.kind()
            )));
        };
        if !fields.iter().any(|f| f.name == name) {
            return Err(CodecError::InvalidValue(format!(
                "key {name:?} has no field in the SEQUENCE schema"
            )));
        }
    }
    Ok(())
}

/// PrintableString alphabet per X.680.
fn is_printable(c: char) -> bool {
    c.is_ascii_alphanumeric() || " '()+,-./:=?".contains(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn encoded(value: &AnyValue, schema: &Schema) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_value(&mut buf, value, schema).expect("encode failed");
        buf.to_vec()
    }

    fn round_trip(value: &AnyValue, schema: &Schema) -> AnyValue {
        decode_value(&encoded(value, schema), schema).expect("decode failed")
    }

    fn person_schema() -> Schema {
        Schema::Sequence(vec![
            Field::new("name", Schema::Utf8String),
            Field::new("age", Schema::Integer),
            Field::optional("email", Schema::Ia5String),
        ])
    }

    fn person(email: bool) -> AnyValue {
        let mut map = ValueMap::new();
        map.insert("name".into(), AnyValue::String("Ada".into()));
        map.insert("age".into(), AnyValue::I64(36));
        if email {
            map.insert("email".into(), AnyValue::String("ada@example.com".into()));
        }
        AnyValue::Map(map)
    }

    #[test]
    fn primitive_vectors() {
        assert_eq!(encoded(&AnyValue::Bool(true), &Schema::Boolean), [0x01, 0x01, 0xFF]);
        assert_eq!(encoded(&AnyValue::Bool(false), &Schema::Boolean), [0x01, 0x01, 0x00]);
        assert_eq!(encoded(&AnyValue::Nil, &Schema::Null), [0x05, 0x00]);
        assert_eq!(encoded(&AnyValue::I64(127), &Schema::Integer), [0x02, 0x01, 0x7F]);
        assert_eq!(
            encoded(&AnyValue::I64(128), &Schema::Integer),
            [0x02, 0x02, 0x00, 0x80]
        );
        assert_eq!(
            encoded(&AnyValue::String("hi".into()), &Schema::Utf8String),
            [0x0C, 0x02, 0x68, 0x69]
        );
    }

    #[test]
    fn integer_round_trip_and_normalization() {
        for v in [0i64, 1, -1, 127, 128, -128, -129, i64::MAX, i64::MIN] {
            assert_eq!(
                round_trip(&AnyValue::I64(v), &Schema::Integer),
                AnyValue::I64(v),
                "failed for {v}"
            );
        }
        // Narrow widths decode to the canonical variant.
        assert_eq!(round_trip(&AnyValue::I8(5), &Schema::Integer), AnyValue::I64(5));
        assert_eq!(round_trip(&AnyValue::U8(200), &Schema::Integer), AnyValue::I64(200));

        // Beyond 64 bits stays arbitrary precision.
        let big = BigInt::from(1u8) << 100usize;
        assert_eq!(
            round_trip(&AnyValue::BigInt(big.clone()), &Schema::Integer),
            AnyValue::BigInt(big)
        );
    }

    #[test]
    fn sequence_declared_order_and_optional() {
        let bytes = encoded(&person(true), &person_schema());
        // SEQUENCE { UTF8String "Ada", INTEGER 36, IA5String ... }
        assert_eq!(bytes[0], 0x30);
        assert_eq!(&bytes[2..7], &[0x0C, 0x03, 0x41, 0x64, 0x61]);
        assert_eq!(&bytes[7..10], &[0x02, 0x01, 0x24]);
        assert_eq!(bytes[10], 0x16);

        let decoded = round_trip(&person(true), &person_schema());
        assert_eq!(decoded, person(true));
    }

    #[test]
    fn optional_field_absent() {
        let decoded = round_trip(&person(false), &person_schema());
        assert_eq!(decoded, person(false));
    }

    #[test]
    fn missing_required_field() {
        let mut map = ValueMap::new();
        map.insert("name".into(), AnyValue::String("Ada".into()));
        let mut buf = BytesMut::new();
        match encode_value(&mut buf, &AnyValue::Map(map), &person_schema()) {
            Err(CodecError::KeyNotFound(key)) => assert_eq!(key, "age"),
            other => panic!("expected KeyNotFound, got {other:?}"),
        }
        // Nothing reached the caller's buffer.
        assert!(buf.is_empty());
    }

    #[test]
    fn unknown_key_rejected_at_encode() {
        let mut map = ValueMap::new();
        map.insert("name".into(), AnyValue::String("Ada".into()));
        map.insert("age".into(), AnyValue::I64(1));
        map.insert("shoe_size".into(), AnyValue::I64(43));
        let mut buf = BytesMut::new();
        assert!(matches!(
            encode_value(&mut buf, &AnyValue::Map(map), &person_schema()),
            Err(CodecError::InvalidValue(_))
        ));
    }

    #[test]
    fn sequence_wire_order_becomes_map_order() {
        let schema = Schema::sequence([
            ("c", Schema::Integer),
            ("a", Schema::Integer),
            ("b", Schema::Integer),
        ]);
        let mut map = ValueMap::new();
        // Insertion order differs from schema order; the wire follows the
        // schema, and decode follows the wire.
        map.insert("b".into(), AnyValue::I64(3));
        map.insert("c".into(), AnyValue::I64(1));
        map.insert("a".into(), AnyValue::I64(2));

        let decoded = round_trip(&AnyValue::Map(map), &schema);
        let AnyValue::Map(decoded) = decoded else {
            panic!("expected map");
        };
        let keys: Vec<_> = decoded.keys().cloned().collect();
        let expected: Vec<AnyValue> = vec!["c".into(), "a".into(), "b".into()];
        assert_eq!(keys, expected);
    }

    #[test]
    fn set_of_iteration_order() {
        let schema = Schema::set_of(Schema::Integer);
        let value = AnyValue::List(vec![AnyValue::I64(3), AnyValue::I64(1), AnyValue::I64(2)]);
        assert_eq!(
            round_trip(&value, &schema),
            AnyValue::List(vec![AnyValue::I64(3), AnyValue::I64(1), AnyValue::I64(2)])
        );
    }

    #[test]
    fn choice_selects_by_tag() {
        let schema = Schema::Choice(vec![
            ("num".into(), Schema::Integer),
            ("text".into(), Schema::Utf8String),
        ]);
        assert_eq!(round_trip(&AnyValue::I64(7), &schema), AnyValue::I64(7));
        assert_eq!(
            round_trip(&AnyValue::String("x".into()), &schema),
            AnyValue::String("x".into())
        );

        // A tag outside the choice fails structurally.
        let bool_bytes = encoded(&AnyValue::Bool(true), &Schema::Boolean);
        assert!(matches!(
            decode_value(&bool_bytes, &schema),
            Err(CodecError::Structural { .. })
        ));
    }

    #[test]
    fn schema_mismatch_is_structural_not_coerced() {
        let int_bytes = encoded(&AnyValue::I64(1), &Schema::Integer);
        match decode_value(&int_bytes, &Schema::Utf8String) {
            Err(CodecError::Structural { expected, actual }) => {
                assert!(expected.contains("UTF8String"), "{expected}");
                assert!(actual.contains("2"), "{actual}");
            }
            other => panic!("expected Structural, got {other:?}"),
        }
    }

    #[test]
    fn oid_and_bit_string_round_trip() {
        assert_eq!(
            round_trip(
                &AnyValue::String("1.2.840.113549".into()),
                &Schema::ObjectIdentifier
            ),
            AnyValue::String("1.2.840.113549".into())
        );
        assert_eq!(
            round_trip(&AnyValue::Bytes(vec![0xDE, 0xAD]), &Schema::BitString),
            AnyValue::Bytes(vec![0xDE, 0xAD])
        );
    }

    #[test]
    fn printable_string_charset_enforced() {
        let mut buf = BytesMut::new();
        assert!(matches!(
            encode_value(
                &mut buf,
                &AnyValue::String("not@printable".into()),
                &Schema::PrintableString
            ),
            Err(CodecError::InvalidValue(_))
        ));
    }

    #[test]
    fn nonminimal_wire_integer_rejected() {
        // INTEGER with a redundant 0x00 prefix.
        assert!(matches!(
            decode_value(&[0x02, 0x02, 0x00, 0x01], &Schema::Integer),
            Err(CodecError::Corrupted { .. })
        ));
    }

    #[test]
    fn depth_limit_on_nested_schema() {
        // Build a schema and matching value nested past the limit.
        let mut schema = Schema::Integer;
        let mut value = AnyValue::I64(1);
        for _ in 0..(MAX_NESTING_DEPTH + 8) {
            schema = Schema::set_of(schema);
            value = AnyValue::List(vec![value]);
        }
        let mut buf = BytesMut::new();
        encode_value(&mut buf, &value, &schema).unwrap();
        assert!(matches!(
            decode_value(&buf, &schema),
            Err(CodecError::DepthExceeded { .. })
        ));
    }

    #[test]
    fn boolean_content_strictness() {
        // BER-legal but DER-illegal truthy octet.
        assert!(matches!(
            decode_value(&[0x01, 0x01, 0x01], &Schema::Boolean),
            Err(CodecError::Corrupted { .. })
        ));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut bytes = encoded(&AnyValue::I64(1), &Schema::Integer);
        bytes.push(0x00);
        assert!(matches!(
            decode_value(&bytes, &Schema::Integer),
            Err(CodecError::Corrupted { .. })
        ));
    }
}
