//! CBOR decoding: bytes → `AnyValue`.

use num_bigint::{BigInt, BigUint};

use super::major;
use crate::error::CodecError;
use crate::value::{AnyValue, Decimal, Timestamp, ValueMap};
use crate::MAX_NESTING_DEPTH;

/// Decodes a single CBOR data item occupying the whole input.
///
/// Integers normalize to `U64`/`I64`, or to the arbitrary-precision
/// variants when the mathematical value overflows 64 bits. Float widths are
/// preserved — CBOR distinguishes them on the wire. Map entries keep wire
/// order.
pub fn decode_value(data: &[u8]) -> Result<AnyValue, CodecError> {
    let mut reader = CborReader::new(data);
    let value = reader.read_value(0)?;
    if !reader.is_at_end() {
        return Err(CodecError::corrupted_at(
            "trailing bytes after data item",
            reader.pos,
        ));
    }
    tracing::trace!(bytes = data.len(), kind = value.kind(), "decoded CBOR item");
    Ok(value)
}

/// Position-tracked reader over an in-memory buffer.
struct CborReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> CborReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_byte(&mut self, context: &str) -> Result<u8, CodecError> {
        if self.pos >= self.data.len() {
            return Err(CodecError::corrupted_at(
                format!("unexpected end of input reading {context}"),
                self.pos,
            ));
        }
        let byte = self.data[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    fn read_slice(&mut self, len: usize, context: &str) -> Result<&'a [u8], CodecError> {
        if self.remaining() < len {
            return Err(CodecError::corrupted_at(
                format!("unexpected end of input reading {context}"),
                self.pos,
            ));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Reads the argument for additional info `info` (majors 0-6).
    fn read_arg(&mut self, info: u8) -> Result<u64, CodecError> {
        match info {
            0..=23 => Ok(u64::from(info)),
            major::AI_U8 => Ok(u64::from(self.read_byte("argument")?)),
            major::AI_U16 => {
                let b = self.read_slice(2, "argument")?;
                Ok(u64::from(u16::from_be_bytes([b[0], b[1]])))
            }
            major::AI_U32 => {
                let b = self.read_slice(4, "argument")?;
                Ok(u64::from(u32::from_be_bytes([b[0], b[1], b[2], b[3]])))
            }
            major::AI_U64 => {
                let b = self.read_slice(8, "argument")?;
                Ok(u64::from_be_bytes([
                    b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
                ]))
            }
            major::AI_INDEFINITE => Err(CodecError::corrupted_at(
                "indefinite-length items are not supported",
                self.pos - 1,
            )),
            _ => Err(CodecError::corrupted_at(
                format!("reserved additional info {info}"),
                self.pos - 1,
            )),
        }
    }

    /// Reads a length argument and checks it against the bytes left, so a
    /// hostile length cannot drive a huge allocation.
    fn read_len(&mut self, info: u8, context: &str) -> Result<usize, CodecError> {
        let arg = self.read_arg(info)?;
        let len = usize::try_from(arg).map_err(|_| {
            CodecError::corrupted_at(format!("{context} length {arg} too large"), self.pos)
        })?;
        if len > self.remaining() {
            return Err(CodecError::corrupted_at(
                format!("{context} length {len} exceeds remaining input"),
                self.pos,
            ));
        }
        Ok(len)
    }

    fn read_value(&mut self, depth: usize) -> Result<AnyValue, CodecError> {
        if depth >= MAX_NESTING_DEPTH {
            return Err(CodecError::DepthExceeded {
                limit: MAX_NESTING_DEPTH,
            });
        }

        let initial = self.read_byte("initial byte")?;
        let m = initial >> 5;
        let info = initial & 0x1F;

        match m {
            major::UNSIGNED => Ok(AnyValue::U64(self.read_arg(info)?)),

            major::NEGATIVE => {
                let n = self.read_arg(info)?;
                // Value is -(1 + n); past i64::MAX it no longer fits i64.
                if n <= i64::MAX as u64 {
                    Ok(AnyValue::I64(-1 - n as i64))
                } else {
                    Ok(AnyValue::BigInt(-BigInt::from(n) - 1))
                }
            }

            major::BYTES => {
                let len = self.read_len(info, "byte string")?;
                Ok(AnyValue::Bytes(self.read_slice(len, "byte string")?.to_vec()))
            }

            major::TEXT => {
                let len = self.read_len(info, "text string")?;
                let start = self.pos;
                let bytes = self.read_slice(len, "text string")?;
                let s = std::str::from_utf8(bytes).map_err(|e| {
                    CodecError::corrupted_at("invalid UTF-8 in text string", start + e.valid_up_to())
                })?;
                Ok(AnyValue::String(s.to_owned()))
            }

            major::ARRAY => {
                let len = self.read_len(info, "array")?;
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(self.read_value(depth + 1)?);
                }
                Ok(AnyValue::List(items))
            }

            major::MAP => {
                let len = self.read_len(info, "map")?;
                let mut map = ValueMap::with_capacity(len);
                for _ in 0..len {
                    let key = self.read_value(depth + 1)?;
                    let value = self.read_value(depth + 1)?;
                    map.insert(key, value);
                }
                Ok(AnyValue::Map(map))
            }

            major::TAG => {
                let tag = self.read_arg(info)?;
                self.read_tagged(tag, depth)
            }

            // major::SIMPLE
            _ => self.read_simple(info),
        }
    }

    fn read_simple(&mut self, info: u8) -> Result<AnyValue, CodecError> {
        match info {
            major::SIMPLE_FALSE => Ok(AnyValue::Bool(false)),
            major::SIMPLE_TRUE => Ok(AnyValue::Bool(true)),
            major::SIMPLE_NULL => Ok(AnyValue::Nil),
            // "undefined" normalizes to nil.
            major::SIMPLE_UNDEFINED => Ok(AnyValue::Nil),
            major::FLOAT_16 => {
                let b = self.read_slice(2, "half-precision float")?;
                Ok(AnyValue::F16(u16::from_be_bytes([b[0], b[1]])))
            }
            major::FLOAT_32 => {
                let b = self.read_slice(4, "single-precision float")?;
                Ok(AnyValue::F32(f32::from_be_bytes([b[0], b[1], b[2], b[3]])))
            }
            major::FLOAT_64 => {
                let b = self.read_slice(8, "double-precision float")?;
                Ok(AnyValue::F64(f64::from_be_bytes([
                    b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
                ])))
            }
            major::AI_U8 => {
                // Two-byte simple value (32..=255); none are in the model.
                let value = self.read_byte("simple value")?;
                Err(CodecError::structural(
                    "supported simple value",
                    format!("simple({value})"),
                ))
            }
            major::AI_INDEFINITE => Err(CodecError::corrupted_at(
                "unexpected break code outside indefinite-length item",
                self.pos - 1,
            )),
            other => Err(CodecError::structural(
                "supported simple value",
                format!("simple({other})"),
            )),
        }
    }

    fn read_tagged(&mut self, tag: u64, depth: usize) -> Result<AnyValue, CodecError> {
        match tag {
            major::TAG_EPOCH_TIME => {
                let inner = self.read_value(depth + 1)?;
                decode_timestamp(&inner)
            }
            major::TAG_POS_BIGNUM => {
                let inner = self.read_value(depth + 1)?;
                let bytes = inner.as_bytes().ok_or_else(|| {
                    CodecError::structural("byte string under bignum tag", inner.kind())
                })?;
                let n = BigUint::from_bytes_be(bytes);
                // Normalize back into the canonical 64-bit variant when it fits.
                Ok(match u64::try_from(&n) {
                    Ok(small) => AnyValue::U64(small),
                    Err(_) => AnyValue::BigUint(n),
                })
            }
            major::TAG_NEG_BIGNUM => {
                let inner = self.read_value(depth + 1)?;
                let bytes = inner.as_bytes().ok_or_else(|| {
                    CodecError::structural("byte string under bignum tag", inner.kind())
                })?;
                let value = -BigInt::from(BigUint::from_bytes_be(bytes)) - 1;
                Ok(match i64::try_from(&value) {
                    Ok(small) => AnyValue::I64(small),
                    Err(_) => AnyValue::BigInt(value),
                })
            }
            major::TAG_DECIMAL_FRACTION => {
                let inner = self.read_value(depth + 1)?;
                decode_decimal(&inner)
            }
            major::TAG_URI => {
                let inner = self.read_value(depth + 1)?;
                let s = inner
                    .as_str()
                    .ok_or_else(|| CodecError::structural("text string under URI tag", inner.kind()))?;
                let u = url::Url::parse(s)
                    .map_err(|e| CodecError::corrupted(format!("invalid URI: {e}")))?;
                Ok(AnyValue::Url(u))
            }
            major::TAG_UUID => {
                let inner = self.read_value(depth + 1)?;
                let bytes = inner.as_bytes().ok_or_else(|| {
                    CodecError::structural("byte string under UUID tag", inner.kind())
                })?;
                let u = uuid::Uuid::from_slice(bytes).map_err(|_| {
                    CodecError::corrupted(format!("UUID must be 16 bytes, got {}", bytes.len()))
                })?;
                Ok(AnyValue::Uuid(u))
            }
            other => Err(CodecError::structural(
                "supported semantic tag",
                format!("tag {other}"),
            )),
        }
    }
}

fn decode_timestamp(inner: &AnyValue) -> Result<AnyValue, CodecError> {
    match inner {
        AnyValue::U64(s) => {
            let seconds = i64::try_from(*s).map_err(|_| {
                CodecError::corrupted(format!("epoch seconds {s} out of range"))
            })?;
            Ok(AnyValue::Timestamp(Timestamp::from_seconds(seconds)))
        }
        AnyValue::I64(s) => Ok(AnyValue::Timestamp(Timestamp::from_seconds(*s))),
        AnyValue::F16(_) | AnyValue::F32(_) | AnyValue::F64(_) => {
            let epoch = inner.as_f64().unwrap_or_default();
            if !epoch.is_finite() || epoch < i64::MIN as f64 || epoch > i64::MAX as f64 {
                return Err(CodecError::corrupted(format!(
                    "epoch seconds {epoch} out of range"
                )));
            }
            let mut seconds = epoch.floor() as i64;
            let mut nanos = ((epoch - epoch.floor()) * 1e9).round() as u32;
            if nanos >= 1_000_000_000 {
                seconds += 1;
                nanos = 0;
            }
            Ok(AnyValue::Timestamp(Timestamp { seconds, nanos }))
        }
        other => Err(CodecError::structural(
            "integer or float under epoch tag",
            other.kind(),
        )),
    }
}

fn decode_decimal(inner: &AnyValue) -> Result<AnyValue, CodecError> {
    let items = inner
        .as_list()
        .ok_or_else(|| CodecError::structural("2-element array under decimal tag", inner.kind()))?;
    let [exponent, mantissa] = items else {
        return Err(CodecError::structural(
            "2-element array under decimal tag",
            format!("{}-element array", items.len()),
        ));
    };
    let exponent = exponent.as_i64().ok_or_else(|| {
        CodecError::structural("integer decimal exponent", exponent.kind())
    })?;
    let mantissa = mantissa.to_bigint().ok_or_else(|| {
        CodecError::structural("integer decimal mantissa", mantissa.kind())
    })?;
    Ok(AnyValue::Decimal(Decimal {
        mantissa,
        exponent,
    }))
}
