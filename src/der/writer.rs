//! DER writing: tag-length-value emission and content encodings.

use bytes::{BufMut, BytesMut};
use num_bigint::{BigInt, BigUint, Sign};

use super::schema::Tag;
use crate::error::CodecError;

/// Writes DER tag-length-value triplets into a growable buffer.
///
/// Nested constructed values are built bottom-up: encode the children into
/// their own writer, then `append` the finished content under the outer
/// tag — definite lengths require the content size up front.
#[derive(Debug, Default)]
pub struct DerWriter {
    buf: BytesMut,
}

impl DerWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Appends one TLV: tag, definite length, content.
    pub fn append(&mut self, tag: Tag, content: &[u8]) {
        self.write_tag(tag);
        self.write_length(content.len());
        self.buf.put_slice(content);
    }

    /// Consumes the writer, yielding the encoded bytes.
    pub fn finish(self) -> BytesMut {
        self.buf
    }

    /// Tag octets: single byte for numbers below 31, high-tag-number form
    /// (0x1F marker, then minimal base-128) above.
    fn write_tag(&mut self, tag: Tag) {
        let leading = (tag.class << 6) | (u8::from(tag.constructed) << 5);
        if tag.number < 31 {
            self.buf.put_u8(leading | tag.number as u8);
        } else {
            self.buf.put_u8(leading | 0x1F);
            put_base128(&mut self.buf, u64::from(tag.number));
        }
    }

    /// Length octets: short form through 127, long form above — count
    /// octet with the high bit set, then the minimal big-endian length.
    fn write_length(&mut self, len: usize) {
        if len <= 127 {
            self.buf.put_u8(len as u8);
        } else {
            let bytes = len.to_be_bytes();
            let skip = bytes.iter().take_while(|&&b| b == 0).count();
            let bytes = &bytes[skip..];
            self.buf.put_u8(0x80 | bytes.len() as u8);
            self.buf.put_slice(bytes);
        }
    }
}

/// Minimal base-128: seven value bits per octet, high bit set on all but
/// the last.
fn put_base128(buf: &mut BytesMut, value: u64) {
    let mut septets = [0u8; 10];
    let mut i = septets.len();
    let mut v = value;
    loop {
        i -= 1;
        septets[i] = (v & 0x7F) as u8;
        v >>= 7;
        if v == 0 {
            break;
        }
    }
    let last = septets.len() - 1;
    for (j, &septet) in septets.iter().enumerate().skip(i) {
        buf.put_u8(if j == last { septet } else { septet | 0x80 });
    }
}

/// Content octets of an INTEGER: minimal big-endian two's complement.
///
/// Zero is a single `0x00`. A non-negative value whose leading bit is set
/// gets a `0x00` disambiguation prefix; a negative value whose
/// two's-complement leading bit is clear gets `0xFF`.
pub fn integer_content(value: &BigInt) -> Vec<u8> {
    match value.sign() {
        Sign::NoSign => vec![0x00],
        Sign::Plus => {
            let mut bytes = value.magnitude().to_bytes_be();
            if bytes[0] & 0x80 != 0 {
                bytes.insert(0, 0x00);
            }
            bytes
        }
        Sign::Minus => {
            let magnitude = value.magnitude();
            let width = magnitude.to_bytes_be().len();
            // Two's complement sized to the magnitude's byte count.
            let complement = (BigUint::from(1u8) << (8 * width)) - magnitude;
            let raw = complement.to_bytes_be();
            let mut bytes = vec![0u8; width - raw.len()];
            bytes.extend_from_slice(&raw);
            if bytes[0] & 0x80 == 0 {
                bytes.insert(0, 0xFF);
            }
            bytes
        }
    }
}

/// Content octets of an OBJECT IDENTIFIER from dotted-decimal notation.
///
/// The first two arcs pack as `40 * a + b`; every arc is minimal base-128.
pub fn oid_content(dotted: &str) -> Result<Vec<u8>, CodecError> {
    let mut arcs = Vec::new();
    for part in dotted.split('.') {
        let arc: u64 = part
            .parse()
            .map_err(|_| CodecError::InvalidValue(format!("invalid OID arc {part:?} in {dotted:?}")))?;
        arcs.push(arc);
    }
    if arcs.len() < 2 {
        return Err(CodecError::InvalidValue(format!(
            "OID {dotted:?} needs at least two arcs"
        )));
    }
    if arcs[0] > 2 || (arcs[0] < 2 && arcs[1] >= 40) {
        return Err(CodecError::InvalidValue(format!(
            "OID {dotted:?} has an out-of-range leading arc pair"
        )));
    }

    let mut buf = BytesMut::new();
    put_base128(&mut buf, arcs[0] * 40 + arcs[1]);
    for &arc in &arcs[2..] {
        put_base128(&mut buf, arc);
    }
    Ok(buf.to_vec())
}
