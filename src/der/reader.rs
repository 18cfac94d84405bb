//! DER reading: tag-length-value parsing and content decodings.

use num_bigint::{BigInt, BigUint, Sign};

use super::schema::Tag;
use crate::error::CodecError;

/// Position-tracked reader over DER bytes.
///
/// Positions in errors are absolute within the outermost input: nested
/// readers carry the offset of their content slice.
#[derive(Debug)]
pub struct DerReader<'a> {
    data: &'a [u8],
    pos: usize,
    offset: usize,
}

impl<'a> DerReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            offset: 0,
        }
    }

    /// Reader over a nested content slice, reporting absolute positions.
    pub fn nested(data: &'a [u8], offset: usize) -> Self {
        Self {
            data,
            pos: 0,
            offset,
        }
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Absolute byte position, for error reporting.
    pub fn position(&self) -> usize {
        self.offset + self.pos
    }

    /// Parses the next TLV, returning its tag, content slice, and the
    /// absolute offset of the content.
    pub fn read_tlv(&mut self) -> Result<(Tag, &'a [u8], usize), CodecError> {
        let tag = self.read_tag()?;
        let len = self.read_length()?;
        let content_offset = self.position();
        if self.data.len() - self.pos < len {
            return Err(CodecError::corrupted_at(
                format!("content length {len} exceeds remaining input"),
                content_offset,
            ));
        }
        let content = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok((tag, content, content_offset))
    }

    /// Parses the next tag without consuming anything.
    pub fn peek_tag(&self) -> Result<Tag, CodecError> {
        let mut probe = Self {
            data: self.data,
            pos: self.pos,
            offset: self.offset,
        };
        probe.read_tag()
    }

    fn read_byte(&mut self, context: &str) -> Result<u8, CodecError> {
        if self.pos >= self.data.len() {
            return Err(CodecError::corrupted_at(
                format!("unexpected end of input reading {context}"),
                self.position(),
            ));
        }
        let byte = self.data[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    fn read_tag(&mut self) -> Result<Tag, CodecError> {
        let start = self.position();
        let leading = self.read_byte("tag")?;
        let class = leading >> 6;
        let constructed = leading & 0x20 != 0;
        let number = if leading & 0x1F != 0x1F {
            u32::from(leading & 0x1F)
        } else {
            // High-tag-number form: minimal base-128.
            let mut number: u32 = 0;
            loop {
                let byte = self.read_byte("tag number")?;
                if number == 0 && byte == 0x80 {
                    return Err(CodecError::corrupted_at("non-minimal tag number", start));
                }
                number = number
                    .checked_mul(128)
                    .and_then(|n| n.checked_add(u32::from(byte & 0x7F)))
                    .ok_or_else(|| CodecError::corrupted_at("tag number too large", start))?;
                if byte & 0x80 == 0 {
                    break;
                }
            }
            if number < 31 {
                return Err(CodecError::corrupted_at("non-minimal tag number", start));
            }
            number
        };
        Ok(Tag {
            class,
            constructed,
            number,
        })
    }

    fn read_length(&mut self) -> Result<usize, CodecError> {
        let start = self.position();
        let first = self.read_byte("length")?;
        if first & 0x80 == 0 {
            return Ok(usize::from(first));
        }
        let count = usize::from(first & 0x7F);
        if count == 0 {
            return Err(CodecError::corrupted_at(
                "indefinite length is not permitted in DER",
                start,
            ));
        }
        if count > size_of::<usize>() {
            return Err(CodecError::corrupted_at(
                format!("length of {count} octets too large"),
                start,
            ));
        }
        let mut len: usize = 0;
        for i in 0..count {
            let byte = self.read_byte("length")?;
            if i == 0 && byte == 0 {
                return Err(CodecError::corrupted_at(
                    "non-minimal length: leading zero octet",
                    start,
                ));
            }
            len = (len << 8) | usize::from(byte);
        }
        if len <= 127 {
            return Err(CodecError::corrupted_at(
                "non-minimal length: long form for a short value",
                start,
            ));
        }
        Ok(len)
    }
}

/// Reads INTEGER content octets: minimal big-endian two's complement.
pub fn integer_value(content: &[u8], position: usize) -> Result<BigInt, CodecError> {
    if content.is_empty() {
        return Err(CodecError::corrupted_at("empty INTEGER content", position));
    }
    // DER minimality: the first nine bits must not be all-equal.
    if content.len() >= 2
        && ((content[0] == 0x00 && content[1] & 0x80 == 0)
            || (content[0] == 0xFF && content[1] & 0x80 != 0))
    {
        return Err(CodecError::corrupted_at(
            "non-minimal INTEGER encoding",
            position,
        ));
    }
    if content[0] & 0x80 == 0 {
        Ok(BigInt::from_bytes_be(Sign::Plus, content))
    } else {
        // Negative: subtract 2^(8n) from the unsigned reading.
        let unsigned = BigUint::from_bytes_be(content);
        Ok(BigInt::from(unsigned) - (BigInt::from(1) << (8 * content.len())))
    }
}

/// Reads OBJECT IDENTIFIER content octets into dotted-decimal notation.
pub fn oid_value(content: &[u8], position: usize) -> Result<String, CodecError> {
    if content.is_empty() {
        return Err(CodecError::corrupted_at("empty OID content", position));
    }
    let mut arcs: Vec<u64> = Vec::new();
    let mut acc: u64 = 0;
    let mut continuing = false;
    for (i, &byte) in content.iter().enumerate() {
        if !continuing && byte == 0x80 {
            return Err(CodecError::corrupted_at(
                "non-minimal OID arc",
                position + i,
            ));
        }
        acc = acc
            .checked_mul(128)
            .and_then(|a| a.checked_add(u64::from(byte & 0x7F)))
            .ok_or_else(|| CodecError::corrupted_at("OID arc too large", position + i))?;
        if byte & 0x80 == 0 {
            if arcs.is_empty() {
                // Unpack the combined leading pair.
                let (first, second) = match acc {
                    0..=39 => (0, acc),
                    40..=79 => (1, acc - 40),
                    _ => (2, acc - 80),
                };
                arcs.push(first);
                arcs.push(second);
            } else {
                arcs.push(acc);
            }
            acc = 0;
            continuing = false;
        } else {
            continuing = true;
        }
    }
    if continuing {
        return Err(CodecError::corrupted_at(
            "truncated OID arc",
            position + content.len(),
        ));
    }
    Ok(arcs
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::der::schema::tag;
    use crate::der::writer::{integer_content, oid_content, DerWriter};

    #[test]
    fn tlv_round_trip() {
        let mut w = DerWriter::new();
        w.append(Tag::universal(tag::OCTET_STRING), &[1, 2, 3]);
        let bytes = w.finish();

        let mut r = DerReader::new(&bytes);
        let (t, content, offset) = r.read_tlv().unwrap();
        assert_eq!(t, Tag::universal(tag::OCTET_STRING));
        assert_eq!(content, &[1, 2, 3]);
        assert_eq!(offset, 2);
        assert!(r.is_at_end());
    }

    #[test]
    fn long_form_length_round_trip() {
        let payload = vec![0xCD; 0x0100];
        let mut w = DerWriter::new();
        w.append(Tag::universal(tag::OCTET_STRING), &payload);
        let bytes = w.finish();

        let mut r = DerReader::new(&bytes);
        let (_, content, _) = r.read_tlv().unwrap();
        assert_eq!(content, &payload[..]);
    }

    #[test]
    fn high_tag_round_trip() {
        let t = Tag {
            class: crate::der::schema::class::CONTEXT,
            constructed: true,
            number: 1000,
        };
        let mut w = DerWriter::new();
        w.append(t, &[]);
        let bytes = w.finish();

        let mut r = DerReader::new(&bytes);
        let (parsed, content, _) = r.read_tlv().unwrap();
        assert_eq!(parsed, t);
        assert!(content.is_empty());
    }

    #[test]
    fn rejects_indefinite_and_nonminimal_length() {
        // 0x80 length octet: indefinite.
        assert!(DerReader::new(&[0x04, 0x80]).read_tlv().is_err());
        // Long form used for a value that fits the short form.
        assert!(DerReader::new(&[0x04, 0x81, 0x05, 0, 0, 0, 0, 0]).read_tlv().is_err());
        // Leading zero length octet.
        assert!(DerReader::new(&[0x04, 0x82, 0x00, 0x90]).read_tlv().is_err());
    }

    #[test]
    fn rejects_truncated_content() {
        let r = DerReader::new(&[0x04, 0x05, 1, 2]).read_tlv();
        match r {
            Err(CodecError::Corrupted { position, .. }) => assert_eq!(position, Some(2)),
            other => panic!("expected Corrupted, got {other:?}"),
        }
    }

    #[test]
    fn integer_round_trip_boundaries() {
        let cases = [
            0i64,
            1,
            -1,
            127,
            128,
            -128,
            -129,
            0x0FFF_FFFF,
            0x1000_0000,
            -0x0FFF_FFFF,
            -0x1000_0000,
            i64::MAX,
            i64::MIN,
        ];
        for v in cases {
            let content = integer_content(&BigInt::from(v));
            let back = integer_value(&content, 0).unwrap();
            assert_eq!(back, BigInt::from(v), "failed for {v}");
        }
    }

    #[test]
    fn integer_round_trip_beyond_64_bits() {
        for v in [
            BigInt::from(u64::MAX) + 1,
            BigInt::from(1u8) << 128usize,
            -(BigInt::from(1u8) << 128usize) - 1,
        ] {
            let content = integer_content(&v);
            assert_eq!(integer_value(&content, 0).unwrap(), v, "failed for {v}");
        }
    }

    #[test]
    fn integer_rejects_redundant_prefix() {
        assert!(integer_value(&[0x00, 0x01], 0).is_err());
        assert!(integer_value(&[0xFF, 0x80], 0).is_err());
        // These prefixes are load-bearing, not redundant.
        assert!(integer_value(&[0x00, 0x80], 0).is_ok());
        assert!(integer_value(&[0xFF, 0x7F], 0).is_ok());
    }

    #[test]
    fn oid_round_trip() {
        for dotted in ["1.2.840.113549", "2.5.4.3", "0.9.2342", "2.999.1"] {
            let content = oid_content(dotted).unwrap();
            assert_eq!(oid_value(&content, 0).unwrap(), dotted, "failed for {dotted}");
        }
    }

    #[test]
    fn oid_rejects_truncated_arc() {
        // Continuation bit set on the final octet.
        assert!(oid_value(&[0x2A, 0x86], 0).is_err());
    }
}
