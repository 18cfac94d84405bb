//! Value-transforming hook for types without a native tree representation.

use crate::error::CodecError;

/// A strategy pair that carries a `T` through the containers as an
/// intermediate serializable `U`.
///
/// Containers invoke the pair transparently at the field that requests it:
/// `MapEncoder::encode_with` applies `encode` before lowering, and
/// `MapDecoder::decode_with` applies `decode` after lifting. Both directions
/// are explicit function pointers, so the hook needs no registry and no
/// trait objects.
pub struct Transform<T, U> {
    pub encode: fn(&T) -> Result<U, CodecError>,
    pub decode: fn(U) -> Result<T, CodecError>,
}

impl<T, U> Transform<T, U> {
    pub const fn new(
        encode: fn(&T) -> Result<U, CodecError>,
        decode: fn(U) -> Result<T, CodecError>,
    ) -> Self {
        Self { encode, decode }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A type with no tree form of its own, carried as a string.
    #[derive(Debug, PartialEq)]
    struct Version {
        major: u8,
        minor: u8,
    }

    const VERSION_AS_STRING: Transform<Version, String> = Transform::new(
        |v| Ok(format!("{}.{}", v.major, v.minor)),
        |s| {
            let (major, minor) = s
                .split_once('.')
                .ok_or_else(|| CodecError::InvalidValue(format!("bad version: {s:?}")))?;
            Ok(Version {
                major: major
                    .parse()
                    .map_err(|_| CodecError::InvalidValue(format!("bad version: {s:?}")))?,
                minor: minor
                    .parse()
                    .map_err(|_| CodecError::InvalidValue(format!("bad version: {s:?}")))?,
            })
        },
    );

    #[test]
    fn round_trips_through_intermediate() {
        let v = Version { major: 5, minor: 4 };
        let wire = (VERSION_AS_STRING.encode)(&v).unwrap();
        assert_eq!(wire, "5.4");
        assert_eq!((VERSION_AS_STRING.decode)(wire).unwrap(), v);
    }

    #[test]
    fn decode_failure_surfaces() {
        assert!(matches!(
            (VERSION_AS_STRING.decode)("junk".into()),
            Err(CodecError::InvalidValue(_))
        ));
    }
}
