//! ASN.1 schema model: a recursive description of expected DER structure.

/// Universal tag numbers.
pub mod tag {
    pub const BOOLEAN: u32 = 0x01;
    pub const INTEGER: u32 = 0x02;
    pub const BIT_STRING: u32 = 0x03;
    pub const OCTET_STRING: u32 = 0x04;
    pub const NULL: u32 = 0x05;
    pub const OBJECT_IDENTIFIER: u32 = 0x06;
    pub const UTF8_STRING: u32 = 0x0C;
    pub const PRINTABLE_STRING: u32 = 0x13;
    pub const IA5_STRING: u32 = 0x16;
    pub const SEQUENCE: u32 = 0x10;
    pub const SET: u32 = 0x11;
}

/// Tag classes (high two bits of the leading octet).
pub mod class {
    pub const UNIVERSAL: u8 = 0b00;
    pub const APPLICATION: u8 = 0b01;
    pub const CONTEXT: u8 = 0b10;
    pub const PRIVATE: u8 = 0b11;
}

/// A BER/DER tag: class, constructed bit, and tag number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    pub class: u8,
    pub constructed: bool,
    pub number: u32,
}

impl Tag {
    pub const fn universal(number: u32) -> Self {
        Self {
            class: class::UNIVERSAL,
            constructed: false,
            number,
        }
    }

    pub const fn constructed(number: u32) -> Self {
        Self {
            class: class::UNIVERSAL,
            constructed: true,
            number,
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let class = match self.class {
            class::UNIVERSAL => "universal",
            class::APPLICATION => "application",
            class::CONTEXT => "context",
            _ => "private",
        };
        write!(
            f,
            "{class} {}{}",
            self.number,
            if self.constructed { " (constructed)" } else { "" }
        )
    }
}

/// A named sequence field.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
    pub optional: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            optional: false,
        }
    }

    pub fn optional(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            optional: true,
        }
    }
}

/// Expected DER structure. A schema node constrains how a value is written
/// and read; it never holds data itself.
#[derive(Debug, Clone)]
pub enum Schema {
    Boolean,
    Integer,
    Null,
    OctetString,
    Utf8String,
    PrintableString,
    Ia5String,
    /// Dotted-decimal object identifier, e.g. `"1.2.840.113549"`.
    ObjectIdentifier,
    /// Octet-aligned bit string (zero unused bits).
    BitString,
    /// Named fields encoded in declared order.
    Sequence(Vec<Field>),
    /// Homogeneous collection, each element per the inner schema.
    SetOf(Box<Schema>),
    /// Untagged alternatives; the wire tag selects on decode.
    Choice(Vec<(String, Schema)>),
}

impl Schema {
    /// Convenience constructor for a sequence of required fields.
    pub fn sequence<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Schema)>,
        S: Into<String>,
    {
        Self::Sequence(
            fields
                .into_iter()
                .map(|(name, schema)| Field::new(name, schema))
                .collect(),
        )
    }

    pub fn set_of(element: Schema) -> Self {
        Self::SetOf(Box::new(element))
    }

    /// The single wire tag this schema expects, if it has one. `Choice`
    /// has none of its own.
    pub fn expected_tag(&self) -> Option<Tag> {
        match self {
            Self::Boolean => Some(Tag::universal(tag::BOOLEAN)),
            Self::Integer => Some(Tag::universal(tag::INTEGER)),
            Self::Null => Some(Tag::universal(tag::NULL)),
            Self::OctetString => Some(Tag::universal(tag::OCTET_STRING)),
            Self::Utf8String => Some(Tag::universal(tag::UTF8_STRING)),
            Self::PrintableString => Some(Tag::universal(tag::PRINTABLE_STRING)),
            Self::Ia5String => Some(Tag::universal(tag::IA5_STRING)),
            Self::ObjectIdentifier => Some(Tag::universal(tag::OBJECT_IDENTIFIER)),
            Self::BitString => Some(Tag::universal(tag::BIT_STRING)),
            Self::Sequence(_) => Some(Tag::constructed(tag::SEQUENCE)),
            Self::SetOf(_) => Some(Tag::constructed(tag::SET)),
            Self::Choice(_) => None,
        }
    }

    /// True when `wire` can begin a value of this schema.
    pub fn accepts_tag(&self, wire: Tag) -> bool {
        match self {
            Self::Choice(alts) => alts.iter().any(|(_, alt)| alt.accepts_tag(wire)),
            _ => self.expected_tag() == Some(wire),
        }
    }

    /// Human-readable descriptor for structural errors.
    pub fn describe(&self) -> String {
        match self {
            Self::Boolean => "BOOLEAN".into(),
            Self::Integer => "INTEGER".into(),
            Self::Null => "NULL".into(),
            Self::OctetString => "OCTET STRING".into(),
            Self::Utf8String => "UTF8String".into(),
            Self::PrintableString => "PrintableString".into(),
            Self::Ia5String => "IA5String".into(),
            Self::ObjectIdentifier => "OBJECT IDENTIFIER".into(),
            Self::BitString => "BIT STRING".into(),
            Self::Sequence(_) => "SEQUENCE".into(),
            Self::SetOf(_) => "SET OF".into(),
            Self::Choice(alts) => {
                let names: Vec<&str> = alts.iter().map(|(n, _)| n.as_str()).collect();
                format!("CHOICE {{{}}}", names.join(", "))
            }
        }
    }
}
