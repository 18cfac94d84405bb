//! Polymorphic reference resolution through a closed type registry.
//!
//! A [`Ref`] pairs a tree-encoded value with the type identifier of its
//! concrete type so heterogeneous values can travel through one field. The
//! [`TypeIndex`] is the security control surface: decoding instantiates
//! only types an administrator explicitly allowed, and resolution of
//! anything else fails closed.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use crate::error::CodecError;
use crate::tree::{Decode, Encode};
use crate::value::{AnyValue, ValueMap};

/// A type that can be wrapped in a polymorphic reference.
pub trait Polymorphic: Encode {
    /// Stable identifier written as the type discriminator.
    fn type_name(&self) -> &'static str;
}

type AnyBox = Box<dyn Any + Send + Sync>;
type DecodeFn = fn(&AnyValue) -> Result<AnyBox, CodecError>;

/// Monomorphized capability accessor, keyed by the capability's `TypeId`.
struct Caster<C: ?Sized + 'static> {
    cast: fn(&(dyn Any + Send + Sync)) -> Option<&C>,
}

/// One allow-list entry: a type identifier, its tree decoder, and the
/// finite set of capabilities it can be viewed through.
pub struct TypeEntry {
    id: String,
    decode: DecodeFn,
    casts: HashMap<TypeId, AnyBox>,
}

impl TypeEntry {
    /// Entry for a concrete type, decoding through its `Decode` impl.
    pub fn of<T>(id: impl Into<String>) -> Self
    where
        T: Decode + Any + Send + Sync,
    {
        Self {
            id: id.into(),
            decode: |tree| Ok(Box::new(T::decode(tree)?) as AnyBox),
            casts: HashMap::new(),
        }
    }

    /// Registers a checked downcast to a capability, typically
    /// `|any| any.downcast_ref::<T>().map(|t| t as &dyn Capability)`.
    pub fn with_capability<C: ?Sized + 'static>(
        mut self,
        cast: fn(&(dyn Any + Send + Sync)) -> Option<&C>,
    ) -> Self {
        self.casts.insert(TypeId::of::<C>(), Box::new(Caster { cast }));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl std::fmt::Debug for TypeEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeEntry")
            .field("id", &self.id)
            .field("capabilities", &self.casts.len())
            .finish()
    }
}

/// The allow-list registry gating reference resolution.
///
/// An explicit value owned by the caller and passed into every resolve
/// call — never an implicit global. Populate it once with `set_allowed`
/// before decoding untrusted payloads; reads are safe from concurrent
/// decode calls, and runtime re-population must be externally synchronized
/// against them.
#[derive(Debug, Default)]
pub struct TypeIndex {
    entries: HashMap<String, TypeEntry>,
}

impl TypeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the allow-list wholesale.
    pub fn set_allowed(&mut self, entries: impl IntoIterator<Item = TypeEntry>) {
        self.entries = entries
            .into_iter()
            .map(|entry| (entry.id.clone(), entry))
            .collect();
    }

    /// Looks up an entry by type identifier.
    pub fn lookup(&self, id: &str) -> Option<&TypeEntry> {
        self.entries.get(id)
    }

    pub fn is_allowed(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Field layout of a wrapped reference.
#[derive(Debug, Clone)]
pub enum RefLayout {
    /// Separate type and value fields.
    Fields { type_key: String, value_key: String },
    /// Type discriminator injected into the wrapped map's own field set.
    Merged { type_key: String },
}

impl RefLayout {
    /// The default separate-field layout: `$type` + `value`.
    pub fn fields() -> Self {
        Self::renamed("$type", "value")
    }

    /// Separate fields under caller-chosen keys.
    pub fn renamed(type_key: impl Into<String>, value_key: impl Into<String>) -> Self {
        Self::Fields {
            type_key: type_key.into(),
            value_key: value_key.into(),
        }
    }

    /// Discriminator merged into the value's own map.
    pub fn merged(type_key: impl Into<String>) -> Self {
        Self::Merged {
            type_key: type_key.into(),
        }
    }
}

impl Default for RefLayout {
    fn default() -> Self {
        Self::fields()
    }
}

/// A resolved reference: the decoded value plus its registry entry.
pub struct Resolved<'a> {
    entry: &'a TypeEntry,
    value: AnyBox,
}

impl Resolved<'_> {
    /// The type identifier the payload carried.
    pub fn type_name(&self) -> &str {
        &self.entry.id
    }

    /// The concrete value, when `T` is the registered type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }

    /// Views the value through a registered capability.
    pub fn capability<C: ?Sized + 'static>(&self) -> Result<&C, CodecError> {
        let caster = self
            .entry
            .casts
            .get(&TypeId::of::<C>())
            .and_then(|boxed| boxed.downcast_ref::<Caster<C>>())
            .ok_or_else(|| {
                CodecError::structural(
                    "a registered capability",
                    format!("type {:?} does not provide it", self.entry.id),
                )
            })?;
        (caster.cast)(self.value.as_ref()).ok_or_else(|| {
            CodecError::structural(
                "a castable value",
                format!("type {:?} cast returned nothing", self.entry.id),
            )
        })
    }
}

impl std::fmt::Debug for Resolved<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolved")
            .field("type_name", &self.entry.id)
            .finish_non_exhaustive()
    }
}

/// Wrap and resolve operations for polymorphic references.
pub struct Ref;

impl Ref {
    /// Encodes `value` with its type discriminator in the given layout.
    pub fn wrap<T>(value: &T, layout: &RefLayout) -> Result<AnyValue, CodecError>
    where
        T: Polymorphic + ?Sized,
    {
        let tree = value.encode()?;
        let id = value.type_name();
        match layout {
            RefLayout::Fields { type_key, value_key } => {
                let mut map = ValueMap::with_capacity(2);
                map.insert(
                    AnyValue::String(type_key.clone()),
                    AnyValue::String(id.to_owned()),
                );
                map.insert(AnyValue::String(value_key.clone()), tree);
                Ok(AnyValue::Map(map))
            }
            RefLayout::Merged { type_key } => {
                let AnyValue::Map(fields) = tree else {
                    return Err(CodecError::InvalidValue(format!(
                        "merged reference layout requires a map-encoded value, got {}",
                        tree.kind()
                    )));
                };
                if fields.get_str(type_key).is_some() {
                    return Err(CodecError::InvalidValue(format!(
                        "value already has a field named {type_key:?}"
                    )));
                }
                let mut map = ValueMap::with_capacity(fields.len() + 1);
                map.insert(
                    AnyValue::String(type_key.clone()),
                    AnyValue::String(id.to_owned()),
                );
                for (k, v) in fields {
                    map.insert(k, v);
                }
                Ok(AnyValue::Map(map))
            }
        }
    }

    /// Reads the discriminator, looks it up in the allow-list, and decodes
    /// the payload with the registered decoder. Unregistered identifiers
    /// fail closed.
    pub fn resolve<'a>(
        tree: &AnyValue,
        layout: &RefLayout,
        index: &'a TypeIndex,
    ) -> Result<Resolved<'a>, CodecError> {
        let map = tree
            .as_map()
            .ok_or_else(|| CodecError::structural("map", tree.kind()))?;

        let type_key = match layout {
            RefLayout::Fields { type_key, .. } | RefLayout::Merged { type_key } => type_key,
        };
        let id = map
            .get_str(type_key)
            .ok_or_else(|| CodecError::KeyNotFound(type_key.clone()))?;
        let id = id
            .as_str()
            .ok_or_else(|| CodecError::structural("string type identifier", id.kind()))?;

        let entry = index
            .lookup(id)
            .ok_or_else(|| CodecError::UnregisteredType(id.to_owned()))?;
        tracing::debug!(type_id = %id, "resolving polymorphic reference");

        let value = match layout {
            RefLayout::Fields { value_key, .. } => {
                let payload = map
                    .get_str(value_key)
                    .ok_or_else(|| CodecError::KeyNotFound(value_key.clone()))?;
                (entry.decode)(payload)?
            }
            RefLayout::Merged { type_key } => {
                // The decoder sees the value's own fields, discriminator
                // stripped.
                let payload: ValueMap = map
                    .iter()
                    .filter(|(k, _)| !matches!(k, AnyValue::String(s) if s == type_key))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                (entry.decode)(&AnyValue::Map(payload))?
            }
        };

        Ok(Resolved { entry, value })
    }
}
