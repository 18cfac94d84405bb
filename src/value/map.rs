//! Insertion-ordered associative container with arbitrary value keys.

use super::AnyValue;

/// An ordered mapping of `AnyValue` to `AnyValue`.
///
/// Keys need not be strings. Iteration and serialization follow insertion
/// order; equality treats the entries as an unordered set, because order is
/// a serialization property, not a content property.
///
/// Backed by an entry vector: arbitrary keys (floats, lists, nested maps)
/// rule out a hashed index, and lookups are linear over typically small
/// payload maps.
#[derive(Debug, Clone, Default)]
pub struct ValueMap {
    entries: Vec<(AnyValue, AnyValue)>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts a key-value pair. An existing equal key is replaced in
    /// place, keeping its original position; a new key appends.
    pub fn insert(&mut self, key: AnyValue, value: AnyValue) -> Option<AnyValue> {
        for (k, v) in &mut self.entries {
            if *k == key {
                return Some(std::mem::replace(v, value));
            }
        }
        self.entries.push((key, value));
        None
    }

    /// Returns the value for the first key equal to `key`.
    pub fn get(&self, key: &AnyValue) -> Option<&AnyValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Returns the value for a string key.
    pub fn get_str(&self, key: &str) -> Option<&AnyValue> {
        self.entries
            .iter()
            .find(|(k, _)| matches!(k, AnyValue::String(s) if s == key))
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &AnyValue) -> bool {
        self.get(key).is_some()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&AnyValue, &AnyValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &AnyValue> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &AnyValue> {
        self.entries.iter().map(|(_, v)| v)
    }
}

/// Order-independent content equality: same length, every entry of one
/// present in the other.
impl PartialEq for ValueMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|ov| ov == v))
    }
}

impl FromIterator<(AnyValue, AnyValue)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (AnyValue, AnyValue)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl IntoIterator for ValueMap {
    type Item = (AnyValue, AnyValue);
    type IntoIter = std::vec::IntoIter<(AnyValue, AnyValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValueMap {
    type Item = (&'a AnyValue, &'a AnyValue);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (AnyValue, AnyValue)>,
        fn(&'a (AnyValue, AnyValue)) -> (&'a AnyValue, &'a AnyValue),
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_preserved() {
        let mut map = ValueMap::new();
        map.insert("c".into(), AnyValue::I64(1));
        map.insert("a".into(), AnyValue::I64(2));
        map.insert("b".into(), AnyValue::I64(3));

        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(
            keys,
            vec![
                AnyValue::String("c".into()),
                AnyValue::String("a".into()),
                AnyValue::String("b".into()),
            ]
        );
    }

    #[test]
    fn replace_keeps_position() {
        let mut map = ValueMap::new();
        map.insert("x".into(), AnyValue::I64(1));
        map.insert("y".into(), AnyValue::I64(2));
        let old = map.insert("x".into(), AnyValue::I64(9));

        assert_eq!(old, Some(AnyValue::I64(1)));
        assert_eq!(map.len(), 2);
        assert_eq!(map.keys().next(), Some(&AnyValue::String("x".into())));
        assert_eq!(map.get_str("x"), Some(&AnyValue::I64(9)));
    }

    #[test]
    fn equality_ignores_order() {
        let a: ValueMap = [
            ("c".into(), AnyValue::I64(1)),
            ("a".into(), AnyValue::I64(2)),
        ]
        .into_iter()
        .collect();
        let b: ValueMap = [
            ("a".into(), AnyValue::I64(2)),
            ("c".into(), AnyValue::I64(1)),
        ]
        .into_iter()
        .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn non_string_keys() {
        let mut map = ValueMap::new();
        map.insert(AnyValue::I64(7), AnyValue::Bool(true));
        map.insert(
            AnyValue::List(vec![AnyValue::I64(1)]),
            AnyValue::String("nested".into()),
        );

        assert_eq!(map.get(&AnyValue::I64(7)), Some(&AnyValue::Bool(true)));
        assert!(map.contains_key(&AnyValue::List(vec![AnyValue::I64(1)])));
        assert_eq!(map.get_str("missing"), None);
    }
}
