//! The structured value shape the store round-trips. `StoreValue` is a
//! small self-contained JSON-like tree so the core can accept arbitrary
//! value graphs without depending on any one optional serializer crate for
//! its own definition — the `json`/`binc` features only select how a
//! `StoreValue` is turned into bytes on disk, not what it is in memory.

use std::collections::BTreeMap;

/// A dynamically-typed value the store can hold, traverse, and update.
///
/// Mirrors the shape of a typical JSON value: null, bool, a signed integer
/// and float distinct from one another, a string, a sequence, and a string-
/// keyed map — the minimum a codec needs to round-trip structured data.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub enum StoreValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<StoreValue>),
    Object(BTreeMap<String, StoreValue>),
}

impl StoreValue {
    pub fn as_object(&self) -> Option<&BTreeMap<String, StoreValue>> {
        match self {
            StoreValue::Object(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[StoreValue]> {
        match self {
            StoreValue::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StoreValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            StoreValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl Default for StoreValue {
    fn default() -> Self {
        StoreValue::Null
    }
}

impl PartialEq for StoreValue {
    fn eq(&self, other: &Self) -> bool {
        use StoreValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a.to_bits() == b.to_bits(),
            (Str(a), Str(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            (Object(a), Object(b)) => a == b,
            _ => false,
        }
    }
}
impl Eq for StoreValue {}

impl std::hash::Hash for StoreValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        use StoreValue::*;
        std::mem::discriminant(self).hash(state);
        match self {
            Null => {}
            Bool(b) => b.hash(state),
            Int(i) => i.hash(state),
            Float(f) => f.to_bits().hash(state),
            Str(s) => s.hash(state),
            Array(a) => a.hash(state),
            Object(m) => {
                for (k, v) in m {
                    k.hash(state);
                    v.hash(state);
                }
            }
        }
    }
}

impl From<&str> for StoreValue {
    fn from(s: &str) -> Self {
        StoreValue::Str(s.to_owned())
    }
}
impl From<String> for StoreValue {
    fn from(s: String) -> Self {
        StoreValue::Str(s)
    }
}
impl From<i64> for StoreValue {
    fn from(i: i64) -> Self {
        StoreValue::Int(i)
    }
}
impl From<i32> for StoreValue {
    fn from(i: i32) -> Self {
        StoreValue::Int(i as i64)
    }
}
impl From<usize> for StoreValue {
    fn from(i: usize) -> Self {
        StoreValue::Int(i as i64)
    }
}
impl From<bool> for StoreValue {
    fn from(b: bool) -> Self {
        StoreValue::Bool(b)
    }
}
impl From<f64> for StoreValue {
    fn from(f: f64) -> Self {
        StoreValue::Float(f)
    }
}
impl<T: Into<StoreValue>> From<Vec<T>> for StoreValue {
    fn from(v: Vec<T>) -> Self {
        StoreValue::Array(v.into_iter().map(Into::into).collect())
    }
}

/// One step of a path into a structured value: a field name or a sequence
/// index. The key itself is hashed separately for fingerprinting; a
/// `PathSegment` sequence only describes traversal through the value once
/// the record holding it has been located.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A mapping field name.
    Field(String),
    /// A sequence index.
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(s: &str) -> Self {
        PathSegment::Field(s.to_owned())
    }
}
impl From<String> for PathSegment {
    fn from(s: String) -> Self {
        PathSegment::Field(s)
    }
}
impl From<usize> for PathSegment {
    fn from(i: usize) -> Self {
        PathSegment::Index(i)
    }
}

/// Descend through `value` by `path`, yielding `None` if any intermediate
/// component is absent.
pub fn get_path<'a>(value: &'a StoreValue, path: &[PathSegment]) -> Option<&'a StoreValue> {
    let mut current = value;
    for segment in path {
        current = match (segment, current) {
            (PathSegment::Field(name), StoreValue::Object(map)) => map.get(name)?,
            (PathSegment::Index(idx), StoreValue::Array(arr)) => arr.get(*idx)?,
            _ => return None,
        };
    }
    Some(current)
}

/// The conventional nested update: apply `f` to the sub-value located at
/// `path` within `value`, creating missing intermediate mappings on the way
/// down. An empty `path` applies `f` directly.
pub fn update_path(
    value: StoreValue,
    path: &[PathSegment],
    f: impl FnOnce(Option<StoreValue>) -> StoreValue,
) -> StoreValue {
    match path.split_first() {
        None => f(Some(value)),
        Some((PathSegment::Field(name), rest)) => {
            let mut map = match value {
                StoreValue::Object(map) => map,
                _ => BTreeMap::new(),
            };
            let existing = map.remove(name);
            let updated = if rest.is_empty() {
                f(existing)
            } else {
                update_path(existing.unwrap_or(StoreValue::Null), rest, f)
            };
            map.insert(name.clone(), updated);
            StoreValue::Object(map)
        }
        Some((PathSegment::Index(idx), rest)) => {
            let mut arr = match value {
                StoreValue::Array(arr) => arr,
                _ => Vec::new(),
            };
            while arr.len() <= *idx {
                arr.push(StoreValue::Null);
            }
            let existing = std::mem::replace(&mut arr[*idx], StoreValue::Null);
            arr[*idx] = if rest.is_empty() {
                f(Some(existing))
            } else {
                update_path(existing, rest, f)
            };
            StoreValue::Array(arr)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_path_empty_returns_self() {
        let v = StoreValue::from(42i64);
        assert_eq!(get_path(&v, &[]), Some(&v));
    }

    #[test]
    fn get_path_missing_intermediate_is_none() {
        let v = StoreValue::Object(BTreeMap::new());
        let path = vec![PathSegment::from("bar"), PathSegment::from("foo")];
        assert_eq!(get_path(&v, &path), None);
    }

    #[test]
    fn update_path_creates_missing_intermediates() {
        let v = StoreValue::Null;
        let path = vec![PathSegment::from("bar"), PathSegment::from("foo")];
        let updated = update_path(v, &path, |_| StoreValue::from("baz"));
        let got = get_path(&updated, &path);
        assert_eq!(got, Some(&StoreValue::from("baz")));
    }

    #[test]
    fn update_path_array_grows_to_index() {
        let v = StoreValue::Null;
        let path = vec![PathSegment::from(3usize)];
        let updated = update_path(v, &path, |_| StoreValue::from(9i64));
        assert_eq!(
            get_path(&updated, &path),
            Some(&StoreValue::from(9i64))
        );
        assert_eq!(updated.as_array().map(|a| a.len()), Some(4));
    }

    #[test]
    fn update_path_object_field_traversal_via_as_object() {
        let v = StoreValue::Null;
        let path = vec![PathSegment::from("bar"), PathSegment::from("foo")];
        let updated = update_path(v, &path, |_| StoreValue::from("baz"));

        let outer = updated.as_object().expect("update_path should build an Object");
        let inner = outer["bar"].as_object().expect("nested field should also be an Object");
        assert_eq!(inner.get("foo"), Some(&StoreValue::from("baz")));
    }
}
