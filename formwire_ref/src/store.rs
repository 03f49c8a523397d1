// Copyright 2025 the Formwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The shared data tree that refs read and write.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use formwire_path::{Path, Segment};
use serde_json::{Map, Value};

use crate::RefError;

/// Shared, single-threaded JSON data tree.
///
/// Cloning a store clones the handle, not the data. One store usually backs one form
/// session; every [`Ref`](crate::Ref) derived from it observes the same values.
#[derive(Clone, Default)]
pub struct Store {
    data: Rc<RefCell<Value>>,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("handles", &Rc::strong_count(&self.data))
            .finish_non_exhaustive()
    }
}

impl Store {
    /// A store holding `value` as its root.
    pub fn new(value: Value) -> Self {
        Self {
            data: Rc::new(RefCell::new(value)),
        }
    }

    /// Whether both handles point at the same data.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    /// A deep copy of the whole tree.
    pub fn snapshot(&self) -> Value {
        self.data.borrow().clone()
    }

    /// A copy of the value at `path`, or `None` when nothing is stored there.
    pub fn get(&self, path: &Path) -> Option<Value> {
        self.with(path, |v| v.cloned())
    }

    /// Inspect the value at `path` without copying it.
    pub fn with<R>(&self, path: &Path, f: impl FnOnce(Option<&Value>) -> R) -> R {
        let data = self.data.borrow();
        let found = path
            .segments()
            .iter()
            .try_fold(&*data, |node, segment| child(node, segment));
        f(found)
    }

    /// Write `value` at `path` and return the previous value (`Null` when there was none).
    ///
    /// Missing intermediate containers are created: objects for keys, arrays for indices.
    /// Arrays are padded with `Null` up to the written index. Writing an index into an
    /// object uses the index as a property name.
    pub fn set(&self, path: &Path, value: Value) -> Result<Value, RefError> {
        let mut data = self.data.borrow_mut();
        let mut node = &mut *data;
        for (depth, segment) in path.segments().iter().enumerate() {
            node = child_or_insert(node, segment).ok_or_else(|| not_a_container(path, depth))?;
        }
        Ok(std::mem::replace(node, value))
    }

    /// Remove the value at `path` and return it.
    ///
    /// Removing an array element shifts the later elements down. Removing the root leaves
    /// `Null` behind. Missing paths are not an error.
    pub fn remove(&self, path: &Path) -> Result<Option<Value>, RefError> {
        let mut data = self.data.borrow_mut();
        let Some((last, parents)) = path.segments().split_last() else {
            return Ok(Some(std::mem::take(&mut *data)));
        };
        let mut node = &mut *data;
        for segment in parents {
            match child_mut(node, segment) {
                Some(next) => node = next,
                None => return Ok(None),
            }
        }
        let removed = match (node, last) {
            (Value::Object(map), Segment::Key(k)) => map.shift_remove(k.as_str()),
            (Value::Object(map), Segment::Index(i)) => map.shift_remove(i.to_string().as_str()),
            (Value::Array(list), Segment::Index(i)) if *i < list.len() => Some(list.remove(*i)),
            (Value::Array(_), Segment::Index(_)) | (Value::Null, _) => None,
            _ => return Err(not_a_container(path, path.len() - 1)),
        };
        Ok(removed)
    }
}

fn not_a_container(path: &Path, depth: usize) -> RefError {
    RefError::NotAContainer {
        path: Path::from_segments(path.segments()[..depth].iter().cloned()),
    }
}

fn child<'a>(node: &'a Value, segment: &Segment) -> Option<&'a Value> {
    match (node, segment) {
        (Value::Object(map), Segment::Key(k)) => map.get(k.as_str()),
        (Value::Object(map), Segment::Index(i)) => map.get(i.to_string().as_str()),
        (Value::Array(list), Segment::Index(i)) => list.get(*i),
        _ => None,
    }
}

fn child_mut<'a>(node: &'a mut Value, segment: &Segment) -> Option<&'a mut Value> {
    match (node, segment) {
        (Value::Object(map), Segment::Key(k)) => map.get_mut(k.as_str()),
        (Value::Object(map), Segment::Index(i)) => map.get_mut(i.to_string().as_str()),
        (Value::Array(list), Segment::Index(i)) => list.get_mut(*i),
        _ => None,
    }
}

fn child_or_insert<'a>(node: &'a mut Value, segment: &Segment) -> Option<&'a mut Value> {
    if node.is_null() {
        *node = match segment {
            Segment::Key(_) => Value::Object(Map::new()),
            Segment::Index(_) => Value::Array(Vec::new()),
        };
    }
    match (node, segment) {
        (Value::Object(map), Segment::Key(k)) => Some(map.entry(k.clone()).or_insert(Value::Null)),
        (Value::Object(map), Segment::Index(i)) => {
            Some(map.entry(i.to_string()).or_insert(Value::Null))
        }
        (Value::Array(list), Segment::Index(i)) => {
            if list.len() <= *i {
                list.resize(*i + 1, Value::Null);
            }
            list.get_mut(*i)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn p(text: &str) -> Path {
        text.parse().unwrap()
    }

    #[test]
    fn get_nested_values() {
        let store = Store::new(json!({"users": [{"name": "ada"}, {"name": "grace"}]}));
        assert_eq!(store.get(&p("/users/1/name")), Some(json!("grace")));
        assert_eq!(store.get(&p("/users/2/name")), None);
        assert_eq!(store.get(&p("/users/name")), None);
        assert_eq!(store.get(&Path::root()), Some(store.snapshot()));
    }

    #[test]
    fn set_creates_containers() {
        let store = Store::default();
        assert_eq!(store.set(&p("/a/2/b"), json!(1)).unwrap(), Value::Null);
        assert_eq!(store.snapshot(), json!({"a": [null, null, {"b": 1}]}));
        assert_eq!(store.set(&p("/a/2/b"), json!(2)).unwrap(), json!(1));
    }

    #[test]
    fn set_index_on_object_uses_property_name() {
        let store = Store::new(json!({"m": {}}));
        store.set(&p("/m/7"), json!(true)).unwrap();
        assert_eq!(store.snapshot(), json!({"m": {"7": true}}));
        assert_eq!(store.get(&p("/m/7")), Some(json!(true)));
    }

    #[test]
    fn set_through_scalar_fails() {
        let store = Store::new(json!({"a": 5}));
        assert_eq!(
            store.set(&p("/a/b"), json!(1)),
            Err(RefError::NotAContainer { path: p("/a") })
        );
        let store = Store::new(json!({"list": []}));
        assert_eq!(
            store.set(&p("/list/key"), json!(1)),
            Err(RefError::NotAContainer { path: p("/list") })
        );
    }

    #[test]
    fn set_root_replaces_everything() {
        let store = Store::new(json!({"a": 1}));
        assert_eq!(store.set(&Path::root(), json!([1])).unwrap(), json!({"a": 1}));
        assert_eq!(store.snapshot(), json!([1]));
    }

    #[test]
    fn remove_shifts_arrays_and_keeps_object_order() {
        let store = Store::new(json!({"list": [1, 2, 3], "x": 0, "y": 1, "z": 2}));
        assert_eq!(store.remove(&p("/list/0")).unwrap(), Some(json!(1)));
        assert_eq!(store.get(&p("/list")), Some(json!([2, 3])));
        assert_eq!(store.remove(&p("/x")).unwrap(), Some(json!(0)));
        let keys: Vec<String> = store
            .snapshot()
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, ["list", "y", "z"]);
    }

    #[test]
    fn remove_missing_is_none() {
        let store = Store::new(json!({"list": [1]}));
        assert_eq!(store.remove(&p("/list/5")).unwrap(), None);
        assert_eq!(store.remove(&p("/nope/deep")).unwrap(), None);
        assert_eq!(store.remove(&p("/list/0/x")).unwrap(), None);
    }

    #[test]
    fn handles_share_data() {
        let a = Store::default();
        let b = a.clone();
        a.set(&p("/k"), json!("v")).unwrap();
        assert_eq!(b.get(&p("/k")), Some(json!("v")));
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&Store::default()));
    }
}
