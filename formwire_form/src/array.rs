// Copyright 2025 the Formwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::fmt;

use formwire_path::Path;
use formwire_ref::{RefError, Scope, Validator};
use serde_json::Value;

use crate::{FieldId, Form, FormError};

/// A list of repeated items stored as an array at one path.
///
/// Items are addressed by index. Removing an item shifts later items down in the data and
/// in the field registry: fields of the removed item are unregistered, fields of later
/// items are rebound to their new index, and `ReconcileFields` is published on the array.
///
/// ```
/// use formwire_form::{FieldArray, Form};
/// use formwire_ref::AcceptAll;
/// use serde_json::json;
///
/// let form = Form::new(json!({}), AcceptAll);
/// let todos = FieldArray::new(&form, &"/todos".parse().unwrap()).unwrap();
/// todos.push(json!({"title": "a"})).unwrap();
/// todos.push(json!({"title": "b"})).unwrap();
///
/// let title = form
///     .register_in(&todos.scope(1), "title", None)
///     .unwrap();
/// todos.remove(0).unwrap();
///
/// assert_eq!(form.value(), json!({"todos": [{"title": "b"}]}));
/// assert_eq!(form.path_of(title).unwrap().to_string(), "/todos/0/title");
/// ```
pub struct FieldArray<'f, V> {
    form: &'f Form<V>,
    path: Path,
}

impl<V> fmt::Debug for FieldArray<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldArray")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl<'f, V: Validator<FieldId>> FieldArray<'f, V> {
    /// A field array over the value at `path`; relative paths are taken from the root.
    pub fn new(form: &'f Form<V>, path: &Path) -> Result<Self, FormError<V::Error>> {
        Ok(Self {
            form,
            path: path.resolve(&Path::root())?,
        })
    }

    /// The absolute path of the array.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of items. A missing value counts as empty.
    pub fn len(&self) -> usize {
        self.form
            .store()
            .with(&self.path, |v| v.and_then(Value::as_array).map_or(0, Vec::len))
    }

    /// Whether there are no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A copy of one item.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.form.store().get(&self.path.child_index(index))
    }

    /// The scope that fields of one item resolve against.
    pub fn scope(&self, index: usize) -> Scope {
        Scope::from(self.path.child_index(index))
    }

    /// Append an item and return its index.
    pub fn push(&self, value: Value) -> Result<usize, FormError<V::Error>> {
        let index = self.checked_len()?;
        self.form
            .root()
            .at_path(&self.path.child_index(index))?
            .set(value)?;
        tracing::debug!(path = %self.path, index, "item pushed");
        Ok(index)
    }

    /// Remove the item at `index` and return it. Out-of-range indices remove nothing.
    pub fn remove(&self, index: usize) -> Result<Option<Value>, FormError<V::Error>> {
        if index >= self.checked_len()? {
            return Ok(None);
        }
        let target = self.form.root().at_path(&self.path.child_index(index))?;
        let (removed, delivery) = match target.remove() {
            Ok(removed) => (removed, None),
            Err(RefError::Delivery(err)) => (None, Some(err)),
            Err(err) => return Err(err.into()),
        };
        tracing::debug!(path = %self.path, index, "item removed");
        self.form.shift_after_removal(&self.path, index)?;
        match delivery {
            Some(err) => Err(err.into()),
            None => Ok(removed),
        }
    }

    fn checked_len(&self) -> Result<usize, FormError<V::Error>> {
        self.form.store().with(&self.path, |v| match v {
            None | Some(Value::Null) => Ok(0),
            Some(Value::Array(items)) => Ok(items.len()),
            Some(_) => Err(FormError::NotAnArray(self.path.clone())),
        })
    }
}
