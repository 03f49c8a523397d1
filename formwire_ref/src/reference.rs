// Copyright 2025 the Formwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::fmt;
use std::rc::Rc;

use formwire_bus::{Event, EventBus, EventKind};
use formwire_path::Path;
use serde_json::Value;

use crate::{RefError, Store};

bitflags::bitflags! {
    /// Capabilities of a [`Ref`].
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct RefFlags: u8 {
        /// Writes fail with [`RefError::ReadonlyMutation`].
        const READONLY = 1 << 0;
        /// Writes publish [`EventKind::ValueChanged`] on the ref's path.
        const EMITTING = 1 << 1;
    }
}

/// A handle addressing one absolute path inside a [`Store`].
///
/// There is one ref type; what a ref may do is described by its [`RefFlags`]. Refs derived
/// with [`Ref::at`] share the store, the bus and the flags of their parent.
///
/// ```
/// use std::rc::Rc;
/// use formwire_bus::EventBus;
/// use formwire_path::Path;
/// use formwire_ref::{Ref, RefError, Store};
/// use serde_json::json;
///
/// let store = Store::new(json!({"user": {"name": "ada"}}));
/// let bus: Rc<EventBus> = Rc::new(EventBus::new());
/// let user = Ref::emitting(store.clone(), &"/user".parse().unwrap(), bus).unwrap();
///
/// let name = user.at("name").unwrap();
/// assert_eq!(name.path().to_string(), "/user/name");
/// name.set(json!("grace")).unwrap();
/// assert_eq!(store.snapshot(), json!({"user": {"name": "grace"}}));
///
/// let view = name.as_readonly();
/// assert!(matches!(view.set(json!("x")), Err(RefError::ReadonlyMutation { .. })));
/// ```
pub struct Ref<D = ()> {
    store: Store,
    path: Path,
    flags: RefFlags,
    bus: Option<Rc<EventBus<D>>>,
}

impl<D> Clone for Ref<D> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            path: self.path.clone(),
            flags: self.flags,
            bus: self.bus.clone(),
        }
    }
}

impl<D> fmt::Debug for Ref<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("path", &self.path)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

impl<D> Ref<D> {
    /// A silent, writable ref. Relative paths are taken from the root.
    pub fn new(store: Store, path: &Path) -> Result<Self, RefError> {
        Ok(Self {
            store,
            path: path.resolve(&Path::root())?,
            flags: RefFlags::empty(),
            bus: None,
        })
    }

    /// A silent, writable ref to the whole store.
    pub fn root(store: Store) -> Self {
        Self {
            store,
            path: Path::root(),
            flags: RefFlags::empty(),
            bus: None,
        }
    }

    /// A writable ref that publishes every write on `bus`.
    pub fn emitting(store: Store, path: &Path, bus: Rc<EventBus<D>>) -> Result<Self, RefError> {
        Ok(Self::new(store, path)?.with_bus(bus))
    }

    /// The same location, publishing every write on `bus`.
    #[must_use]
    pub fn with_bus(mut self, bus: Rc<EventBus<D>>) -> Self {
        self.flags.insert(RefFlags::EMITTING);
        self.bus = Some(bus);
        self
    }

    /// A ref that can only read.
    pub fn readonly(store: Store, path: &Path) -> Result<Self, RefError> {
        let mut this = Self::new(store, path)?;
        this.flags = RefFlags::READONLY;
        Ok(this)
    }

    /// The same location without write access.
    pub fn as_readonly(&self) -> Self {
        let mut view = self.clone();
        view.flags |= RefFlags::READONLY;
        view
    }

    /// The same location without change events.
    pub fn silent(&self) -> Self {
        let mut view = self.clone();
        view.flags.remove(RefFlags::EMITTING);
        view
    }

    /// A ref to `relative`, resolved against this ref's path.
    ///
    /// The new ref shares this ref's store, bus and flags.
    pub fn at(&self, relative: &str) -> Result<Self, RefError> {
        let relative = Path::parse(relative)?;
        self.at_path(&relative)
    }

    /// Like [`Ref::at`], with an already parsed path.
    pub fn at_path(&self, relative: &Path) -> Result<Self, RefError> {
        let mut child = self.clone();
        child.path = relative.resolve(&self.path)?;
        Ok(child)
    }

    /// The absolute path this ref addresses.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The capability flags.
    pub fn flags(&self) -> RefFlags {
        self.flags
    }

    /// Whether writes are rejected.
    pub fn is_readonly(&self) -> bool {
        self.flags.contains(RefFlags::READONLY)
    }

    /// The backing store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The bus writes are published on, if any.
    pub fn bus(&self) -> Option<&Rc<EventBus<D>>> {
        self.bus.as_ref()
    }

    /// A copy of the current value, or `None` when nothing is stored at the path.
    pub fn get(&self) -> Option<Value> {
        self.store.get(&self.path)
    }

    /// Inspect the current value without copying it.
    pub fn with<R>(&self, f: impl FnOnce(Option<&Value>) -> R) -> R {
        self.store.with(&self.path, f)
    }

    /// Write `value`, creating missing containers on the way.
    pub fn set(&self, value: Value) -> Result<(), RefError> {
        self.check_writable()?;
        self.store.set(&self.path, value)?;
        tracing::trace!(path = %self.path, "value set");
        self.publish()
    }

    /// Remove the value and return it. Removing an array element shifts later elements.
    pub fn remove(&self) -> Result<Option<Value>, RefError> {
        self.check_writable()?;
        let removed = self.store.remove(&self.path)?;
        if removed.is_some() {
            tracing::trace!(path = %self.path, "value removed");
            self.publish()?;
        }
        Ok(removed)
    }

    fn check_writable(&self) -> Result<(), RefError> {
        if self.is_readonly() {
            tracing::debug!(path = %self.path, "write through readonly ref rejected");
            return Err(RefError::ReadonlyMutation {
                path: self.path.clone(),
            });
        }
        Ok(())
    }

    fn publish(&self) -> Result<(), RefError> {
        match &self.bus {
            Some(bus) if self.flags.contains(RefFlags::EMITTING) => {
                bus.emit(&self.path, &Event::new(EventKind::ValueChanged))?;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
