// Copyright 2025 the Formwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Field identity and per-field bookkeeping.

use std::fmt;

use formwire_path::Path;
use hashbrown::HashMap;
use serde_json::Value;

/// Identifier for a registered field (generational).
///
/// Slots are reused after a field is unregistered, but the generation is bumped, so an id
/// held by a torn-down component never aliases a newer field.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(u32, u32);

impl FieldId {
    const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    const fn idx(self) -> usize {
        self.0 as usize
    }

    /// The generation of the slot this id was issued for.
    pub const fn generation(self) -> u32 {
        self.1
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field#{}v{}", self.0, self.1)
    }
}

bitflags::bitflags! {
    /// Interaction and validation state of a field.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FieldState: u8 {
        /// The value was changed through the form since registration.
        const DIRTY      = 1 << 0;
        /// The user interacted with the field.
        const TOUCHED    = 1 << 1;
        /// A validation is in flight.
        const VALIDATING = 1 << 2;
        /// The last applied validation failed.
        const INVALID    = 1 << 3;
    }
}

/// What the form knows about one field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldEntry {
    /// Absolute path of the field's value.
    pub path: Path,
    /// Leaf schema the field contributes, at its own path.
    pub schema: Option<Value>,
    /// Current state flags.
    pub state: FieldState,
    /// Messages from the last applied validation.
    pub messages: Vec<String>,
    /// Validation sequence number; only the result of the latest run is applied.
    pub(crate) epoch: u64,
}

impl FieldEntry {
    fn new(path: Path, schema: Option<Value>) -> Self {
        Self {
            path,
            schema,
            state: FieldState::empty(),
            messages: Vec::new(),
            epoch: 0,
        }
    }
}

/// Registered fields, in registration order, with an index by path.
#[derive(Default)]
pub struct FieldRegistry {
    slots: Vec<Option<FieldEntry>>,
    /// last generation per slot (persists across removals)
    generations: Vec<u32>,
    free_list: Vec<usize>,
    order: Vec<FieldId>,
    by_path: HashMap<Path, Vec<FieldId>>,
}

impl fmt::Debug for FieldRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRegistry")
            .field("live", &self.order.len())
            .field("slots", &self.slots.len())
            .field("free_list", &self.free_list.len())
            .finish_non_exhaustive()
    }
}

impl FieldRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field at `path` and return its id.
    pub fn insert(&mut self, path: Path, schema: Option<Value>) -> FieldId {
        let entry = FieldEntry::new(path.clone(), schema);
        let id = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.slots[idx] = Some(entry);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "FieldId uses 32-bit indices."
            )]
            FieldId::new(idx as u32, generation)
        } else {
            self.slots.push(Some(entry));
            self.generations.push(1);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "FieldId uses 32-bit indices."
            )]
            FieldId::new((self.slots.len() - 1) as u32, 1)
        };
        self.order.push(id);
        self.by_path.entry(path).or_default().push(id);
        id
    }

    /// Remove a field. Returns its entry, or `None` if `id` is stale.
    pub fn remove(&mut self, id: FieldId) -> Option<FieldEntry> {
        if !self.is_alive(id) {
            return None;
        }
        let entry = self.slots[id.idx()].take()?;
        self.free_list.push(id.idx());
        self.order.retain(|x| *x != id);
        self.unindex(&entry.path, id);
        Some(entry)
    }

    /// Move a field to a new path, keeping its id and state.
    pub fn rebind(&mut self, id: FieldId, path: Path) -> bool {
        let Some(entry) = self.get_mut(id) else {
            return false;
        };
        let old = std::mem::replace(&mut entry.path, path.clone());
        self.unindex(&old, id);
        self.by_path.entry(path).or_default().push(id);
        true
    }

    fn unindex(&mut self, path: &Path, id: FieldId) {
        if let Some(ids) = self.by_path.get_mut(path) {
            ids.retain(|x| *x != id);
            if ids.is_empty() {
                self.by_path.remove(path);
            }
        }
    }

    /// Whether `id` refers to a registered field.
    pub fn is_alive(&self, id: FieldId) -> bool {
        self.generations.get(id.idx()) == Some(&id.1)
            && self.slots.get(id.idx()).is_some_and(Option::is_some)
    }

    /// The entry of a live field.
    pub fn get(&self, id: FieldId) -> Option<&FieldEntry> {
        if !self.is_alive(id) {
            return None;
        }
        self.slots.get(id.idx())?.as_ref()
    }

    /// Mutable access to the entry of a live field.
    pub fn get_mut(&mut self, id: FieldId) -> Option<&mut FieldEntry> {
        if !self.is_alive(id) {
            return None;
        }
        self.slots.get_mut(id.idx())?.as_mut()
    }

    /// Fields bound to exactly `path`, in registration order.
    pub fn at_path(&self, path: &Path) -> &[FieldId] {
        self.by_path.get(path).map_or(&[], Vec::as_slice)
    }

    /// Live fields in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (FieldId, &FieldEntry)> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.get(*id).map(|entry| (*id, entry)))
    }

    /// Number of live fields.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no field is registered.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
