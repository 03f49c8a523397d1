// Copyright 2025 the Formwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event kinds and the event envelope delivered to handlers.

/// The state transition an [`Event`] reports.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// The value at the topic path was written.
    ValueChanged,
    /// Validation of the value at the topic path succeeded.
    Validated,
    /// Validation of the value at the topic path failed.
    Invalidated,
    /// A field bound to the topic path was registered.
    FieldRegistered,
    /// A field bound to the topic path was unregistered.
    FieldUnregistered,
    /// Dirty/touched/validation flags of a field changed.
    FieldStateChanged,
    /// Fields below the topic path must re-derive their positions (for example after an
    /// array element was removed and later indices shifted).
    ReconcileFields,
}

/// A path-addressed notification.
///
/// Events carry their [`EventKind`] and optional attached data, typically a handle of the
/// field that caused them. They are created at the moment of the transition, delivered
/// synchronously by [`EventBus::emit`](crate::EventBus::emit), and then dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event<D = ()> {
    /// What happened.
    pub kind: EventKind,
    /// Optional attached data.
    pub data: Option<D>,
}

impl<D> Event<D> {
    /// An event without attached data.
    pub const fn new(kind: EventKind) -> Self {
        Self { kind, data: None }
    }

    /// An event carrying `data`.
    pub const fn with_data(kind: EventKind, data: D) -> Self {
        Self {
            kind,
            data: Some(data),
        }
    }
}

impl<D> From<EventKind> for Event<D> {
    fn from(kind: EventKind) -> Self {
        Self::new(kind)
    }
}
