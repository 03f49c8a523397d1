// Copyright 2025 the Formwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scoped subscriptions that unsubscribe on drop.

use alloc::rc::{Rc, Weak};
use core::fmt;

use formwire_path::Path;

use crate::bus::{EventBus, HandlerError, SubscriptionId};
use crate::event::Event;
use crate::pattern::Pattern;

/// Owns one subscription and calls [`EventBus::off`] for it exactly once, on drop.
///
/// Binding code ties the guard to the lifetime of the component that subscribed. The guard
/// holds the bus weakly, so it never keeps a torn-down form session alive.
///
/// ```
/// use std::rc::Rc;
/// use formwire_bus::{EventBus, SubscriptionGuard};
///
/// let bus: Rc<EventBus> = Rc::new(EventBus::new());
/// {
///     let _guard = SubscriptionGuard::on(&bus, "/a".parse().unwrap(), |_, _| Ok(()));
///     assert_eq!(bus.len(), 1);
/// }
/// assert!(bus.is_empty());
/// ```
pub struct SubscriptionGuard<D = ()> {
    bus: Weak<EventBus<D>>,
    id: Option<SubscriptionId>,
}

impl<D> fmt::Debug for SubscriptionGuard<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionGuard")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl<D> SubscriptionGuard<D> {
    /// Subscribe `handler` to `pattern` and guard the resulting subscription.
    pub fn on<F>(bus: &Rc<EventBus<D>>, pattern: Pattern, handler: F) -> Self
    where
        F: Fn(&Path, &Event<D>) -> Result<(), HandlerError> + 'static,
    {
        let id = bus.on(pattern, handler);
        Self::adopt(bus, id)
    }

    /// Guard an existing subscription.
    pub fn adopt(bus: &Rc<EventBus<D>>, id: SubscriptionId) -> Self {
        Self {
            bus: Rc::downgrade(bus),
            id: Some(id),
        }
    }

    /// The guarded subscription, unless it was released.
    pub fn id(&self) -> Option<SubscriptionId> {
        self.id
    }

    /// Stop guarding and hand back the id; the subscription stays registered.
    pub fn release(mut self) -> Option<SubscriptionId> {
        self.id.take()
    }
}

impl<D> Drop for SubscriptionGuard<D> {
    fn drop(&mut self) {
        if let (Some(id), Some(bus)) = (self.id.take(), self.bus.upgrade()) {
            bus.off(id);
        }
    }
}
