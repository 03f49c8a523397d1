// Copyright 2025 the Formwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The subscription registry and synchronous delivery.
//!
//! ## Semantics
//!
//! - [`EventBus::emit`] delivers to every subscription whose pattern matches the topic, in
//!   registration order, before returning.
//! - Candidates are snapshotted when `emit` starts. Handlers may call [`EventBus::on`],
//!   [`EventBus::off`] and [`EventBus::emit`] re-entrantly; a subscription added during
//!   delivery does not see the current event, and one removed during delivery is skipped.
//! - A handler error does not stop delivery. All errors are collected and returned as one
//!   [`DeliveryError`] once every handler has run.
//! - Publishing with no matching subscription is a no-op returning `Ok(0)`.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use formwire_path::Path;
use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::event::Event;
use crate::pattern::Pattern;

/// Identifier of a registered handler.
///
/// Ids increase monotonically per bus and are never reused, so comparing ids also compares
/// registration order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// The raw sequence number.
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Failure reported by one handler.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// A handler failure with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Capture any displayable error as a handler failure.
    pub fn from_display(err: &impl fmt::Display) -> Self {
        Self {
            message: err.to_string(),
        }
    }

    /// The failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors collected from the handlers of one [`EventBus::emit`] call.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{} of {delivered} handler(s) failed for topic `{topic}`", .failures.len())]
pub struct DeliveryError {
    /// Topic that was published.
    pub topic: Path,
    /// Number of handlers that ran.
    pub delivered: usize,
    /// Failed handlers, in delivery order.
    pub failures: Vec<(SubscriptionId, HandlerError)>,
}

impl DeliveryError {
    /// The first failure, in delivery order.
    pub fn first(&self) -> Option<&HandlerError> {
        self.failures.first().map(|(_, e)| e)
    }
}

/// Signature of a bus handler.
pub type Handler<D> = dyn Fn(&Path, &Event<D>) -> Result<(), HandlerError>;

struct Subscription<D> {
    pattern: Pattern,
    handler: Rc<Handler<D>>,
}

struct Registry<D> {
    next_id: u64,
    /// All live subscriptions, ordered by registration.
    entries: BTreeMap<SubscriptionId, Subscription<D>>,
    /// Exact-topic index.
    exact: HashMap<Path, SmallVec<[SubscriptionId; 2]>>,
    /// Subscriptions whose pattern has a wildcard, in registration order.
    wildcard: Vec<SubscriptionId>,
}

impl<D> Registry<D> {
    fn matching(&self, topic: &Path) -> Vec<(SubscriptionId, Rc<Handler<D>>)> {
        let mut ids: Vec<SubscriptionId> = Vec::new();
        if let Some(exact) = self.exact.get(topic) {
            ids.extend(exact.iter().copied());
        }
        ids.extend(
            self.wildcard
                .iter()
                .copied()
                .filter(|id| self.entries[id].pattern.matches(topic)),
        );
        // Merge the two sources back into registration order.
        ids.sort_unstable();
        ids.into_iter()
            .map(|id| (id, self.entries[&id].handler.clone()))
            .collect()
    }

    fn remove(&mut self, id: SubscriptionId) -> bool {
        let Some(sub) = self.entries.remove(&id) else {
            return false;
        };
        match sub.pattern.as_path() {
            Some(path) => {
                if let Some(ids) = self.exact.get_mut(&path) {
                    ids.retain(|x| *x != id);
                    if ids.is_empty() {
                        self.exact.remove(&path);
                    }
                }
            }
            None => self.wildcard.retain(|x| *x != id),
        }
        true
    }
}

/// Path-addressed publish/subscribe bus.
///
/// The bus is single-threaded and uses interior mutability, so every method takes `&self`.
/// Share one instance per form session with [`Rc`]; there is no global bus.
///
/// ## Example
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use formwire_bus::{Event, EventBus, EventKind};
/// use formwire_path::Path;
///
/// let bus: EventBus = EventBus::new();
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let log = seen.clone();
/// let id = bus
///     .on("/users/*/name".parse().unwrap(), move |topic, _ev| {
///         log.borrow_mut().push(topic.to_string());
///         Ok(())
///     });
///
/// let topic: Path = "/users/2/name".parse().unwrap();
/// assert_eq!(bus.emit(&topic, &Event::new(EventKind::ValueChanged)), Ok(1));
///
/// bus.off(id);
/// assert_eq!(bus.emit(&topic, &Event::new(EventKind::ValueChanged)), Ok(0));
/// assert_eq!(*seen.borrow(), vec!["/users/2/name".to_string()]);
/// ```
pub struct EventBus<D = ()> {
    registry: RefCell<Registry<D>>,
}

impl<D> fmt::Debug for EventBus<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reg = self.registry.borrow();
        f.debug_struct("EventBus")
            .field("subscriptions", &reg.entries.len())
            .field("exact_topics", &reg.exact.len())
            .field("wildcards", &reg.wildcard.len())
            .finish_non_exhaustive()
    }
}

impl<D> Default for EventBus<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> EventBus<D> {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            registry: RefCell::new(Registry {
                next_id: 0,
                entries: BTreeMap::new(),
                exact: HashMap::new(),
                wildcard: Vec::new(),
            }),
        }
    }

    /// Register `handler` for every topic matching `pattern`.
    pub fn on<F>(&self, pattern: Pattern, handler: F) -> SubscriptionId
    where
        F: Fn(&Path, &Event<D>) -> Result<(), HandlerError> + 'static,
    {
        let mut reg = self.registry.borrow_mut();
        let id = SubscriptionId(reg.next_id);
        reg.next_id += 1;
        match pattern.as_path() {
            Some(path) => reg.exact.entry(path).or_default().push(id),
            None => reg.wildcard.push(id),
        }
        tracing::trace!(id = id.0, pattern = %pattern, "subscribed");
        reg.entries.insert(
            id,
            Subscription {
                pattern,
                handler: Rc::new(handler),
            },
        );
        id
    }

    /// Deliver `event` to every subscription matching `topic`.
    ///
    /// Returns the number of handlers that ran, or a [`DeliveryError`] listing every
    /// handler that failed. Failures do not prevent later handlers from running.
    pub fn emit(&self, topic: &Path, event: &Event<D>) -> Result<usize, DeliveryError> {
        let candidates = self.registry.borrow().matching(topic);
        if candidates.is_empty() {
            tracing::trace!(topic = %topic, kind = ?event.kind, "no subscribers");
            return Ok(0);
        }
        let mut delivered = 0;
        let mut failures = Vec::new();
        for (id, handler) in candidates {
            // Skip handlers removed by an earlier handler of this delivery.
            if !self.registry.borrow().entries.contains_key(&id) {
                continue;
            }
            delivered += 1;
            if let Err(err) = handler(topic, event) {
                tracing::warn!(
                    id = id.0,
                    topic = %topic,
                    kind = ?event.kind,
                    error = %err,
                    "handler failed"
                );
                failures.push((id, err));
            }
        }
        tracing::trace!(topic = %topic, kind = ?event.kind, delivered, "delivered");
        if failures.is_empty() {
            Ok(delivered)
        } else {
            Err(DeliveryError {
                topic: topic.clone(),
                delivered,
                failures,
            })
        }
    }

    /// Remove one subscription. Returns `false` if it was already gone.
    pub fn off(&self, id: SubscriptionId) -> bool {
        let removed = self.registry.borrow_mut().remove(id);
        if removed {
            tracing::trace!(id = id.0, "unsubscribed");
        }
        removed
    }

    /// Remove every subscription.
    pub fn remove_all(&self) {
        let mut reg = self.registry.borrow_mut();
        let count = reg.entries.len();
        reg.entries.clear();
        reg.exact.clear();
        reg.wildcard.clear();
        tracing::debug!(count, "removed all subscriptions");
    }

    /// Whether `id` is still registered.
    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.registry.borrow().entries.contains_key(&id)
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.registry.borrow().entries.len()
    }

    /// Whether the bus has no subscriptions.
    pub fn is_empty(&self) -> bool {
        self.registry.borrow().entries.is_empty()
    }
}
