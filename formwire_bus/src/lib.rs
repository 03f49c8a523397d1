// Copyright 2025 the Formwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Formwire Bus: a deterministic, `no_std` publish/subscribe bus keyed by data paths.
//!
//! ## Overview
//!
//! Form fields publish [`Event`]s on the absolute [`Path`](formwire_path::Path) of the value
//! they changed. Observers subscribe with a [`Pattern`]: an exact path, a path with `*`
//! segments (exactly one segment each), or a path ending in `**` (any number of trailing
//! segments, including none).
//!
//! ## Delivery
//!
//! - Every matching subscription runs, synchronously, in registration order. There is no
//!   precedence between exact and wildcard patterns; a topic matched by `/a/*`, `/a/**`,
//!   and `/a/b` reaches all three.
//! - Handlers return `Result<(), HandlerError>`. A failing handler does not stop delivery;
//!   [`EventBus::emit`] reports all failures together in a [`DeliveryError`] afterwards.
//! - Publishing to a topic nobody listens on is a no-op.
//! - After [`EventBus::off`] returns, the handler is never invoked again, including by a
//!   delivery that is already in progress.
//!
//! ## Lifecycle
//!
//! Buses are plain values: create one per form session and share it with `Rc`.
//! [`SubscriptionGuard`] ties a subscription to a scope, and [`EventBus::remove_all`] tears
//! everything down at once.
//!
//! ## Debouncing
//!
//! [`Debouncer`] coalesces bursts of events into one trailing-edge notification. It has no
//! timer of its own; the host drives it with millisecond timestamps.
//!
//! ## Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use formwire_bus::{Event, EventBus, EventKind, HandlerError, SubscriptionGuard};
//!
//! let bus: Rc<EventBus> = Rc::new(EventBus::new());
//! let count = Rc::new(Cell::new(0));
//!
//! let c = count.clone();
//! let guard = SubscriptionGuard::on(&bus, "/profile/**".parse().unwrap(), move |_, ev| {
//!     if ev.kind == EventKind::ValueChanged {
//!         c.set(c.get() + 1);
//!     }
//!     Ok(())
//! });
//! bus.on("/profile/email".parse().unwrap(), |_, _| Err(HandlerError::new("rejected")));
//!
//! let topic = "/profile/email".parse().unwrap();
//! let err = bus.emit(&topic, &Event::new(EventKind::ValueChanged)).unwrap_err();
//! assert_eq!(err.delivered, 2);
//! assert_eq!(count.get(), 1);
//!
//! drop(guard);
//! let _ = bus.emit(&topic, &Event::new(EventKind::ValueChanged));
//! assert_eq!(count.get(), 1);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod bus;
mod debounce;
mod event;
mod guard;
mod pattern;

pub use bus::{DeliveryError, EventBus, Handler, HandlerError, SubscriptionId};
pub use debounce::Debouncer;
pub use event::{Event, EventKind};
pub use guard::SubscriptionGuard;
pub use pattern::{Pattern, PatternError, PatternSegment};
