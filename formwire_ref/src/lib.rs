// Copyright 2025 the Formwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Formwire Ref: scoped handles into a shared form data store.
//!
//! ## Overview
//!
//! A [`Store`] holds the form's data as one JSON tree. A [`Ref`] addresses one absolute
//! path in that tree and reads or writes the value there. What a ref may do is carried by
//! its [`RefFlags`]:
//!
//! - a plain ref reads and writes silently;
//! - an emitting ref also publishes `ValueChanged` on its exact path through an
//!   [`EventBus`](formwire_bus::EventBus) after each write;
//! - a read-only ref rejects writes with [`RefError::ReadonlyMutation`].
//!
//! [`Ref::at`] derives a ref for a relative path; the derived ref keeps the store, bus and
//! flags. [`Scope`] does the same path arithmetic for nested components that have not
//! created a ref yet.
//!
//! The [`Validator`] trait is the seam toward the external rule engine. Validators get a
//! ref to the value and return a future with a [`ValidationOutcome`].
//!
//! ## Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use formwire_bus::EventBus;
//! use formwire_path::Path;
//! use formwire_ref::{Ref, Scope, Store};
//! use serde_json::json;
//!
//! let store = Store::default();
//! let bus: Rc<EventBus> = Rc::new(EventBus::new());
//! let changed = Rc::new(RefCell::new(Vec::new()));
//! let log = changed.clone();
//! bus.on("/todos/**".parse().unwrap(), move |topic, _| {
//!     log.borrow_mut().push(topic.to_string());
//!     Ok(())
//! });
//!
//! let scope = Scope::root().nest("todos/0").unwrap();
//! let title = Ref::emitting(store.clone(), &scope.resolve("title").unwrap(), bus).unwrap();
//! title.set(json!("write docs")).unwrap();
//!
//! assert_eq!(store.snapshot(), json!({"todos": [{"title": "write docs"}]}));
//! assert_eq!(*changed.borrow(), ["/todos/0/title"]);
//! ```

mod reference;
mod scope;
mod store;
mod validator;

pub use reference::{Ref, RefFlags};
pub use scope::Scope;
pub use store::Store;
pub use validator::{AcceptAll, ValidationOutcome, Validator};

use formwire_bus::DeliveryError;
use formwire_path::{Path, PathError};

/// Errors raised by refs and the store.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RefError {
    /// A write was attempted through a read-only ref.
    #[error("cannot write `{path}` through a read-only ref")]
    ReadonlyMutation {
        /// The path the write targeted.
        path: Path,
    },
    /// A path could not be parsed or resolved.
    #[error(transparent)]
    Path(#[from] PathError),
    /// A write had to descend through a value that is neither an object nor an array.
    #[error("value at `{path}` is not a container")]
    NotAContainer {
        /// The path of the offending value.
        path: Path,
    },
    /// The write succeeded but at least one change handler failed.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}
