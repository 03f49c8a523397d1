// Copyright 2025 the Formwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Formwire Form: form sessions on top of the path-addressed bus.
//!
//! ## Overview
//!
//! A [`Form`] binds together one data [`Store`](formwire_ref::Store), one
//! [`EventBus`](formwire_bus::EventBus), a registry of fields and an external
//! [`Validator`](formwire_ref::Validator). UI components register fields by path, write
//! values through the form and observe state changes on the bus:
//!
//! - [`Form::register`] and [`Form::unregister`] maintain the field registry and the form
//!   schema assembled from the fields' leaf schemas.
//! - [`Form::change`] writes a value, marks the field [`FieldState::DIRTY`] and queues it
//!   for validation; [`Form::touch`] marks it [`FieldState::TOUCHED`].
//! - [`Form::validate`] runs the validator. Only the latest run per field is applied.
//! - [`FieldArray`] manages repeated items and keeps the registry in step with removals.
//! - [`Watch`] and [`Visibility`] react to value changes, with dependencies either listed
//!   or discovered from the form schema.
//!
//! Every event the form publishes carries the [`FieldId`] of the field it concerns.
//!
//! ## Example
//!
//! ```
//! use futures::executor::block_on;
//! use formwire_form::{FieldState, Form, FormOptions};
//! use formwire_ref::AcceptAll;
//! use serde_json::json;
//!
//! let options: FormOptions = serde_json::from_str(r#"{"mark_touched_on_change": true}"#).unwrap();
//! let form = Form::with_options(json!({"email": ""}), AcceptAll, options);
//! let email = form
//!     .register(&"/email".parse().unwrap(), Some(json!({"format": "email"})))
//!     .unwrap();
//! assert_eq!(form.schema(), json!({"properties": {"email": {"format": "email"}}}));
//!
//! form.change(email, json!("ada@example.com")).unwrap();
//! assert_eq!(form.state(email), Some(FieldState::DIRTY | FieldState::TOUCHED));
//!
//! let reports = block_on(form.run_pending()).unwrap();
//! assert_eq!(reports.len(), 1);
//! assert!(form.is_valid());
//! ```
//!
//! ## Time
//!
//! Debouncing never spawns timers. Forms and debounced watches read a [`Clock`]; the host
//! polls [`Form::run_pending`] or [`Watch::poll`] from its own loop. [`ManualClock`] makes
//! this deterministic in tests.

mod array;
mod clock;
mod field;
mod form;
mod options;
mod watch;

pub use array::FieldArray;
pub use clock::{Clock, ManualClock, SystemClock};
pub use field::{FieldEntry, FieldId, FieldRegistry, FieldState};
pub use form::{Form, ValidationReport};
pub use options::FormOptions;
pub use watch::{Visibility, Watch, dependency_patterns};

use formwire_bus::{DeliveryError, Event, PatternError};
use formwire_path::{Path, PathError};
use formwire_ref::RefError;
use formwire_schema::SchemaError;

/// Events published on a form's bus.
pub type FormEvent = Event<FieldId>;

/// Errors raised by form operations.
///
/// `E` is the error type of the form's validator.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FormError<E> {
    /// The field id is stale or was never issued by this form.
    #[error("unknown field {0}")]
    UnknownField(FieldId),
    /// The value at the path is neither an array nor absent.
    #[error("value at `{0}` is not an array")]
    NotAnArray(Path),
    /// A path could not be parsed or resolved.
    #[error(transparent)]
    Path(#[from] PathError),
    /// A schema could not be placed.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// A watch pattern was invalid.
    #[error(transparent)]
    Pattern(#[from] PatternError),
    /// A ref operation failed.
    #[error(transparent)]
    Ref(#[from] RefError),
    /// At least one handler failed while an event was delivered.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    /// The field was registered, but a `FieldRegistered` handler failed.
    #[error("field {field} registered with failed delivery: {source}")]
    Registered {
        /// The new field; it stays registered.
        field: FieldId,
        /// The delivery failure.
        source: DeliveryError,
    },
    /// The validator rejected the request; the error is passed through unchanged.
    #[error("validator failed: {0}")]
    Validator(E),
}
