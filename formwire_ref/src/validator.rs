// Copyright 2025 the Formwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::convert::Infallible;
use std::future::{Future, ready};

use serde_json::Value;

use crate::Ref;

/// Result of validating one value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// Whether the value satisfied its schema.
    pub valid: bool,
    /// Human-readable messages, usually empty when valid.
    pub messages: Vec<String>,
}

impl ValidationOutcome {
    /// A passing outcome without messages.
    pub fn valid() -> Self {
        Self {
            valid: true,
            messages: Vec::new(),
        }
    }

    /// A failing outcome.
    pub fn invalid<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            valid: false,
            messages: messages.into_iter().map(Into::into).collect(),
        }
    }
}

/// The external validator a form delegates rule evaluation to.
///
/// Formwire never interprets rule keywords itself. A validator receives a read-only [`Ref`]
/// to the value under validation and returns a future; the form awaits it and applies the
/// outcome. Errors are handed back to the caller unchanged.
pub trait Validator<D = ()> {
    /// Rejection raised when validation cannot be carried out at all.
    type Error;

    /// The schema the validator applies at `target`, if it knows one.
    fn schema(&self, target: &Ref<D>) -> Option<Value>;

    /// Validate the value at `target`.
    fn validate(
        &self,
        target: &Ref<D>,
    ) -> impl Future<Output = Result<ValidationOutcome, Self::Error>>;
}

/// A validator that accepts every value and knows no schemas.
#[derive(Copy, Clone, Debug, Default)]
pub struct AcceptAll;

impl<D> Validator<D> for AcceptAll {
    type Error = Infallible;

    fn schema(&self, _: &Ref<D>) -> Option<Value> {
        None
    }

    fn validate(&self, _: &Ref<D>) -> impl Future<Output = Result<ValidationOutcome, Infallible>> {
        ready(Ok(ValidationOutcome::valid()))
    }
}
