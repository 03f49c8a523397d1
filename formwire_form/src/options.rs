// Copyright 2025 the Formwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use serde::{Deserialize, Serialize};

/// Behavior switches for a [`Form`](crate::Form).
///
/// Every field has a default, so hosts can deserialize partial configuration:
///
/// ```
/// use formwire_form::FormOptions;
///
/// let options: FormOptions = serde_json::from_str(r#"{"debounce_ms": 250}"#).unwrap();
/// assert_eq!(options.debounce_ms, 250);
/// assert!(options.validate_on_change);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormOptions {
    /// Queue a validation whenever a field value changes through the form.
    pub validate_on_change: bool,
    /// Quiet period in milliseconds before queued validations run. `0` runs them on the
    /// next [`Form::run_pending`](crate::Form::run_pending).
    pub debounce_ms: u64,
    /// Mark a field touched when its value changes, not only on
    /// [`Form::touch`](crate::Form::touch).
    pub mark_touched_on_change: bool,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            validate_on_change: true,
            debounce_ms: 0,
            mark_touched_on_change: false,
        }
    }
}
