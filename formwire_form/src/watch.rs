// Copyright 2025 the Formwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change watches and derived visibility.
//!
//! A [`Watch`] runs a callback when a value matching one of its patterns changes. The
//! patterns are either given explicitly or discovered from a schema: the paths a schema
//! observes (see [`props_to_observe`]) become subtree patterns, so a change anywhere below
//! an observed value triggers the watch once. An observed ancestor of the excluded subtree
//! is watched exactly, so a field never observes its own writes.
//!
//! [`Visibility`] keeps a boolean derived from the form data up to date, for conditionally
//! shown parts of a form.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use formwire_bus::{
    Debouncer, EventBus, EventKind, HandlerError, Pattern, PatternError, SubscriptionGuard,
};
use formwire_path::Path;
use formwire_ref::{Ref, RefError, Validator};
use formwire_schema::props_to_observe;
use serde_json::Value;

use crate::{Clock, FieldId, Form, FormError};

type Callback = dyn Fn(&Path) -> Result<(), HandlerError>;

struct Trigger {
    callback: Box<Callback>,
    debounce: Option<(RefCell<Debouncer>, Rc<dyn Clock>)>,
    last_topic: RefCell<Option<Path>>,
}

impl Trigger {
    fn fire(&self, topic: &Path) -> Result<(), HandlerError> {
        match &self.debounce {
            Some((debouncer, clock)) => {
                *self.last_topic.borrow_mut() = Some(topic.clone());
                debouncer.borrow_mut().notify(clock.now_ms());
                Ok(())
            }
            None => (self.callback)(topic),
        }
    }

    fn release(&self, due: bool) -> Result<bool, HandlerError> {
        if !due {
            return Ok(false);
        }
        let topic = self.last_topic.borrow_mut().take();
        match topic {
            Some(topic) => (self.callback)(&topic).map(|()| true),
            None => Ok(false),
        }
    }
}

/// Runs a callback when watched values change.
///
/// Only `ValueChanged` events trigger the callback. Dropping the watch unsubscribes it.
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use formwire_form::{Form, Watch};
/// use formwire_ref::AcceptAll;
/// use serde_json::json;
///
/// let form = Form::new(json!({}), AcceptAll);
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let log = seen.clone();
/// let _watch = Watch::new(form.bus(), ["/rows/*/qty".parse().unwrap()], move |topic| {
///     log.borrow_mut().push(topic.to_string());
///     Ok(())
/// });
///
/// form.root().at("rows/0/qty").unwrap().set(json!(2)).unwrap();
/// form.root().at("rows/0/name").unwrap().set(json!("x")).unwrap();
/// assert_eq!(*seen.borrow(), ["/rows/0/qty"]);
/// ```
pub struct Watch {
    patterns: Vec<Pattern>,
    trigger: Rc<Trigger>,
    _guards: Vec<SubscriptionGuard<FieldId>>,
}

impl fmt::Debug for Watch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watch")
            .field("patterns", &self.patterns)
            .field("debounced", &self.trigger.debounce.is_some())
            .finish_non_exhaustive()
    }
}

impl Watch {
    /// Watch `patterns`; `callback` receives the changed path.
    ///
    /// A change matched by several overlapping patterns runs the callback once per match.
    pub fn new<F>(
        bus: &Rc<EventBus<FieldId>>,
        patterns: impl IntoIterator<Item = Pattern>,
        callback: F,
    ) -> Self
    where
        F: Fn(&Path) -> Result<(), HandlerError> + 'static,
    {
        Self::build(bus, patterns.into_iter().collect(), Box::new(callback), None)
    }

    /// Like [`Watch::new`], but coalesce bursts of changes: the callback runs once, with the
    /// last changed path, from [`Watch::poll`] after `delay_ms` without further changes.
    pub fn debounced<F>(
        bus: &Rc<EventBus<FieldId>>,
        patterns: impl IntoIterator<Item = Pattern>,
        delay_ms: u64,
        clock: impl Clock + 'static,
        callback: F,
    ) -> Self
    where
        F: Fn(&Path) -> Result<(), HandlerError> + 'static,
    {
        let clock: Rc<dyn Clock> = Rc::new(clock);
        let debounce = (RefCell::new(Debouncer::new(delay_ms)), clock);
        Self::build(
            bus,
            patterns.into_iter().collect(),
            Box::new(callback),
            Some(debounce),
        )
    }

    /// Watch every path `schema` observes, as seen from `from`, except the `exclude`
    /// subtree.
    pub fn dependencies<F>(
        bus: &Rc<EventBus<FieldId>>,
        schema: &Value,
        from: &Path,
        exclude: Option<&Path>,
        callback: F,
    ) -> Result<Self, PatternError>
    where
        F: Fn(&Path) -> Result<(), HandlerError> + 'static,
    {
        let patterns = dependency_patterns(schema, from, exclude)?;
        Ok(Self::new(bus, patterns, callback))
    }

    fn build(
        bus: &Rc<EventBus<FieldId>>,
        patterns: Vec<Pattern>,
        callback: Box<Callback>,
        debounce: Option<(RefCell<Debouncer>, Rc<dyn Clock>)>,
    ) -> Self {
        let trigger = Rc::new(Trigger {
            callback,
            debounce,
            last_topic: RefCell::new(None),
        });
        let guards = patterns
            .iter()
            .map(|pattern| {
                let trigger = trigger.clone();
                SubscriptionGuard::on(bus, pattern.clone(), move |topic, ev| {
                    if ev.kind == EventKind::ValueChanged {
                        trigger.fire(topic)
                    } else {
                        Ok(())
                    }
                })
            })
            .collect();
        tracing::debug!(patterns = patterns.len(), "watch installed");
        Self {
            patterns,
            trigger,
            _guards: guards,
        }
    }

    /// The watched patterns.
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Whether a debounced change is waiting to be delivered.
    pub fn is_pending(&self) -> bool {
        self.trigger
            .debounce
            .as_ref()
            .is_some_and(|(d, _)| d.borrow().is_pending())
    }

    /// Run the callback if a debounced change is due. Returns whether it ran.
    pub fn poll(&self) -> Result<bool, HandlerError> {
        let due = match &self.trigger.debounce {
            Some((debouncer, clock)) => debouncer.borrow_mut().poll(clock.now_ms()),
            None => false,
        };
        self.trigger.release(due)
    }

    /// Run the callback now if a debounced change is waiting. Returns whether it ran.
    pub fn flush(&self) -> Result<bool, HandlerError> {
        let due = match &self.trigger.debounce {
            Some((debouncer, _)) => debouncer.borrow_mut().flush(),
            None => false,
        };
        self.trigger.release(due)
    }
}

/// Patterns for the paths `schema` observes.
///
/// Each observed path becomes a subtree pattern, except an ancestor of `exclude`, which
/// becomes an exact pattern so that writes inside the excluded subtree never match. A path
/// already covered by an earlier subtree pattern is skipped, so that every change matches
/// at most one pattern.
pub fn dependency_patterns(
    schema: &Value,
    from: &Path,
    exclude: Option<&Path>,
) -> Result<Vec<Pattern>, PatternError> {
    let mut subtrees: Vec<Path> = Vec::new();
    let mut patterns = Vec::new();
    for path in props_to_observe(schema, from, exclude) {
        if subtrees.iter().any(|root| covers(root, &path)) {
            continue;
        }
        if exclude.is_some_and(|excluded| covers(&path, excluded)) {
            patterns.push(Pattern::from_path(&path)?);
        } else {
            patterns.push(Pattern::from_path(&path.child_key("**"))?);
            subtrees.push(path);
        }
    }
    Ok(patterns)
}

fn covers(prefix: &Path, path: &Path) -> bool {
    prefix.len() <= path.len()
        && prefix
            .segments()
            .iter()
            .zip(path.segments())
            .all(|(a, b)| a == b || a.as_key() == Some("*"))
}

impl<V: Validator<FieldId>> Form<V> {
    /// Watch the values the form schema makes a field depend on.
    ///
    /// The dependencies are the paths the current form schema observes, excluding the
    /// field's own subtree. The watch does not follow later schema changes.
    pub fn watch_dependencies<F>(
        &self,
        id: FieldId,
        callback: F,
    ) -> Result<Watch, FormError<V::Error>>
    where
        F: Fn(&Path) -> Result<(), HandlerError> + 'static,
    {
        let own = self.path_of(id).ok_or(FormError::UnknownField(id))?;
        let schema = self.schema();
        Ok(Watch::dependencies(
            self.bus(),
            &schema,
            &Path::root(),
            Some(&own),
            callback,
        )?)
    }
}

/// A boolean derived from form data, re-evaluated when watched values change.
///
/// ```
/// use formwire_form::{Form, Visibility};
/// use formwire_ref::AcceptAll;
/// use serde_json::json;
///
/// let form = Form::new(json!({"shipping": {"same_as_billing": true}}), AcceptAll);
/// let address = Visibility::new(
///     &form,
///     &"/shipping".parse().unwrap(),
///     ["/shipping/same_as_billing".parse().unwrap()],
///     |shipping| shipping.at("same_as_billing").ok().and_then(|r| r.get()) != Some(json!(true)),
/// )
/// .unwrap();
/// assert!(!address.is_visible());
///
/// form.root().at("shipping/same_as_billing").unwrap().set(json!(false)).unwrap();
/// assert!(address.is_visible());
/// ```
pub struct Visibility {
    visible: Rc<Cell<bool>>,
    _watch: Watch,
}

impl fmt::Debug for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Visibility")
            .field("visible", &self.visible.get())
            .finish_non_exhaustive()
    }
}

impl Visibility {
    /// Evaluate `predicate` against a read-only ref at `scope` now and after every change
    /// matching `watch`.
    pub fn new<V, P>(
        form: &Form<V>,
        scope: &Path,
        watch: impl IntoIterator<Item = Pattern>,
        predicate: P,
    ) -> Result<Self, RefError>
    where
        P: Fn(&Ref<FieldId>) -> bool + 'static,
    {
        let view = form.root().at_path(scope)?.as_readonly();
        let visible = Rc::new(Cell::new(predicate(&view)));
        let state = visible.clone();
        let watch = Watch::new(form.bus(), watch, move |_| {
            let now = predicate(&view);
            if state.replace(now) != now {
                tracing::debug!(path = %view.path(), visible = now, "visibility changed");
            }
            Ok(())
        });
        Ok(Self {
            visible,
            _watch: watch,
        })
    }

    /// The current value of the predicate.
    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }
}
