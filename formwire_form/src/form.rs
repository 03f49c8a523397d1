// Copyright 2025 the Formwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The form session: fields, state flags, schema assembly and validation.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use formwire_bus::{
    Debouncer, DeliveryError, Event, EventBus, EventKind, HandlerError, Pattern,
    SubscriptionGuard,
};
use formwire_path::{Path, Segment};
use formwire_ref::{Ref, RefError, Scope, Store, ValidationOutcome, Validator};
use formwire_schema::{SchemaError, build_schema, merge_schema};
use serde_json::{Map, Value};

use crate::{
    Clock, FieldId, FieldRegistry, FieldState, FormError, FormEvent, FormOptions, SystemClock,
};

/// What happened to the result of one [`Form::validate`] call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationReport {
    /// The outcome was applied to the field.
    Applied(ValidationOutcome),
    /// A newer validation of the same field started before this one finished, or the field
    /// was unregistered; the outcome was dropped.
    Superseded,
}

struct Session {
    fields: FieldRegistry,
    schema: Value,
    pending: Vec<FieldId>,
    debouncer: Debouncer,
}

/// One form session.
///
/// A form owns the data [`Store`], the [`EventBus`] its fields publish on, the field
/// registry and the assembled form schema. All methods take `&self`; the form is meant to
/// be shared by the components bound to it.
///
/// Events published by the form carry the [`FieldId`] that caused them as data, except
/// `ValueChanged`, which is published by the field's [`Ref`], and `ReconcileFields`.
pub struct Form<V> {
    store: Store,
    bus: Rc<EventBus<FieldId>>,
    validator: V,
    options: FormOptions,
    clock: Rc<dyn Clock>,
    session: RefCell<Session>,
}

impl<V> fmt::Debug for Form<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let session = self.session.borrow();
        f.debug_struct("Form")
            .field("fields", &session.fields)
            .field("pending", &session.pending.len())
            .field("options", &self.options)
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

impl<V> Form<V> {
    /// A form over `initial` data, with default options.
    pub fn new(initial: Value, validator: V) -> Self {
        Self::with_options(initial, validator, FormOptions::default())
    }

    /// A form over `initial` data.
    pub fn with_options(initial: Value, validator: V, options: FormOptions) -> Self {
        let debouncer = Debouncer::new(options.debounce_ms);
        Self {
            store: Store::new(initial),
            bus: Rc::new(EventBus::new()),
            validator,
            options,
            clock: Rc::new(SystemClock::new()),
            session: RefCell::new(Session {
                fields: FieldRegistry::new(),
                schema: Value::Object(Map::new()),
                pending: Vec::new(),
                debouncer,
            }),
        }
    }

    /// Replace the clock that drives validation debouncing.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Rc::new(clock);
        self
    }

    /// The data store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The bus fields publish on.
    pub fn bus(&self) -> &Rc<EventBus<FieldId>> {
        &self.bus
    }

    /// The configured options.
    pub fn options(&self) -> &FormOptions {
        &self.options
    }

    /// The external validator.
    pub fn validator(&self) -> &V {
        &self.validator
    }

    /// A copy of the form data.
    pub fn value(&self) -> Value {
        self.store.snapshot()
    }

    /// The form schema assembled from every registered field schema.
    pub fn schema(&self) -> Value {
        self.session.borrow().schema.clone()
    }

    /// An emitting ref to the whole form data.
    pub fn root(&self) -> Ref<FieldId> {
        Ref::root(self.store.clone()).with_bus(self.bus.clone())
    }

    /// Subscribe to form events; the subscription ends when the guard drops.
    pub fn on<F>(&self, pattern: Pattern, handler: F) -> SubscriptionGuard<FieldId>
    where
        F: Fn(&Path, &FormEvent) -> Result<(), HandlerError> + 'static,
    {
        SubscriptionGuard::on(&self.bus, pattern, handler)
    }

    /// Whether `id` refers to a registered field.
    pub fn contains(&self, id: FieldId) -> bool {
        self.session.borrow().fields.is_alive(id)
    }

    /// Registered fields in registration order.
    pub fn fields(&self) -> Vec<FieldId> {
        self.session.borrow().fields.iter().map(|(id, _)| id).collect()
    }

    /// Fields bound to exactly `path`.
    pub fn fields_at(&self, path: &Path) -> Vec<FieldId> {
        self.session.borrow().fields.at_path(path).to_vec()
    }

    /// Number of registered fields.
    pub fn len(&self) -> usize {
        self.session.borrow().fields.len()
    }

    /// Whether no field is registered.
    pub fn is_empty(&self) -> bool {
        self.session.borrow().fields.is_empty()
    }

    /// The path a field is bound to.
    pub fn path_of(&self, id: FieldId) -> Option<Path> {
        self.session.borrow().fields.get(id).map(|e| e.path.clone())
    }

    /// The state flags of a field.
    pub fn state(&self, id: FieldId) -> Option<FieldState> {
        self.session.borrow().fields.get(id).map(|e| e.state)
    }

    /// Messages from the last applied validation of a field.
    pub fn messages(&self, id: FieldId) -> Option<Vec<String>> {
        self.session.borrow().fields.get(id).map(|e| e.messages.clone())
    }

    /// The current value of a field.
    pub fn value_of(&self, id: FieldId) -> Option<Value> {
        let path = self.path_of(id)?;
        self.store.get(&path)
    }

    /// Whether no registered field is invalid.
    pub fn is_valid(&self) -> bool {
        !self.any_field(FieldState::INVALID)
    }

    /// Whether any registered field was changed.
    pub fn is_dirty(&self) -> bool {
        self.any_field(FieldState::DIRTY)
    }

    fn any_field(&self, flag: FieldState) -> bool {
        self.session
            .borrow()
            .fields
            .iter()
            .any(|(_, e)| e.state.contains(flag))
    }

    /// Whether changed fields are waiting for validation.
    pub fn has_pending(&self) -> bool {
        !self.session.borrow().pending.is_empty()
    }

    /// When queued validations become due, in clock milliseconds.
    pub fn next_deadline(&self) -> Option<u64> {
        self.session.borrow().debouncer.deadline()
    }

    /// Publish `ReconcileFields` on the root so that every field re-derives its position.
    pub fn reconcile(&self) -> Result<usize, DeliveryError> {
        self.reconcile_at(&Path::root())
    }

    /// Publish `ReconcileFields` on `path`.
    pub fn reconcile_at(&self, path: &Path) -> Result<usize, DeliveryError> {
        tracing::debug!(path = %path, "reconciling fields");
        self.bus.emit(path, &Event::new(EventKind::ReconcileFields))
    }

    fn publish(&self, path: &Path, kind: EventKind, id: FieldId) -> Result<usize, DeliveryError> {
        self.bus.emit(path, &Event::with_data(kind, id))
    }
}

impl<V: Validator<FieldId>> Form<V> {
    /// Register a field bound to `path`.
    ///
    /// `schema` is the field's leaf schema. When it is `None`, the validator is asked for
    /// the schema it applies at `path`. The schema is lifted to `path` and merged into the
    /// form schema. Publishes `FieldRegistered`.
    ///
    /// If a handler fails, the field stays registered and its id is returned inside
    /// [`FormError::Registered`].
    pub fn register(
        &self,
        path: &Path,
        schema: Option<Value>,
    ) -> Result<FieldId, FormError<V::Error>> {
        let path = path.resolve(&Path::root())?;
        let schema = match schema {
            Some(schema) => Some(schema),
            None => self
                .validator
                .schema(&Ref::readonly(self.store.clone(), &path)?),
        };
        let lifted = schema
            .as_ref()
            .map(|leaf| build_schema(&path, leaf))
            .transpose()?;
        let id = {
            let mut session = self.session.borrow_mut();
            if let Some(lifted) = &lifted {
                merge_schema(&mut session.schema, lifted);
            }
            session.fields.insert(path.clone(), schema)
        };
        tracing::debug!(field = %id, path = %path, "field registered");
        match self.publish(&path, EventKind::FieldRegistered, id) {
            Ok(_) => Ok(id),
            Err(source) => Err(FormError::Registered { field: id, source }),
        }
    }

    /// Register a field at `path` relative to `scope`.
    pub fn register_in(
        &self,
        scope: &Scope,
        path: &str,
        schema: Option<Value>,
    ) -> Result<FieldId, FormError<V::Error>> {
        let path = scope.resolve(path)?;
        self.register(&path, schema)
    }

    /// Unregister a field and drop its schema from the form schema.
    ///
    /// Returns `false` if the field was already gone. Publishes `FieldUnregistered`.
    pub fn unregister(&self, id: FieldId) -> Result<bool, FormError<V::Error>> {
        let entry = {
            let mut session = self.session.borrow_mut();
            let Some(entry) = session.fields.remove(id) else {
                return Ok(false);
            };
            session.pending.retain(|x| *x != id);
            if entry.schema.is_some() {
                session.schema = assemble_schema(&session.fields)?;
            }
            entry
        };
        tracing::debug!(field = %id, path = %entry.path, "field unregistered");
        self.publish(&entry.path, EventKind::FieldUnregistered, id)?;
        Ok(true)
    }

    /// An emitting ref to a field's value.
    pub fn field_ref(&self, id: FieldId) -> Result<Ref<FieldId>, FormError<V::Error>> {
        let path = self.path_of(id).ok_or(FormError::UnknownField(id))?;
        Ok(self.root().at_path(&path)?)
    }

    /// Write a new value for a field, mark it dirty and queue it for validation.
    ///
    /// The value is written even if a `ValueChanged` handler fails; the failure is returned
    /// after the field state has been updated.
    pub fn change(&self, id: FieldId, value: Value) -> Result<(), FormError<V::Error>> {
        let target = self.field_ref(id)?;
        let delivery = match target.set(value) {
            Ok(()) => None,
            Err(RefError::Delivery(err)) => Some(err),
            Err(err) => return Err(err.into()),
        };
        let touch = self.options.mark_touched_on_change;
        let (_, failed) = self.transition(id, |state| {
            state.insert(FieldState::DIRTY);
            if touch {
                state.insert(FieldState::TOUCHED);
            }
        })?;
        let delivery = delivery.or(failed);
        if self.options.validate_on_change {
            self.queue_validation(id);
        }
        match delivery {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Mark a field touched.
    pub fn touch(&self, id: FieldId) -> Result<FieldState, FormError<V::Error>> {
        self.update_state(id, |state| state.insert(FieldState::TOUCHED))
    }

    /// Queue a field for the next [`Form::run_pending`].
    pub fn queue_validation(&self, id: FieldId) {
        let now = self.clock.now_ms();
        let mut session = self.session.borrow_mut();
        if !session.pending.contains(&id) {
            session.pending.push(id);
        }
        session.debouncer.notify(now);
    }

    /// Validate the queued fields if the debounce period has elapsed.
    pub async fn run_pending(
        &self,
    ) -> Result<Vec<(FieldId, ValidationReport)>, FormError<V::Error>> {
        let now = self.clock.now_ms();
        let due = {
            let mut session = self.session.borrow_mut();
            if session.debouncer.poll(now) {
                std::mem::take(&mut session.pending)
            } else {
                Vec::new()
            }
        };
        self.validate_each(due).await
    }

    /// Validate the queued fields now, ignoring the debounce period.
    pub async fn flush_pending(
        &self,
    ) -> Result<Vec<(FieldId, ValidationReport)>, FormError<V::Error>> {
        let due = {
            let mut session = self.session.borrow_mut();
            session.debouncer.flush();
            std::mem::take(&mut session.pending)
        };
        self.validate_each(due).await
    }

    async fn validate_each(
        &self,
        ids: Vec<FieldId>,
    ) -> Result<Vec<(FieldId, ValidationReport)>, FormError<V::Error>> {
        let mut reports = Vec::with_capacity(ids.len());
        for id in ids {
            if self.contains(id) {
                reports.push((id, self.validate(id).await?));
            }
        }
        Ok(reports)
    }

    /// Validate one field with the external validator.
    ///
    /// Only the latest validation of a field is applied: if the field is validated again,
    /// or unregistered, before this call's validator future resolves, the outcome is
    /// dropped and [`ValidationReport::Superseded`] is returned. An applied outcome updates
    /// the `INVALID` flag and messages and publishes `Validated` or `Invalidated`.
    ///
    /// Validator errors are returned unchanged as [`FormError::Validator`]. A handler
    /// failure is returned as [`FormError::Delivery`] once the field state is final.
    pub async fn validate(&self, id: FieldId) -> Result<ValidationReport, FormError<V::Error>> {
        let (path, epoch) = {
            let mut session = self.session.borrow_mut();
            let entry = session
                .fields
                .get_mut(id)
                .ok_or(FormError::UnknownField(id))?;
            entry.epoch += 1;
            (entry.path.clone(), entry.epoch)
        };
        let (_, mut undelivered) =
            self.transition(id, |state| state.insert(FieldState::VALIDATING))?;
        let target = Ref::readonly(self.store.clone(), &path)?;
        tracing::trace!(field = %id, path = %path, epoch, "validation started");

        let result = self.validator.validate(&target).await;

        let latest = self.is_latest(id, epoch);
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                if latest {
                    self.transition(id, |state| state.remove(FieldState::VALIDATING))?;
                }
                tracing::warn!(field = %id, path = %path, "validator failed");
                return Err(FormError::Validator(err));
            }
        };
        if !latest {
            tracing::debug!(field = %id, epoch, "stale validation result dropped");
            return match undelivered {
                Some(err) => Err(err.into()),
                None => Ok(ValidationReport::Superseded),
            };
        }

        let path = {
            let mut session = self.session.borrow_mut();
            let entry = session
                .fields
                .get_mut(id)
                .ok_or(FormError::UnknownField(id))?;
            entry.messages.clone_from(&outcome.messages);
            entry.path.clone()
        };
        let (_, failed) = self.transition(id, |state| {
            state.remove(FieldState::VALIDATING);
            state.set(FieldState::INVALID, !outcome.valid);
        })?;
        undelivered = undelivered.or(failed);
        let kind = if outcome.valid {
            EventKind::Validated
        } else {
            EventKind::Invalidated
        };
        tracing::debug!(field = %id, path = %path, valid = outcome.valid, "validation applied");
        let published = self.publish(&path, kind, id).err();
        match undelivered.or(published) {
            Some(err) => Err(err.into()),
            None => Ok(ValidationReport::Applied(outcome)),
        }
    }

    /// Validate every registered field in registration order.
    ///
    /// Returns whether all applied outcomes were valid.
    pub async fn validate_all(&self) -> Result<bool, FormError<V::Error>> {
        let mut valid = true;
        for (_, report) in self.validate_each(self.fields()).await? {
            if let ValidationReport::Applied(outcome) = report {
                valid &= outcome.valid;
            }
        }
        Ok(valid)
    }

    /// Drop the fields of a removed array element and shift the fields of later elements
    /// down by one, then publish `ReconcileFields` on the array.
    pub(crate) fn shift_after_removal(
        &self,
        array: &Path,
        index: usize,
    ) -> Result<(), FormError<V::Error>> {
        let depth = array.len();
        let (dropped, moved) = {
            let session = self.session.borrow();
            let mut dropped = Vec::new();
            let mut moved = Vec::new();
            for (id, entry) in session.fields.iter() {
                if entry.path.len() <= depth || !entry.path.starts_with(array) {
                    continue;
                }
                match entry.path.segments()[depth].as_index() {
                    Some(i) if i == index => dropped.push(id),
                    Some(i) if i > index => {
                        let mut segments = entry.path.segments().to_vec();
                        segments[depth] = Segment::Index(i - 1);
                        moved.push((id, Path::from_segments(segments)));
                    }
                    _ => {}
                }
            }
            (dropped, moved)
        };
        for id in dropped {
            self.unregister(id)?;
        }
        {
            let mut session = self.session.borrow_mut();
            for (id, path) in moved {
                session.fields.rebind(id, path);
            }
        }
        self.reconcile_at(array)?;
        Ok(())
    }

    fn is_latest(&self, id: FieldId, epoch: u64) -> bool {
        self.session
            .borrow()
            .fields
            .get(id)
            .is_some_and(|e| e.epoch == epoch)
    }

    fn update_state(
        &self,
        id: FieldId,
        f: impl FnOnce(&mut FieldState),
    ) -> Result<FieldState, FormError<V::Error>> {
        match self.transition(id, f)? {
            (_, Some(err)) => Err(err.into()),
            (state, None) => Ok(state),
        }
    }

    /// Apply `f` to a field's state and publish `FieldStateChanged` if it changed.
    ///
    /// A delivery failure is handed back with the new state instead of ending the caller's
    /// transition early.
    fn transition(
        &self,
        id: FieldId,
        f: impl FnOnce(&mut FieldState),
    ) -> Result<(FieldState, Option<DeliveryError>), FormError<V::Error>> {
        let (path, before, after) = {
            let mut session = self.session.borrow_mut();
            let entry = session
                .fields
                .get_mut(id)
                .ok_or(FormError::UnknownField(id))?;
            let before = entry.state;
            f(&mut entry.state);
            (entry.path.clone(), before, entry.state)
        };
        if before == after {
            return Ok((after, None));
        }
        tracing::trace!(field = %id, path = %path, state = ?after, "field state changed");
        let failed = self.publish(&path, EventKind::FieldStateChanged, id).err();
        Ok((after, failed))
    }
}

fn assemble_schema(fields: &FieldRegistry) -> Result<Value, SchemaError> {
    let mut schema = Value::Object(Map::new());
    for (_, entry) in fields.iter() {
        if let Some(leaf) = &entry.schema {
            merge_schema(&mut schema, &build_schema(&entry.path, leaf)?);
        }
    }
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;
    use futures::channel::oneshot;
    use futures::executor::block_on;
    use serde_json::json;
    use std::future::Future;
    use std::pin::pin;

    fn p(text: &str) -> Path {
        text.parse().unwrap()
    }

    /// Accepts non-empty strings, fails on booleans.
    struct NonEmpty;

    impl Validator<FieldId> for NonEmpty {
        type Error = String;

        fn schema(&self, _: &Ref<FieldId>) -> Option<Value> {
            Some(json!({"presence": true}))
        }

        fn validate(
            &self,
            target: &Ref<FieldId>,
        ) -> impl Future<Output = Result<ValidationOutcome, String>> {
            let value = target.get();
            async move {
                match value {
                    Some(Value::String(s)) if !s.is_empty() => Ok(ValidationOutcome::valid()),
                    Some(Value::Bool(_)) => Err("booleans are not validated".to_string()),
                    _ => Ok(ValidationOutcome::invalid(["required"])),
                }
            }
        }
    }

    /// Resolves each validation when the test sends its outcome.
    #[derive(Default)]
    struct Deferred {
        waiting: Rc<RefCell<Vec<oneshot::Sender<ValidationOutcome>>>>,
    }

    impl Validator<FieldId> for Deferred {
        type Error = String;

        fn schema(&self, _: &Ref<FieldId>) -> Option<Value> {
            None
        }

        fn validate(
            &self,
            _: &Ref<FieldId>,
        ) -> impl Future<Output = Result<ValidationOutcome, String>> {
            let (tx, rx) = oneshot::channel();
            self.waiting.borrow_mut().push(tx);
            async move { rx.await.map_err(|_| "cancelled".to_string()) }
        }
    }

    type Log = Rc<RefCell<Vec<(EventKind, String)>>>;

    fn record<V>(form: &Form<V>) -> (Log, SubscriptionGuard<FieldId>) {
        let log: Log = Rc::default();
        let l = log.clone();
        let guard = form.on(Pattern::parse("/**").unwrap(), move |topic, ev| {
            l.borrow_mut().push((ev.kind, topic.to_string()));
            Ok(())
        });
        (log, guard)
    }

    #[test]
    fn register_merges_schema_and_publishes() {
        let form = Form::new(json!({}), NonEmpty);
        let (log, _guard) = record(&form);
        let name = form.register(&p("/name"), None).unwrap();
        form.register(&p("/age"), Some(json!({"type": "number"}))).unwrap();

        assert_eq!(
            form.schema(),
            json!({"properties": {"name": {"presence": true}, "age": {"type": "number"}}})
        );
        assert_eq!(
            *log.borrow(),
            vec![
                (EventKind::FieldRegistered, "/name".to_string()),
                (EventKind::FieldRegistered, "/age".to_string()),
            ]
        );
        assert_eq!(form.path_of(name), Some(p("/name")));
        assert_eq!(form.state(name), Some(FieldState::empty()));
        assert_eq!(form.len(), 2);
    }

    #[test]
    fn registered_event_carries_the_field_id() {
        let form = Form::new(json!({}), NonEmpty);
        let seen = Rc::new(RefCell::new(None));
        let s = seen.clone();
        let _guard = form.on(Pattern::parse("/x").unwrap(), move |_, ev| {
            *s.borrow_mut() = ev.data;
            Ok(())
        });
        let id = form.register(&p("x"), None).unwrap();
        assert_eq!(*seen.borrow(), Some(id));
    }

    #[test]
    fn unregister_rebuilds_schema() {
        let form = Form::new(json!({}), NonEmpty);
        let a = form.register(&p("/a"), None).unwrap();
        form.register(&p("/b"), None).unwrap();
        let (log, _guard) = record(&form);

        assert!(form.unregister(a).unwrap());
        assert!(!form.unregister(a).unwrap());
        assert_eq!(form.schema(), json!({"properties": {"b": {"presence": true}}}));
        assert_eq!(
            *log.borrow(),
            vec![(EventKind::FieldUnregistered, "/a".to_string())]
        );
        assert_eq!(form.change(a, json!("x")), Err(FormError::UnknownField(a)));
    }

    #[test]
    fn change_writes_marks_dirty_and_queues() {
        let form = Form::new(json!({}), NonEmpty).with_clock(ManualClock::new(0));
        let id = form.register(&p("/user/name"), None).unwrap();
        let (log, _guard) = record(&form);

        form.change(id, json!("ada")).unwrap();
        assert_eq!(form.value(), json!({"user": {"name": "ada"}}));
        assert_eq!(form.state(id), Some(FieldState::DIRTY));
        assert!(form.is_dirty());
        assert!(form.has_pending());
        assert_eq!(
            *log.borrow(),
            vec![
                (EventKind::ValueChanged, "/user/name".to_string()),
                (EventKind::FieldStateChanged, "/user/name".to_string()),
            ]
        );

        // A second change does not repeat the state event.
        log.borrow_mut().clear();
        form.change(id, json!("grace")).unwrap();
        assert_eq!(
            *log.borrow(),
            vec![(EventKind::ValueChanged, "/user/name".to_string())]
        );
    }

    #[test]
    fn touch_and_touch_on_change() {
        let options = FormOptions {
            mark_touched_on_change: true,
            validate_on_change: false,
            ..FormOptions::default()
        };
        let form = Form::with_options(json!({}), NonEmpty, options);
        let a = form.register(&p("/a"), None).unwrap();
        let b = form.register(&p("/b"), None).unwrap();
        form.change(a, json!("v")).unwrap();
        assert_eq!(form.state(a), Some(FieldState::DIRTY | FieldState::TOUCHED));
        assert!(!form.has_pending());
        assert_eq!(form.touch(b).unwrap(), FieldState::TOUCHED);
    }

    #[test]
    fn validate_applies_outcome_and_publishes() {
        let form = Form::new(json!({"name": ""}), NonEmpty);
        let id = form.register(&p("/name"), None).unwrap();
        let (log, _guard) = record(&form);

        let report = block_on(form.validate(id)).unwrap();
        assert_eq!(
            report,
            ValidationReport::Applied(ValidationOutcome::invalid(["required"]))
        );
        assert_eq!(form.state(id), Some(FieldState::INVALID));
        assert_eq!(form.messages(id), Some(vec!["required".to_string()]));
        assert!(!form.is_valid());
        let kinds: Vec<EventKind> = log.borrow().iter().map(|(k, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::FieldStateChanged,
                EventKind::FieldStateChanged,
                EventKind::Invalidated,
            ]
        );

        form.change(id, json!("ada")).unwrap();
        assert_eq!(
            block_on(form.validate(id)).unwrap(),
            ValidationReport::Applied(ValidationOutcome::valid())
        );
        assert_eq!(form.state(id), Some(FieldState::DIRTY));
        assert_eq!(form.messages(id), Some(Vec::new()));
        assert!(form.is_valid());
    }

    #[test]
    fn validator_errors_propagate_unchanged() {
        let form = Form::new(json!({"flag": true}), NonEmpty);
        let id = form.register(&p("/flag"), None).unwrap();
        assert_eq!(
            block_on(form.validate(id)),
            Err(FormError::Validator("booleans are not validated".to_string()))
        );
        assert_eq!(form.state(id), Some(FieldState::empty()));
    }

    #[test]
    fn stale_validation_never_overwrites_newer() {
        let validator = Deferred::default();
        let waiting = validator.waiting.clone();
        let form = Form::new(json!({}), validator);
        let id = form.register(&p("/code"), None).unwrap();

        block_on(async {
            let mut first = pin!(form.validate(id));
            assert!(futures::poll!(first.as_mut()).is_pending());
            let mut second = pin!(form.validate(id));
            assert!(futures::poll!(second.as_mut()).is_pending());
            assert_eq!(form.state(id), Some(FieldState::VALIDATING));

            let mut senders: Vec<_> = waiting.borrow_mut().drain(..).collect();
            let newer = senders.pop().unwrap();
            let older = senders.pop().unwrap();

            newer.send(ValidationOutcome::invalid(["taken"])).unwrap();
            assert_eq!(
                second.await.unwrap(),
                ValidationReport::Applied(ValidationOutcome::invalid(["taken"]))
            );
            older.send(ValidationOutcome::valid()).unwrap();
            assert_eq!(first.await.unwrap(), ValidationReport::Superseded);
        });
        assert_eq!(form.state(id), Some(FieldState::INVALID));
        assert_eq!(form.messages(id), Some(vec!["taken".to_string()]));
    }

    #[test]
    fn validation_of_unregistered_field_is_superseded() {
        let validator = Deferred::default();
        let waiting = validator.waiting.clone();
        let form = Form::new(json!({}), validator);
        let id = form.register(&p("/code"), None).unwrap();
        block_on(async {
            let mut run = pin!(form.validate(id));
            assert!(futures::poll!(run.as_mut()).is_pending());
            form.unregister(id).unwrap();
            let tx = waiting.borrow_mut().pop().unwrap();
            tx.send(ValidationOutcome::valid()).unwrap();
            assert_eq!(run.await.unwrap(), ValidationReport::Superseded);
        });
    }

    #[test]
    fn pending_validations_are_debounced() {
        let clock = ManualClock::new(0);
        let options = FormOptions {
            debounce_ms: 100,
            ..FormOptions::default()
        };
        let form = Form::with_options(json!({}), NonEmpty, options).with_clock(clock.clone());
        let id = form.register(&p("/q"), None).unwrap();

        form.change(id, json!("a")).unwrap();
        clock.set(50);
        form.change(id, json!("ab")).unwrap();
        assert_eq!(form.next_deadline(), Some(150));

        clock.set(120);
        assert!(block_on(form.run_pending()).unwrap().is_empty());
        clock.set(150);
        let reports = block_on(form.run_pending()).unwrap();
        assert_eq!(
            reports,
            vec![(id, ValidationReport::Applied(ValidationOutcome::valid()))]
        );
        assert!(!form.has_pending());
        assert!(block_on(form.run_pending()).unwrap().is_empty());
    }

    #[test]
    fn flush_ignores_the_quiet_period() {
        let options = FormOptions {
            debounce_ms: 10_000,
            ..FormOptions::default()
        };
        let form = Form::with_options(json!({}), NonEmpty, options).with_clock(ManualClock::new(0));
        let id = form.register(&p("/q"), None).unwrap();
        form.change(id, json!("")).unwrap();
        let reports = block_on(form.flush_pending()).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(form.state(id), Some(FieldState::DIRTY | FieldState::INVALID));
    }

    #[test]
    fn validate_all_reports_overall_validity() {
        let form = Form::new(json!({"a": "x", "b": ""}), NonEmpty);
        form.register(&p("/a"), None).unwrap();
        let b = form.register(&p("/b"), None).unwrap();
        assert!(!block_on(form.validate_all()).unwrap());
        form.change(b, json!("y")).unwrap();
        assert!(block_on(form.validate_all()).unwrap());
    }

    #[test]
    fn reconcile_publishes_on_root() {
        let form = Form::new(json!({}), NonEmpty);
        let (log, _guard) = record(&form);
        assert_eq!(form.reconcile(), Ok(1));
        assert_eq!(
            *log.borrow(),
            vec![(EventKind::ReconcileFields, "/".to_string())]
        );
    }

    #[test]
    fn handlers_may_read_the_form_during_delivery() {
        let form = Rc::new(Form::new(json!({}), NonEmpty));
        let id = form.register(&p("/a"), None).unwrap();
        let weak = Rc::downgrade(&form);
        let seen = Rc::new(RefCell::new(None));
        let s = seen.clone();
        let _guard = form.on(Pattern::parse("/a").unwrap(), move |_, ev| {
            if ev.kind == EventKind::FieldStateChanged {
                if let Some(form) = weak.upgrade() {
                    *s.borrow_mut() = form.state(id);
                }
            }
            Ok(())
        });
        form.change(id, json!("v")).unwrap();
        assert_eq!(*seen.borrow(), Some(FieldState::DIRTY));
    }

    #[test]
    fn failing_change_handler_still_updates_state() {
        let form = Form::new(json!({}), NonEmpty);
        let id = form.register(&p("/a"), None).unwrap();
        let _guard = form.on(Pattern::parse("/a").unwrap(), |_, ev| {
            if ev.kind == EventKind::ValueChanged {
                Err(HandlerError::new("rejected"))
            } else {
                Ok(())
            }
        });
        assert!(matches!(form.change(id, json!(1)), Err(FormError::Delivery(_))));
        assert_eq!(form.state(id), Some(FieldState::DIRTY));
        assert_eq!(form.value_of(id), Some(json!(1)));
    }

    #[test]
    fn failing_register_handler_still_returns_the_field() {
        let form = Form::new(json!({}), NonEmpty);
        let _guard = form.on(Pattern::parse("/x").unwrap(), |_, ev| {
            if ev.kind == EventKind::FieldRegistered {
                Err(HandlerError::new("rejected"))
            } else {
                Ok(())
            }
        });
        let Err(FormError::Registered { field, source }) = form.register(&p("/x"), None) else {
            panic!("registration should report the failed delivery");
        };
        assert_eq!(source.first().map(HandlerError::message), Some("rejected"));
        assert!(form.contains(field));
        assert_eq!(form.schema(), json!({"properties": {"x": {"presence": true}}}));

        assert!(form.unregister(field).unwrap());
        assert!(form.is_empty());
        assert_eq!(form.schema(), json!({}));
    }

    #[test]
    fn failing_state_handler_does_not_leave_validation_running() {
        let form = Form::new(json!({"a": ""}), NonEmpty);
        let id = form.register(&p("/a"), None).unwrap();
        let (log, _record) = record(&form);
        let _guard = form.on(Pattern::parse("/a").unwrap(), |_, ev| {
            if ev.kind == EventKind::FieldStateChanged {
                Err(HandlerError::new("rejected"))
            } else {
                Ok(())
            }
        });
        assert!(matches!(
            block_on(form.validate(id)),
            Err(FormError::Delivery(_))
        ));
        assert_eq!(form.state(id), Some(FieldState::INVALID));
        assert_eq!(form.messages(id), Some(vec!["required".to_string()]));
        let kinds: Vec<EventKind> = log.borrow().iter().map(|(k, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::FieldStateChanged,
                EventKind::FieldStateChanged,
                EventKind::Invalidated,
            ]
        );
    }

    #[test]
    fn failing_state_handler_on_change_still_queues_validation() {
        let form = Form::new(json!({}), NonEmpty);
        let id = form.register(&p("/a"), None).unwrap();
        let _guard = form.on(Pattern::parse("/a").unwrap(), |_, ev| {
            if ev.kind == EventKind::FieldStateChanged {
                Err(HandlerError::new("rejected"))
            } else {
                Ok(())
            }
        });
        assert!(matches!(form.change(id, json!("v")), Err(FormError::Delivery(_))));
        assert_eq!(form.state(id), Some(FieldState::DIRTY));
        assert!(form.has_pending());
    }
}
