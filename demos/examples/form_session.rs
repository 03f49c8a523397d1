// Copyright 2025 the Formwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A signup form session driven end to end without a UI.
//!
//! This example shows how to combine:
//! - `formwire_form` for field registration, dirty tracking and validation,
//! - `formwire_ref` for scoped refs and the external validator seam,
//! - `formwire_bus` for observing what the form publishes,
//! - `formwire_schema` for discovering which values a field's validity depends on.
//!
//! Run:
//! - `cargo run -p formwire_demos --example form_session`
//! - `RUST_LOG=trace cargo run -p formwire_demos --example form_session` to see delivery.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use formwire_bus::{EventKind, Pattern};
use formwire_form::{FieldArray, FieldId, FieldState, Form, FormOptions, Visibility};
use formwire_path::Path;
use formwire_ref::{Ref, Scope, ValidationOutcome, Validator};
use formwire_schema::props_to_observe;
use futures::executor::block_on;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

/// A toy validator with hard-coded rules per path.
struct Rules;

impl Validator<FieldId> for Rules {
    type Error = String;

    fn schema(&self, _: &Ref<FieldId>) -> Option<Value> {
        None
    }

    fn validate(
        &self,
        target: &Ref<FieldId>,
    ) -> impl Future<Output = Result<ValidationOutcome, String>> {
        let value = target.get();
        let password = target.at("/password").ok().and_then(|r| r.get());
        let path = target.path().to_string();
        async move {
            let mut messages = Vec::new();
            match (path.as_str(), &value) {
                ("/email", Some(Value::String(s))) if !s.contains('@') => {
                    messages.push("is not a valid email".to_string());
                }
                ("/password", Some(Value::String(s))) if s.len() < 8 => {
                    messages.push("is too short".to_string());
                }
                ("/confirm", v) if v.as_ref() != password.as_ref() => {
                    messages.push("does not match".to_string());
                }
                (_, None | Some(Value::Null)) => messages.push("can't be blank".to_string()),
                _ => {}
            }
            Ok(if messages.is_empty() {
                ValidationOutcome::valid()
            } else {
                ValidationOutcome::invalid(messages)
            })
        }
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();

    let options: FormOptions =
        serde_json::from_str(r#"{"mark_touched_on_change": true}"#).expect("valid options");
    let form = Rc::new(Form::with_options(
        json!({"newsletter": false}),
        Rules,
        options,
    ));

    let events = Rc::new(RefCell::new(Vec::new()));
    let log = events.clone();
    let _all = form.on(Pattern::parse("/**").expect("pattern"), move |topic, ev| {
        log.borrow_mut().push(format!("{:?} {topic}", ev.kind));
        Ok(())
    });

    let path = |s: &str| s.parse::<Path>().expect("path");
    let email = form
        .register(&path("/email"), Some(json!({"format": "email"})))
        .expect("register email");
    let password = form
        .register(&path("/password"), Some(json!({"length": {"minimum": 8}})))
        .expect("register password");
    let confirm = form
        .register(&path("/confirm"), Some(json!({"equality": "password"})))
        .expect("register confirm");
    tracing::info!(schema = %form.schema(), "form schema assembled");

    let schema = form.schema();
    let observed: Vec<String> = props_to_observe(&schema, &Path::root(), Some(&path("/confirm")))
        .iter()
        .map(ToString::to_string)
        .collect();
    tracing::info!(?observed, "confirmation depends on");

    // Re-validate the confirmation whenever a value it depends on changes.
    let weak = Rc::downgrade(&form);
    let _deps = form
        .watch_dependencies(confirm, move |_| {
            if let Some(form) = weak.upgrade() {
                form.queue_validation(confirm);
            }
            Ok(())
        })
        .expect("watch dependencies");

    let phone = Visibility::new(
        &form,
        &Path::root(),
        [Pattern::parse("/newsletter").expect("pattern")],
        |root| root.at("newsletter").ok().and_then(|r| r.get()) == Some(json!(true)),
    )
    .expect("visibility");

    form.change(email, json!("ada.example.com")).expect("change");
    form.change(password, json!("hunter2")).expect("change");
    form.change(confirm, json!("hunter2")).expect("change");
    for (id, report) in block_on(form.run_pending()).expect("validation") {
        tracing::info!(field = %id, ?report, "validated");
    }

    form.change(email, json!("ada@example.com")).expect("change");
    form.change(password, json!("correct horse")).expect("change");
    let reports = block_on(form.run_pending()).expect("validation");
    tracing::info!(count = reports.len(), valid = form.is_valid(), "after corrections");

    form.change(confirm, json!("correct horse")).expect("change");
    block_on(form.flush_pending()).expect("validation");
    assert!(form.is_valid());
    assert_eq!(
        form.state(confirm),
        Some(FieldState::DIRTY | FieldState::TOUCHED)
    );

    form.root()
        .at("newsletter")
        .and_then(|r| r.set(json!(true)))
        .expect("toggle newsletter");
    tracing::info!(visible = phone.is_visible(), "phone field");

    let contacts = FieldArray::new(&form, &path("/contacts")).expect("array");
    for name in ["grace", "linus", "barbara"] {
        let index = contacts.push(json!({"name": name})).expect("push");
        let scope: Scope = contacts.scope(index);
        form.register_in(&scope, "name", None).expect("register contact");
    }
    contacts.remove(0).expect("remove");
    let bound: Vec<String> = form
        .fields()
        .into_iter()
        .filter_map(|id| form.path_of(id))
        .map(|p| p.to_string())
        .collect();
    tracing::info!(?bound, "fields after removing the first contact");

    let kinds = events
        .borrow()
        .iter()
        .filter(|line| line.starts_with(&format!("{:?}", EventKind::Invalidated)))
        .count();
    tracing::info!(events = events.borrow().len(), invalidations = kinds, "session finished");
    println!("{}", serde_json::to_string_pretty(&form.value()).expect("json"));
}
