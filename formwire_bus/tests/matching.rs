// Copyright 2025 the Formwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property tests for pattern matching and subscription bookkeeping.

use std::cell::Cell;
use std::rc::Rc;

use formwire_bus::{Event, EventBus, EventKind, Pattern};
use formwire_path::{Path, Segment};
use proptest::prelude::*;

fn arb_segment() -> impl Strategy<Value = Segment> {
    prop_oneof![
        (0_usize..5).prop_map(Segment::Index),
        "[a-c]".prop_map(Segment::Key),
    ]
}

fn arb_path(max: usize) -> impl Strategy<Value = Path> {
    prop::collection::vec(arb_segment(), 0..max).prop_map(Path::from_segments)
}

proptest! {
    #[test]
    fn exact_pattern_matches_only_equal_topics(a in arb_path(4), b in arb_path(4)) {
        let pattern = Pattern::exact(&a);
        prop_assert!(pattern.matches(&a));
        prop_assert_eq!(pattern.matches(&b), a == b);
    }

    #[test]
    fn rest_matches_every_extension(prefix in arb_path(3), tail in arb_path(3)) {
        let pattern = Pattern::from_path(&prefix.child_key("**")).unwrap();
        let mut topic = prefix.clone();
        for s in tail.segments() {
            topic.push(s.clone());
        }
        prop_assert!(pattern.matches(&topic));
    }

    #[test]
    fn star_matches_one_level_only(prefix in arb_path(3), topic in arb_path(5)) {
        let pattern = Pattern::from_path(&prefix.child_key("*")).unwrap();
        let expected = topic.len() == prefix.len() + 1 && topic.starts_with(&prefix);
        prop_assert_eq!(pattern.matches(&topic), expected);
    }

    /// Subscribing and immediately unsubscribing leaves delivery unchanged.
    #[test]
    fn on_off_is_idempotent(topics in prop::collection::vec(arb_path(3), 1..6)) {
        let bus: EventBus = EventBus::new();
        let hits = Rc::new(Cell::new(0_usize));
        let h = hits.clone();
        bus.on(Pattern::parse("/**").unwrap(), move |_, _| {
            h.set(h.get() + 1);
            Ok(())
        });
        let transient = bus.on(Pattern::parse("/**").unwrap(), |_, _| {
            panic!("removed handler must not run")
        });
        bus.off(transient);
        for t in &topics {
            prop_assert_eq!(bus.emit(t, &Event::new(EventKind::ValueChanged)), Ok(1));
        }
        prop_assert_eq!(hits.get(), topics.len());
        prop_assert_eq!(bus.len(), 1);
    }
}
