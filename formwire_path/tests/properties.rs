// Copyright 2025 the Formwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property tests for resolution laws.

use formwire_path::{Path, Segment};
use proptest::prelude::*;

fn arb_segment() -> impl Strategy<Value = Segment> {
    prop_oneof![
        (0_usize..50).prop_map(Segment::Index),
        "[a-z][a-z0-9_]{0,6}".prop_map(Segment::Key),
    ]
}

fn arb_absolute() -> impl Strategy<Value = Path> {
    prop::collection::vec(arb_segment(), 0..6).prop_map(Path::from_segments)
}

fn arb_relative() -> impl Strategy<Value = String> {
    (0_usize..3, prop::collection::vec(arb_segment(), 0..4)).prop_map(|(up, segs)| {
        let mut parts: Vec<String> = (0..up).map(|_| "..".to_string()).collect();
        parts.extend(segs.iter().map(ToString::to_string));
        parts.join("/")
    })
}

proptest! {
    /// Absolute paths ignore the base entirely.
    #[test]
    fn absolute_resolves_to_itself(p in arb_absolute(), base in arb_absolute()) {
        prop_assert_eq!(p.resolve(&base).unwrap(), p);
    }

    /// Relative resolution against an absolute base is absolute and repeatable.
    #[test]
    fn relative_resolution_is_absolute_and_deterministic(
        rel in arb_relative(),
        base in arb_absolute(),
    ) {
        let rel = Path::parse(&rel).unwrap();
        let first = rel.resolve(&base);
        let second = rel.resolve(&base);
        prop_assert_eq!(&first, &second);
        if rel.up() <= base.len() {
            let out = first.unwrap();
            prop_assert!(out.is_absolute());
            prop_assert_eq!(out.len(), base.len() - rel.up() + rel.len());
        } else {
            prop_assert!(first.is_err());
        }
    }

    /// The canonical text of an absolute path parses back to the same path.
    #[test]
    fn display_is_canonical(p in arb_absolute()) {
        prop_assert_eq!(Path::parse(&p.to_string()).unwrap(), p);
    }

    /// Nesting scopes one level at a time matches resolving the concatenation directly.
    #[test]
    fn nested_scopes_compose(
        base in arb_absolute(),
        a in prop::collection::vec(arb_segment(), 0..3),
        b in prop::collection::vec(arb_segment(), 0..3),
    ) {
        let text = |segs: &[Segment]| {
            segs.iter().map(ToString::to_string).collect::<Vec<_>>().join("/")
        };
        let inner = Path::parse(&text(&a)).unwrap().resolve(&base).unwrap();
        let nested = Path::parse(&text(&b)).unwrap().resolve(&inner).unwrap();
        let mut all = a.clone();
        all.extend(b.iter().cloned());
        let direct = Path::parse(&text(&all)).unwrap().resolve(&base).unwrap();
        prop_assert_eq!(nested, direct);
    }
}
