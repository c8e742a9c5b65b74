//! End-to-end behavior of the mapping-expression engine, exercised the way
//! the composition graph uses it: one expression per arc, composed toward
//! the root, invalidated by relocation-style edits.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use nsmap::{MapEngine, MapFunction, ScenePath, TimeOffset};

fn p(s: &str) -> ScenePath {
    ScenePath::parse(s).unwrap()
}

fn ref_fn() -> MapFunction {
    MapFunction::from_pairs(&[("/Model", "/World/anim/Model_1")])
}

fn rig_fn() -> MapFunction {
    MapFunction::from_pairs(&[("/Rig", "/Model/Rig")])
}

#[test]
fn reference_then_rig_arc() {
    let engine = MapEngine::new();
    let ref_expr = engine.constant(ref_fn());
    let rig_expr = engine.constant(rig_fn());

    let chained = ref_expr.compose(&rig_expr);
    assert_eq!(
        chained.evaluate(),
        MapFunction::from_pairs(&[("/Rig", "/World/anim/Model_1/Rig")])
    );
    assert_eq!(
        chained.inverse().evaluate(),
        MapFunction::from_pairs(&[("/World/anim/Model_1/Rig", "/Rig")])
    );
}

#[test]
fn structurally_equal_chains_share_nodes_and_caches() {
    let engine = MapEngine::new();
    let a = engine.constant(ref_fn()).compose(&engine.constant(rig_fn()));
    let b = engine.constant(ref_fn()).compose(&engine.constant(rig_fn()));
    assert!(a.ptr_eq(&b));

    a.evaluate();
    // The shared node is cached for both handles.
    assert!(b.has_cached_value());
}

#[test]
fn constant_folding_builds_no_combinator_nodes() {
    let engine = MapEngine::new();
    let base = engine.interned_count();
    let reference = engine.constant(ref_fn());
    let rig = engine.constant(rig_fn());
    let folded = reference.compose(&rig);
    assert!(folded.is_constant());
    // Two operand constants plus the folded constant; no compose node.
    assert_eq!(engine.interned_count(), base + 3);
}

#[test]
fn root_identity_algebra() {
    let engine = MapEngine::new();
    let f = ref_fn();
    let outside = p("/Set/Prop");
    assert!(f.source_to_target(&outside).is_empty());

    let widened = engine.constant(f).add_root_identity();
    assert_eq!(widened.evaluate().source_to_target(&outside), outside);

    // Repeated application yields the same node, not a redundant one.
    assert!(widened.add_root_identity().ptr_eq(&widened));
}

#[test]
fn invertibility_round_trip() {
    let f = MapFunction::from_pairs(&[
        ("/Model", "/World/anim/Model_1"),
        ("/Props", "/World/props"),
    ]);
    for path in ["/Model/Rig/Arm", "/Props/Chair", "/Model"] {
        let path = p(path);
        let once = f.source_to_target(&path);
        assert!(!once.is_empty());
        assert_eq!(f.source_to_target(&f.target_to_source(&once)), once);
    }
}

#[test]
fn variable_edit_invalidates_transitively() {
    let engine = MapEngine::new();
    let (relocation, e1) = engine.variable(ref_fn());
    let e2 = e1.inverse();
    e1.evaluate();
    e2.evaluate();
    assert!(e1.has_cached_value() && e2.has_cached_value());

    let edited = MapFunction::from_pairs(&[("/Model", "/World/anim/Model_7")]);
    relocation.set(edited.clone());
    assert_eq!(relocation.get(), edited);
    assert_eq!(e2.evaluate(), edited.inverse());
}

#[test]
fn noop_edit_is_free() {
    let engine = MapEngine::new();
    let (relocation, e) = engine.variable(ref_fn());
    let inv = e.inverse();
    inv.evaluate();
    let before = inv.recompute_count();

    relocation.set(ref_fn());
    assert!(inv.has_cached_value());
    inv.evaluate();
    assert_eq!(inv.recompute_count(), before);
}

#[test]
fn variable_outlives_its_owning_handle() {
    let engine = MapEngine::new();
    let (relocation, e) = engine.variable(rig_fn());
    let downstream = engine.constant(ref_fn()).compose(&e).inverse();
    drop(relocation);
    // Frozen at the last value; evaluation still works.
    assert_eq!(
        downstream.evaluate(),
        MapFunction::from_pairs(&[("/World/anim/Model_1/Rig", "/Rig")])
    );
}

#[test]
fn compose_flag_conjunction_regression() {
    // Composing through a side that does not preserve identity removes the
    // pass-through: the composed expression must build a real
    // add-root-identity node, while unary combinators keep the flag.
    let engine = MapEngine::new();
    let (_var, varying) = engine.variable(MapFunction::identity());

    let through_identity = engine.identity().compose(&varying);
    assert!(!through_identity.always_has_root_identity());
    let widened = through_identity.add_root_identity();
    assert!(!widened.ptr_eq(&through_identity));

    let inverted = widened.inverse();
    assert!(inverted.always_has_root_identity());
    assert!(inverted.add_root_identity().ptr_eq(&inverted));
}

#[test]
fn time_offsets_ride_along() {
    let engine = MapEngine::new();
    let clip = engine.constant(MapFunction::new(
        vec![(p("/"), p("/"))],
        TimeOffset::new(0.5, 10.0),
    ));
    let layer = engine.constant(MapFunction::new(
        vec![(p("/"), p("/"))],
        TimeOffset::new(1.0, -2.0),
    ));
    let combined = layer.compose(&clip).evaluate();
    assert_eq!(combined.time_offset().apply(4.0), 10.0);
    assert_eq!(combined.inverse().time_offset().apply(10.0), 4.0);
}

#[test]
fn parallel_evaluation_and_edits_stay_consistent() {
    let engine = Arc::new(MapEngine::new());
    let (relocation, base) = engine.variable(ref_fn());
    let chain = base
        .compose(&engine.constant(rig_fn()))
        .add_root_identity()
        .inverse();

    let old = ref_fn().compose(&rig_fn()).with_root_identity().inverse();
    let edited = MapFunction::from_pairs(&[("/Model", "/World/anim/Model_9")]);
    let new = edited.compose(&rig_fn()).with_root_identity().inverse();

    let stop = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let chain = chain.clone();
            let stop = stop.clone();
            let (old, new) = (old.clone(), new.clone());
            thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    let value = chain.evaluate();
                    // Never a mix of old and new inputs.
                    assert!(value == old || value == new);
                }
            })
        })
        .collect();

    for _ in 0..200 {
        relocation.set(edited.clone());
        relocation.set(ref_fn());
    }
    relocation.set(edited.clone());
    stop.store(true, Ordering::Relaxed);
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(chain.evaluate(), new);
}
