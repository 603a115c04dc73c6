use super::*;

#[test]
fn threshold_is_reported_in_kilobytes() {
    let mut state = new_state();
    assert_eq!(state.get_threshold(), StateConfig::default().initial_gc_threshold_kb);
    state.set_threshold(100);
    assert_eq!(state.get_threshold(), 100);
}

#[test]
fn huge_thresholds_clamp() {
    let mut state = new_state();
    state.set_threshold(usize::MAX);
    assert_eq!(state.get_threshold(), usize::MAX >> 10);
}

#[test]
fn zero_threshold_collects_immediately() {
    let mut state = new_state();
    let before = state.gc_cycles();
    state.set_threshold(0);
    assert_eq!(state.gc_cycles(), before + 1);
}

#[test]
fn unreachable_objects_leave_the_estimate() {
    let mut state = new_state();
    state.set_threshold(1 << 20);
    for _ in 0..64 {
        state.new_table();
        for i in 1..=64 {
            state.push_number(i as f64);
            state.raw_set_indexed(-2, i).unwrap();
        }
    }
    state.collect_garbage();
    let held = state.get_live_estimate();
    assert!(held > 0);

    state.set_top(0).unwrap();
    state.collect_garbage();
    assert!(state.get_live_estimate() < held);
}

#[test]
fn reachable_values_survive() {
    let mut state = new_state();
    state.new_table();
    state.push_string("inner");
    state.raw_set_indexed(1, 1).unwrap();
    state.set_global("keep").unwrap();
    assert_eq!(state.get_top(), 0);

    state.collect_garbage();
    state.get_global("keep");
    state.raw_get_indexed(1, 1).unwrap();
    assert_eq!(state.to_string(2).unwrap().as_bytes(), b"inner");
}

#[test]
fn tag_methods_are_roots() {
    fn handler(state: &mut State) -> anyhow::Result<usize> {
        state.push_number(1.0);
        Ok(1)
    }

    let mut state = new_state();
    let tag = state.new_tag("Rooted", None).unwrap();
    state.push_native_function(handler, 0);
    state.set_tag_method(tag, TagEvent::Index).unwrap();
    state.pop(1);
    state.collect_garbage();
    state.get_tag_method(tag, TagEvent::Index).unwrap();
    assert!(state.is_native_function(1));
}
