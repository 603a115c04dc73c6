use super::*;

#[test]
fn create_ref_pops_and_get_ref_pushes() {
    let mut state = new_state();
    state.push_string("anchored");
    let h = state.create_ref(true).unwrap();
    assert_eq!(state.get_top(), 0);
    assert_eq!(state.ref_anchor(h), Some(Anchor::Locked));

    assert!(state.get_ref(h));
    assert_eq!(state.to_string(-1).unwrap().as_bytes(), b"anchored");

    state.release_ref(h);
    assert!(!state.get_ref(h));
    assert_eq!(state.get_top(), 1, "a stale handle pushes nothing");
}

#[test]
fn nil_ref_needs_no_slot() {
    let mut state = new_state();
    state.push_nil();
    let h = state.create_ref(true).unwrap();
    assert_eq!(h, Handle::NIL);
    assert_eq!(state.ref_table().len(), 0);
    assert!(state.get_ref(h));
    assert_eq!(state.type_of(-1), Some(Type::Nil));
}

#[test]
fn latest_release_is_reused_first() {
    let mut state = new_state();
    push_numbers(&mut state, &[1.0, 2.0]);
    let first = state.create_ref(false).unwrap();
    let second = state.create_ref(true).unwrap();
    assert_eq!(state.ref_anchor(first), Some(Anchor::Held));
    state.release_ref(second);

    let slots = state.ref_table().len();
    state.push_number(3.0);
    let again = state.create_ref(true).unwrap();
    assert_eq!(again, second);
    assert_eq!(state.ref_table().len(), slots);
}

#[test]
fn ref_overflow_aborts_and_keeps_the_value() {
    let config = StateConfig {
        max_refs: 1,
        ..StateConfig::default()
    };
    let mut state = State::new(config).unwrap();
    push_numbers(&mut state, &[1.0, 2.0]);
    state.create_ref(true).unwrap();
    assert_eq!(
        state.create_ref(true),
        Err(ApiError::CapacityExhausted("reference table"))
    );
    assert_eq!(state.get_top(), 1);
}

#[test]
fn anchored_tables_survive_collection() {
    let mut state = new_state();
    state.new_table();
    state.push_string("payload");
    state.raw_set_indexed(-2, 1).unwrap();
    let h = state.create_ref(true).unwrap();
    assert_eq!(state.get_top(), 0);

    state.collect_garbage();
    assert!(state.get_ref(h));
    state.raw_get_indexed(-1, 1).unwrap();
    assert_eq!(state.to_string(-1).unwrap().as_bytes(), b"payload");
}

#[test]
fn held_refs_are_roots_too() {
    let mut state = new_state();
    state.new_table();
    state.push_number(5.0);
    state.raw_set_indexed(-2, 1).unwrap();
    let h = state.create_ref(false).unwrap();

    state.collect_garbage();
    assert!(state.get_ref(h));
    assert_eq!(state.length_hint(-1).unwrap(), 1);
}
