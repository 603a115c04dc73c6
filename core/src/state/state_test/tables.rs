use super::*;

fn constant_index(state: &mut State) -> anyhow::Result<usize> {
    state.push_string("fallback");
    Ok(1)
}

fn echo_key(state: &mut State) -> anyhow::Result<usize> {
    state.push_value(2);
    Ok(1)
}

fn record_set(state: &mut State) -> anyhow::Result<usize> {
    // (target, key, value): store value under "seen" in the globals
    state.push_value(3);
    state.set_global("seen")?;
    Ok(0)
}

#[test]
fn raw_set_then_raw_get() {
    let mut state = new_state();
    state.new_table();
    state.push_string("x");
    state.push_number(10.0);
    state.raw_set(1).unwrap();
    assert_eq!(state.get_top(), 1);

    state.push_string("x");
    state.raw_get(1).unwrap();
    assert_eq!(state.get_top(), 2);
    assert_eq!(state.to_number(2), 10.0);

    state.push_string("missing");
    state.raw_get(1).unwrap();
    assert_eq!(state.type_of(3), Some(Type::Nil));
}

#[test]
fn nil_keys_read_nil_and_refuse_writes() {
    let mut state = new_state();
    state.new_table();
    state.push_nil();
    state.raw_get(1).unwrap();
    assert_eq!(state.type_of(-1), Some(Type::Nil));
    state.pop(1);

    state.push_nil();
    state.push_number(1.0);
    assert_eq!(
        state.raw_set(1),
        Err(ApiError::Runtime("table index is nil".into()))
    );
    assert_eq!(state.get_top(), 3, "a rejected write pops nothing");
}

#[test]
fn raw_access_requires_a_table() {
    let mut state = new_state();
    state.push_number(1.0);
    state.push_number(2.0);
    assert!(matches!(
        state.raw_get(1),
        Err(ApiError::TypeMismatch { op: "rawget", expected: "table", found: "number" })
    ));
    assert!(matches!(state.raw_get_indexed(1, 1), Err(ApiError::TypeMismatch { .. })));
    assert!(matches!(state.length_hint(1), Err(ApiError::TypeMismatch { .. })));
}

#[test]
fn indexed_access() {
    let mut state = new_state();
    state.new_table();
    for i in 1..=3 {
        state.push_number(i as f64 * 10.0);
        state.raw_set_indexed(1, i).unwrap();
    }
    state.raw_get_indexed(1, 2).unwrap();
    assert_eq!(state.to_number(-1), 20.0);
    state.raw_get_indexed(1, 9).unwrap();
    assert_eq!(state.type_of(-1), Some(Type::Nil));

    // integral number keys and indexed keys are the same slot
    state.push_number(3.0);
    state.raw_get(1).unwrap();
    assert_eq!(state.to_number(-1), 30.0);
}

#[test]
fn next_visits_every_entry_once() {
    let mut state = new_state();
    state.new_table();
    for (k, v) in [("a", 1.0), ("b", 2.0), ("c", 3.0)] {
        state.push_string(k);
        state.push_number(v);
        state.raw_set(1).unwrap();
    }

    let mut sum = 0.0;
    let mut visits = 0;
    state.push_nil();
    while state.next(1).unwrap() {
        sum += state.to_number(-1);
        visits += 1;
        state.pop(1);
    }
    assert_eq!(visits, 3);
    assert_eq!(sum, 6.0);
    assert_eq!(state.get_top(), 1);
}

#[test]
fn next_tolerates_clearing_visited_fields() {
    let mut state = new_state();
    state.new_table();
    for i in 1..=4 {
        state.push_number(i as f64);
        state.raw_set_indexed(1, i).unwrap();
    }

    let mut visits = 0;
    state.push_nil();
    while state.next(1).unwrap() {
        state.pop(1);
        state.push_value(-1);
        state.push_nil();
        state.raw_set(1).unwrap();
        visits += 1;
    }
    assert_eq!(visits, 4);
    assert_eq!(state.length_hint(1).unwrap(), 0);
}

#[test]
fn next_rejects_foreign_keys() {
    let mut state = new_state();
    state.new_table();
    state.push_string("nope");
    assert_eq!(
        state.next(1),
        Err(ApiError::Runtime("invalid key for next".into()))
    );
}

#[test]
fn length_hint_prefers_the_n_field() {
    let mut state = new_state();
    state.new_table();
    state.push_number(1.0);
    state.raw_set_indexed(1, 1).unwrap();
    state.push_number(1.0);
    state.raw_set_indexed(1, 7).unwrap();
    assert_eq!(state.length_hint(1).unwrap(), 7);

    state.push_string("n");
    state.push_number(2.0);
    state.raw_set(1).unwrap();
    assert_eq!(state.length_hint(1).unwrap(), 2);
}

#[test]
fn index_handler_fills_missing_fields() {
    let mut state = new_state();
    let proto = state.new_tag("Proto", Some(Type::Table)).unwrap();
    state.push_native_function(constant_index, 0);
    state.set_tag_method(proto, TagEvent::Index).unwrap();
    state.pop(1);

    state.new_table();
    state.set_tag(1, proto).unwrap();
    state.push_string("present");
    state.push_number(1.0);
    state.raw_set(1).unwrap();

    state.push_string("present");
    state.get_table(1).unwrap();
    assert_eq!(state.to_number(-1), 1.0);
    state.push_string("absent");
    state.get_table(1).unwrap();
    assert_eq!(state.to_string(-1).unwrap().as_bytes(), b"fallback");
    assert_eq!(state.get_top(), 3);
}

#[test]
fn gettable_handler_wins_over_raw_fields() {
    let mut state = new_state();
    let proxy = state.new_tag("Proxy", None).unwrap();
    state.push_native_function(echo_key, 0);
    state.set_tag_method(proxy, TagEvent::GetTable).unwrap();
    state.pop(1);

    let udata = state.new_userdata(4).unwrap();
    state.set_tag(1, proxy).unwrap();
    assert_eq!(udata.tag(), proxy);
    state.push_string("k");
    state.get_table(1).unwrap();
    assert_eq!(state.to_string(-1).unwrap().as_bytes(), b"k");
}

#[test]
fn settable_handler_intercepts_writes() {
    let mut state = new_state();
    let watched = state.new_tag("Watched", Some(Type::Table)).unwrap();
    state.push_native_function(record_set, 0);
    state.set_tag_method(watched, TagEvent::SetTable).unwrap();
    state.pop(1);

    state.new_table();
    state.set_tag(1, watched).unwrap();
    state.push_string("field");
    state.push_number(99.0);
    state.set_table(1).unwrap();
    assert_eq!(state.get_top(), 1);

    state.push_string("field");
    state.raw_get(1).unwrap();
    assert_eq!(state.type_of(-1), Some(Type::Nil));
    state.get_global("seen");
    assert_eq!(state.to_number(-1), 99.0);
}

#[test]
fn indexing_plain_values_fails() {
    let mut state = new_state();
    state.push_number(1.0);
    state.push_string("k");
    assert_eq!(
        state.get_table(1),
        Err(ApiError::Runtime("attempt to index a number value".into()))
    );
}

#[test]
fn globals_round_trip() {
    let mut state = new_state();
    state.push_number(3.0);
    state.set_global("answer").unwrap();
    assert_eq!(state.get_top(), 0);
    state.get_global("answer");
    assert_eq!(state.to_number(1), 3.0);
    state.get_global("unset");
    assert_eq!(state.type_of(2), Some(Type::Nil));

    state.new_table();
    state.set_globals().unwrap();
    state.get_global("answer");
    assert_eq!(state.type_of(-1), Some(Type::Nil));

    state.push_globals();
    state.push_string("answer");
    state.push_number(4.0);
    state.raw_set(-3).unwrap();
    state.get_global("answer");
    assert_eq!(state.to_number(-1), 4.0);
}

fn reject_write(state: &mut State) -> anyhow::Result<usize> {
    Err(state.raise("read only").into())
}

#[test]
fn failed_writes_leave_the_stack_alone() {
    let mut state = new_state();
    state.new_table();
    state.push_number(f64::NAN);
    state.push_number(1.0);
    assert_eq!(
        state.raw_set(1),
        Err(ApiError::Runtime("table index is NaN".into()))
    );
    assert_eq!(state.get_top(), 3);
    assert!(state.to_number(2).is_nan());
    assert_eq!(state.to_number(3), 1.0);

    state.set_top(1).unwrap();
    state.push_nil();
    state.push_number(1.0);
    assert!(state.set_table(1).is_err());
    assert_eq!(state.get_top(), 3);

    state.set_top(0).unwrap();
    state.push_number(7.0);
    state.push_string("k");
    state.push_number(1.0);
    assert!(state.set_table(1).is_err());
    assert_eq!(state.get_top(), 3);
}

#[test]
fn failed_handlers_leave_the_stack_alone() {
    let mut state = new_state();
    let frozen = state.new_tag("Frozen", Some(Type::Table)).unwrap();
    state.push_native_function(reject_write, 0);
    state.set_tag_method(frozen, TagEvent::SetTable).unwrap();
    state.pop(1);

    state.new_table();
    state.set_tag(1, frozen).unwrap();
    state.push_string("field");
    state.push_number(1.0);
    assert_eq!(
        state.set_table(1),
        Err(ApiError::Runtime("read only".into()))
    );
    assert_eq!(state.get_top(), 3);
    assert_eq!(state.to_string(2).unwrap().as_bytes(), b"field");
}

#[test]
fn failed_next_keeps_the_key() {
    let mut state = new_state();
    state.new_table();
    state.push_string("missing");
    assert!(state.next(1).is_err());
    assert_eq!(state.get_top(), 2);
    assert_eq!(state.to_string(2).unwrap().as_bytes(), b"missing");

    state.pop(1);
    state.push_nil();
    assert!(!state.next(1).unwrap());
    assert_eq!(state.get_top(), 1, "the end of a traversal pops the key");
}

#[test]
fn set_globals_keeps_a_non_table() {
    let mut state = new_state();
    state.push_number(1.0);
    assert!(matches!(
        state.set_globals(),
        Err(ApiError::TypeMismatch { op: "setglobals", .. })
    ));
    assert_eq!(state.get_top(), 1);
}
