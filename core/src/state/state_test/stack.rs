use super::*;

#[test]
fn positive_indices_resolve_from_base() {
    let mut state = new_state();
    push_numbers(&mut state, &[10.0, 20.0, 30.0]);
    let base = state.base();
    for i in 1..=3 {
        assert_eq!(state.resolve_strict(i), base + i as usize - 1);
        assert_eq!(state.resolve_acceptable(i), Some(base + i as usize - 1));
    }
    assert_eq!(state.resolve_strict(-1), base + 2);
    assert_eq!(state.resolve_strict(-3), base);
}

#[test]
fn acceptable_index_above_top_is_absent() {
    let mut state = new_state();
    push_numbers(&mut state, &[1.0]);
    assert_eq!(state.resolve_acceptable(2), None);
    assert_eq!(state.type_of(2), None);
    assert_eq!(State::type_name(state.type_of(5)), "no value");
}

#[test]
#[should_panic(expected = "invalid stack index 0")]
fn zero_index_is_rejected() {
    let mut state = new_state();
    push_numbers(&mut state, &[1.0]);
    state.resolve_strict(0);
}

#[test]
#[should_panic(expected = "invalid stack index -3")]
fn negative_index_below_base_is_rejected() {
    let mut state = new_state();
    push_numbers(&mut state, &[1.0, 2.0]);
    state.resolve_strict(-3);
}

#[test]
#[should_panic(expected = "above top")]
fn strict_positive_index_above_top_is_rejected() {
    let mut state = new_state();
    push_numbers(&mut state, &[1.0]);
    state.resolve_strict(2);
}

#[test]
fn push_and_pop_move_top_by_one() {
    let mut state = new_state();
    assert_eq!(state.get_top(), 0);
    state.push_number(3.0);
    assert_eq!(state.get_top(), 1);
    state.push_number(4.0);
    assert_eq!(state.get_top(), 2);
    assert_eq!(state.to_number(1), 3.0);
    state.pop(1);
    assert_eq!(state.get_top(), 1);
    assert_eq!(state.to_number(1), 3.0);
    state.pop(1);
    assert_eq!(state.get_top(), 0);
}

#[test]
fn set_top_pads_with_nil_and_discards() {
    let mut state = new_state();
    push_numbers(&mut state, &[1.0, 2.0]);
    state.set_top(4).unwrap();
    assert_eq!(state.get_top(), 4);
    assert_eq!(state.type_of(3), Some(Type::Nil));
    assert_eq!(state.type_of(4), Some(Type::Nil));

    state.set_top(-3).unwrap();
    assert_eq!(state.get_top(), 2);
    assert_eq!(state.to_number(-1), 2.0);

    state.set_top(0).unwrap();
    assert_eq!(state.get_top(), 0);
}

#[test]
fn set_top_minus_one_keeps_everything() {
    let mut state = new_state();
    push_numbers(&mut state, &[1.0, 2.0]);
    state.set_top(-1).unwrap();
    assert_eq!(state.get_top(), 2);
}

#[test]
fn set_top_grows_the_stack() {
    let config = StateConfig {
        initial_stack: 32,
        ..StateConfig::default()
    };
    let mut state = State::new(config).unwrap();
    state.set_top(100).unwrap();
    assert_eq!(state.get_top(), 100);
    state.check_stack(1).unwrap();
    state.push_number(1.0);
    assert_eq!(state.get_top(), 101);
}

#[test]
fn stack_growth_is_bounded() {
    let config = StateConfig {
        initial_stack: 32,
        max_stack: 64,
        ..StateConfig::default()
    };
    let mut state = State::new(config).unwrap();
    assert_eq!(state.check_stack(100), Err(ApiError::CapacityExhausted("stack")));
    assert_eq!(state.set_top(65), Err(ApiError::CapacityExhausted("stack")));
    assert!(state.check_stack(60).is_ok());
}

#[test]
fn insert_moves_top_into_place() {
    let mut state = new_state();
    push_numbers(&mut state, &[1.0, 2.0, 3.0, 4.0]);
    state.insert(2);
    let order: Vec<f64> = (1..=4).map(|i| state.to_number(i)).collect();
    assert_eq!(order, vec![1.0, 4.0, 2.0, 3.0]);
    assert_eq!(state.get_top(), 4);
}

#[test]
fn remove_shifts_down() {
    let mut state = new_state();
    push_numbers(&mut state, &[1.0, 2.0, 3.0, 4.0]);
    state.remove(-3);
    let order: Vec<f64> = (1..=3).map(|i| state.to_number(i)).collect();
    assert_eq!(order, vec![1.0, 3.0, 4.0]);
    assert_eq!(state.type_of(4), None);
}

#[test]
fn push_value_copies() {
    let mut state = new_state();
    push_numbers(&mut state, &[7.0, 8.0]);
    state.push_value(1);
    assert_eq!(state.get_top(), 3);
    assert_eq!(state.to_number(-1), 7.0);
    assert!(state.equal(1, 3));
}

#[test]
fn check_stack_reserves_space() {
    let mut state = new_state();
    let space = state.stack_space();
    state.check_stack(space + 10).unwrap();
    assert!(state.stack_space() >= space + 10);
    for i in 0..space + 10 {
        state.push_number(i as f64);
    }
    assert_eq!(state.get_top(), space + 10);
}

#[test]
#[should_panic(expected = "push without check_stack")]
fn pushing_past_capacity_is_a_contract_violation() {
    let config = StateConfig {
        initial_stack: 20,
        ..StateConfig::default()
    };
    let mut state = State::new(config).unwrap();
    for _ in 0..21 {
        state.push_nil();
    }
}

#[test]
fn guard_depth_returns_to_zero() {
    let mut state = new_state();
    state.push_number(1.0);
    state.set_top(3).unwrap();
    assert_eq!(state.api_depth(), 0);
}

fn inspect_frame(state: &mut State) -> anyhow::Result<usize> {
    let outer = state.api_depth();
    let base = state.base();
    assert_eq!(state.resolve_strict(1), base);
    assert_eq!(state.resolve_acceptable(2), None);
    let _ = (state.gc_cycles(), state.ref_table().len(), state.tags().len());
    let _ = (state.config().min_stack, state.call_depth());
    state.push_number(if state.api_depth() == outer { 1.0 } else { 0.0 });
    Ok(1)
}

#[test]
fn accessors_release_their_guard() {
    let mut state = new_state();
    state.push_native_function(inspect_frame, 0);
    state.push_string("arg");
    state.call(1, Some(1)).unwrap();
    assert_eq!(state.to_number(1), 1.0);

    assert_eq!(state.resolve_strict(-1), 0);
    assert_eq!(state.base(), 0);
    assert_eq!(state.api_depth(), 0);
}
