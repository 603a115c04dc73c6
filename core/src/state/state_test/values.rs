use super::*;

fn double(state: &mut State) -> anyhow::Result<usize> {
    let n = state.to_number(1);
    state.push_number(n * 2.0);
    Ok(1)
}

#[test]
fn reads_degrade_to_sentinels() {
    let state = new_state();
    assert_eq!(state.to_number(1), 0.0);
    assert_eq!(state.to_string(1), None);
    assert_eq!(state.string_len(1), 0);
    assert!(state.to_native_function(1).is_none());
    assert!(state.to_userdata(1).is_none());
    assert!(state.to_pointer(1).is_none());
    assert_eq!(state.tag_of(1), None);
    assert_eq!(state.tag_name(1), "no value");
    assert!(!state.is_number(1));
    assert!(!state.is_string(1));
}

#[test]
fn mismatched_reads_return_sentinels() {
    let mut state = new_state();
    state.new_table();
    assert_eq!(state.to_number(1), 0.0);
    assert_eq!(state.to_string(1), None);
    assert!(state.to_native_function(1).is_none());
    assert!(state.to_pointer(1).is_some());
}

#[test]
fn strings_and_numbers_convert_without_mutation() {
    let mut state = new_state();
    state.push_string(" 42 ");
    state.push_number(1.5);
    assert!(state.is_number(1));
    assert_eq!(state.to_number(1), 42.0);
    assert_eq!(state.type_of(1), Some(Type::String));

    let s = state.to_string(2).unwrap();
    assert_eq!(s.as_bytes(), b"1.5");
    assert_eq!(state.type_of(2), Some(Type::Number));
    assert_eq!(state.string_len(2), 3);
}

#[test]
fn explicit_coercion_replaces_the_slot() {
    let mut state = new_state();
    state.push_number(7.0);
    state.push_string("0x10");
    state.push_string("seven");
    state.new_table();

    assert!(state.coerce_to_string(1));
    assert_eq!(state.type_of(1), Some(Type::String));
    assert_eq!(state.to_string(1).unwrap().as_bytes(), b"7");

    assert!(state.coerce_to_number(2));
    assert_eq!(state.type_of(2), Some(Type::Number));
    assert_eq!(state.to_number(2), 16.0);

    assert!(!state.coerce_to_number(3));
    assert_eq!(state.type_of(3), Some(Type::String));
    assert!(!state.coerce_to_string(4));
    assert!(!state.coerce_to_number(9));
}

#[test]
fn equal_and_less_than_tolerate_missing_indices() {
    let mut state = new_state();
    push_numbers(&mut state, &[1.0, 2.0]);
    assert!(state.less_than(1, 2));
    assert!(!state.less_than(2, 1));
    assert!(!state.equal(1, 2));
    assert!(!state.equal(1, 5));
    assert!(!state.less_than(5, 1));

    state.push_string("a");
    state.push_string("b");
    assert!(state.less_than(3, 4));
    assert!(!state.less_than(1, 3), "numbers and strings are not ordered");
}

#[test]
fn interned_strings_are_equal() {
    let mut state = new_state();
    state.push_string("hello");
    state.push_string(b"hello");
    assert!(state.equal(1, 2));
    assert!(state.is_string(1));
}

#[test]
fn native_functions_round_trip() {
    let mut state = new_state();
    state.push_native_function(double, 0);
    assert!(state.is_native_function(1));
    assert_eq!(state.type_of(1), Some(Type::Function));
    assert!(state.to_native_function(1).is_some());
    state.push_number(21.0);
    state.call(1, Some(1)).unwrap();
    assert_eq!(state.get_top(), 1);
    assert_eq!(state.to_number(1), 42.0);
}

#[test]
fn buffer_userdata_is_zeroed_and_writable() {
    let mut state = new_state();
    let udata = state.new_userdata(0).unwrap();
    assert_eq!(udata.with_bytes(|b| b.len()), Some(1));
    udata.with_bytes(|b| b[0] = 9);
    let read = state.to_userdata(-1).expect("userdata");
    assert_eq!(read.with_bytes(|b| b[0]), Some(9));
    assert_eq!(state.tag_of(-1), Some(TagId::USERDATA));
    assert_eq!(state.tag_name(-1), "userdata");
}

#[test]
fn oversized_userdata_pushes_nothing() {
    let mut state = new_state();
    state.push_number(1.0);
    assert_eq!(
        state.new_userdata(usize::MAX).unwrap_err(),
        ApiError::CapacityExhausted("userdata")
    );
    assert_eq!(state.get_top(), 1);
    assert_eq!(state.api_depth(), 0);
}

#[test]
fn host_userdata_is_interned_by_pointer() {
    let mut state = new_state();
    let host: Rc<dyn std::any::Any> = Rc::new(String::from("socket"));
    assert!(state.push_userdata(Rc::clone(&host)));
    assert!(!state.push_userdata(Rc::clone(&host)));
    assert!(state.equal(1, 2));
    assert!(state.push_userdata(Rc::new(5u32)));
    assert!(!state.equal(1, 3));

    let udata = state.to_userdata(1).unwrap();
    assert_eq!(udata.downcast_ref::<String>().map(String::as_str), Some("socket"));
    assert!(udata.downcast_ref::<u32>().is_none());
}

#[test]
fn tag_names_follow_attached_tags() {
    let mut state = new_state();
    state.push_number(1.0);
    assert_eq!(state.tag_name(1), "number");
    assert_eq!(state.tag_of(1), Some(TagId::NUMBER));
}
