//! Introspective reads. Every function here resolves leniently and answers
//! with a sentinel (`None`, `false`, `0`) for absent or mismatched values;
//! none of them modifies the stack.

use std::rc::Rc;

use crate::tags::TagId;
use crate::val::{NativeFn, Str, Type, UserData, Val, format_number, parse_number};

use super::State;

impl State {
    /// Structural type at `index`, `None` when there is no value.
    pub fn type_of(&self, index: i32) -> Option<Type> {
        let _guard = self.enter();
        self.probe(index).map(Val::type_of)
    }

    pub fn type_name(ty: Option<Type>) -> &'static str {
        ty.map_or("no value", Type::name)
    }

    /// Name of the tag carried by the value at `index`.
    pub fn tag_name(&self, index: i32) -> &str {
        let _guard = self.enter();
        match self.probe(index) {
            Some(val) => self.tags.name(self.tag_of_val(val)).unwrap_or("no value"),
            None => "no value",
        }
    }

    pub fn tag_of(&self, index: i32) -> Option<TagId> {
        let _guard = self.enter();
        self.probe(index).map(|val| self.tag_of_val(val))
    }

    pub(crate) fn tag_of_val(&self, val: &Val) -> TagId {
        match val {
            Val::Table(t) => t.borrow().tag(),
            Val::UserData(u) => u.tag(),
            other => TagId::for_type(other.type_of()),
        }
    }

    pub fn is_native_function(&self, index: i32) -> bool {
        let _guard = self.enter();
        matches!(self.probe(index), Some(Val::Function(_)))
    }

    /// True for numbers and for strings that read as numbers.
    pub fn is_number(&self, index: i32) -> bool {
        let _guard = self.enter();
        match self.probe(index) {
            Some(Val::Number(_)) => true,
            Some(Val::Str(s)) => parse_number(s.as_bytes()).is_some(),
            _ => false,
        }
    }

    /// True for strings and numbers.
    pub fn is_string(&self, index: i32) -> bool {
        let _guard = self.enter();
        self.probe(index).is_some_and(Val::is_string_like)
    }

    /// Raw equality; false when either index is empty.
    pub fn equal(&self, index1: i32, index2: i32) -> bool {
        let _guard = self.enter();
        match (self.probe(index1), self.probe(index2)) {
            (Some(a), Some(b)) => a.raw_equal(b),
            _ => false,
        }
    }

    /// Numeric or bytewise string ordering; false when either index is empty
    /// or the values are not comparable.
    pub fn less_than(&self, index1: i32, index2: i32) -> bool {
        let _guard = self.enter();
        match (self.probe(index1), self.probe(index2)) {
            (Some(a), Some(b)) => a.less_than(b).unwrap_or(false),
            _ => false,
        }
    }

    /// Number at `index`, converting numeric strings without touching the
    /// slot. Zero when absent or not convertible.
    pub fn to_number(&self, index: i32) -> f64 {
        let _guard = self.enter();
        match self.probe(index) {
            Some(Val::Number(n)) => *n,
            Some(Val::Str(s)) => parse_number(s.as_bytes()).unwrap_or(0.0),
            _ => 0.0,
        }
    }

    /// String at `index`; numbers are formatted without touching the slot.
    pub fn to_string(&self, index: i32) -> Option<Str> {
        let _guard = self.enter();
        match self.probe(index)? {
            Val::Str(s) => Some(s.clone()),
            Val::Number(n) => Some(Str::new(format_number(*n).as_bytes())),
            _ => None,
        }
    }

    /// Byte length of [`State::to_string`]; zero when that is `None`.
    pub fn string_len(&self, index: i32) -> usize {
        self.to_string(index).map_or(0, |s| s.len())
    }

    pub fn to_native_function(&self, index: i32) -> Option<NativeFn> {
        let _guard = self.enter();
        match self.probe(index)? {
            Val::Function(closure) => Some(closure.function()),
            _ => None,
        }
    }

    pub fn to_userdata(&self, index: i32) -> Option<Rc<UserData>> {
        let _guard = self.enter();
        match self.probe(index)? {
            Val::UserData(u) => Some(Rc::clone(u)),
            _ => None,
        }
    }

    /// Identity of a table or function, for hashing and debugging only.
    pub fn to_pointer(&self, index: i32) -> Option<*const ()> {
        let _guard = self.enter();
        match self.probe(index)? {
            val @ (Val::Table(_) | Val::Function(_)) => val.identity().map(|addr| addr as *const ()),
            _ => None,
        }
    }

    /// Replaces a numeric string at `index` with its number. True when the
    /// slot now holds a number.
    pub fn coerce_to_number(&mut self, index: i32) -> bool {
        let _guard = self.enter();
        let Some(slot) = self.resolve_acceptable(index) else {
            return false;
        };
        let converted = match &self.stack[slot] {
            Val::Number(_) => return true,
            Val::Str(s) => parse_number(s.as_bytes()),
            _ => None,
        };
        match converted {
            Some(n) => {
                self.stack[slot] = Val::Number(n);
                true
            }
            None => false,
        }
    }

    /// Replaces a number at `index` with its string form. True when the slot
    /// now holds a string.
    pub fn coerce_to_string(&mut self, index: i32) -> bool {
        let _guard = self.enter();
        let Some(slot) = self.resolve_acceptable(index) else {
            return false;
        };
        let n = match &self.stack[slot] {
            Val::Str(_) => return true,
            Val::Number(n) => *n,
            _ => return false,
        };
        let s = self.intern(format_number(n).as_bytes());
        self.stack[slot] = Val::Str(s);
        self.check_gc();
        true
    }
}
