//! Value representation shared by the stack, tables and the reference table.

use std::{cell::RefCell, fmt, rc::Rc};

mod convert;
mod function;
mod string;
mod table;
mod userdata;


pub use convert::{format_number, parse_number};
pub use function::{Closure, NativeFn};
pub use string::{Interner, Str};
pub use table::Table;
pub use userdata::{Payload, UserData};

pub type TableRef = Rc<RefCell<Table>>;

/// Structural type of a value. The declaration order matches the ids of the
/// built-in tags, see [`TagId::for_type`](crate::TagId::for_type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    UserData,
    Nil,
    Number,
    String,
    Table,
    Function,
}

impl Type {
    pub const ALL: [Type; 6] = [
        Type::UserData,
        Type::Nil,
        Type::Number,
        Type::String,
        Type::Table,
        Type::Function,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Type::UserData => "userdata",
            Type::Nil => "nil",
            Type::Number => "number",
            Type::String => "string",
            Type::Table => "table",
            Type::Function => "function",
        }
    }

    pub fn parse(name: &str) -> Option<Type> {
        Type::ALL.into_iter().find(|ty| ty.name() == name)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A VM value. Heap variants share their payload; cloning a `Val` never
/// copies a table, closure or userdata.
#[derive(Clone, Default)]
pub enum Val {
    #[default]
    Nil,
    Number(f64),
    Str(Str),
    Table(TableRef),
    Function(Rc<Closure>),
    UserData(Rc<UserData>),
}

impl Val {
    pub fn type_of(&self) -> Type {
        match self {
            Val::Nil => Type::Nil,
            Val::Number(_) => Type::Number,
            Val::Str(_) => Type::String,
            Val::Table(_) => Type::Table,
            Val::Function(_) => Type::Function,
            Val::UserData(_) => Type::UserData,
        }
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Val::Nil)
    }

    /// Address of the heap object behind a reference variant.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Val::Table(t) => Some(Rc::as_ptr(t) as *const () as usize),
            Val::Function(c) => Some(Rc::as_ptr(c) as *const () as usize),
            Val::UserData(u) => Some(Rc::as_ptr(u) as *const () as usize),
            _ => None,
        }
    }

    /// Equality without tag-method dispatch: numbers by value, strings by
    /// content, everything else by identity.
    pub fn raw_equal(&self, other: &Val) -> bool {
        match (self, other) {
            (Val::Nil, Val::Nil) => true,
            (Val::Number(a), Val::Number(b)) => a == b,
            (Val::Str(a), Val::Str(b)) => a == b,
            (Val::Table(a), Val::Table(b)) => Rc::ptr_eq(a, b),
            (Val::Function(a), Val::Function(b)) => Rc::ptr_eq(a, b),
            (Val::UserData(a), Val::UserData(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Ordering for numbers and strings; `None` when the pair is not comparable.
    pub fn less_than(&self, other: &Val) -> Option<bool> {
        match (self, other) {
            (Val::Number(a), Val::Number(b)) => Some(a < b),
            (Val::Str(a), Val::Str(b)) => Some(a.as_bytes() < b.as_bytes()),
            _ => None,
        }
    }

    /// True for values `concat` joins without a tag method.
    #[inline]
    pub(crate) fn is_string_like(&self) -> bool {
        matches!(self, Val::Number(_) | Val::Str(_))
    }
}

impl PartialEq for Val {
    fn eq(&self, other: &Self) -> bool {
        self.raw_equal(other)
    }
}

impl From<f64> for Val {
    fn from(n: f64) -> Self {
        Val::Number(n)
    }
}

impl From<Str> for Val {
    fn from(s: Str) -> Self {
        Val::Str(s)
    }
}

// Tables can contain themselves, so Debug prints identities instead of contents.
impl fmt::Debug for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Nil => f.write_str("nil"),
            Val::Number(n) => f.write_str(&format_number(*n)),
            Val::Str(s) => write!(f, "{s:?}"),
            Val::Table(t) => write!(f, "table: {:#x}", Rc::as_ptr(t) as *const () as usize),
            Val::Function(c) => write!(f, "function: {:#x}", Rc::as_ptr(c) as *const () as usize),
            Val::UserData(u) => write!(f, "userdata: {:#x}", Rc::as_ptr(u) as *const () as usize),
        }
    }
}
