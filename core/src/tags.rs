//! Registry of named type tags.
//!
//! A tag classifies tables and userdata for host-defined dispatch without
//! touching their structural type. Tags may be restricted to one structural
//! type; the built-in tag of every basic type is registered under the type's
//! name when the registry is created.

use std::fmt;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::val::{Type, Val};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagId(pub u32);

impl TagId {
    pub const USERDATA: TagId = TagId(0);
    pub const NIL: TagId = TagId(1);
    pub const NUMBER: TagId = TagId(2);
    pub const STRING: TagId = TagId(3);
    pub const TABLE: TagId = TagId(4);
    pub const FUNCTION: TagId = TagId(5);

    /// The built-in tag every value of `ty` starts with.
    pub const fn for_type(ty: Type) -> TagId {
        TagId(ty as u32)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Events a tag can intercept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagEvent {
    /// Any keyed read through `get_table`.
    GetTable,
    /// Any keyed write through `set_table`.
    SetTable,
    /// Keyed read that found nil in a table.
    Index,
    /// `concat` with an operand that is not a string or number.
    Concat,
    /// Call of a value that is not a function.
    Function,
}

impl TagEvent {
    pub const ALL: [TagEvent; 5] = [
        TagEvent::GetTable,
        TagEvent::SetTable,
        TagEvent::Index,
        TagEvent::Concat,
        TagEvent::Function,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            TagEvent::GetTable => "gettable",
            TagEvent::SetTable => "settable",
            TagEvent::Index => "index",
            TagEvent::Concat => "concat",
            TagEvent::Function => "function",
        }
    }

    pub fn parse(name: &str) -> Option<TagEvent> {
        TagEvent::ALL.into_iter().find(|event| event.name() == name)
    }
}

#[derive(Debug, Clone)]
pub struct TagDescriptor {
    pub id: TagId,
    pub name: String,
    /// Structural type the tag is restricted to, `None` for unrestricted.
    pub basic_type: Option<Type>,
    methods: [Val; TagEvent::ALL.len()],
}

impl TagDescriptor {
    pub fn method(&self, event: TagEvent) -> &Val {
        &self.methods[event as usize]
    }
}

#[derive(Debug)]
pub struct TagRegistry {
    tags: Vec<TagDescriptor>,
    by_name: FxHashMap<String, TagId>,
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TagRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            tags: Vec::with_capacity(Type::ALL.len()),
            by_name: FxHashMap::default(),
        };
        for ty in Type::ALL {
            registry.push(ty.name(), Some(ty));
        }
        registry
    }

    /// Registers a new tag. Only unrestricted, table and userdata tags can be
    /// created; the name must not be taken.
    pub fn register(&mut self, name: &str, basic_type: Option<Type>) -> ApiResult<TagId> {
        if !matches!(basic_type, None | Some(Type::Table) | Some(Type::UserData)) {
            return Err(ApiError::Runtime(format!(
                "invalid basic type ({}) for new type",
                basic_type.map_or("none", Type::name)
            )));
        }
        if self.by_name.contains_key(name) {
            return Err(ApiError::TagConflict(name.to_string()));
        }
        if self.tags.len() >= u32::MAX as usize {
            return Err(ApiError::CapacityExhausted("tag table"));
        }
        let id = self.push(name, basic_type);
        debug!(
            target: "tagvm::tags",
            tag = id.raw(),
            name,
            basic_type = basic_type.map_or("none", Type::name),
            "tags.register"
        );
        Ok(id)
    }

    fn push(&mut self, name: &str, basic_type: Option<Type>) -> TagId {
        let id = TagId(self.tags.len() as u32);
        self.tags.push(TagDescriptor {
            id,
            name: name.to_string(),
            basic_type,
            methods: Default::default(),
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<TagId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, tag: TagId) -> Option<&TagDescriptor> {
        self.tags.get(tag.0 as usize)
    }

    pub fn name(&self, tag: TagId) -> Option<&str> {
        self.get(tag).map(|desc| desc.name.as_str())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Checks that `tag` may be attached to a value of type `target`.
    pub fn check_attach(&self, tag: TagId, target: Type) -> ApiResult<()> {
        let desc = self.get(tag).ok_or(ApiError::InvalidTag(tag.0))?;
        if let Some(basic) = desc.basic_type
            && basic != target
        {
            return Err(ApiError::type_mismatch("settag", basic, target));
        }
        if !matches!(target, Type::Table | Type::UserData) {
            return Err(ApiError::Runtime(format!("cannot change the tag of a {target}")));
        }
        Ok(())
    }

    /// Handler for `event` on `tag`; nil when none is set or the tag is unknown.
    pub fn method(&self, tag: TagId, event: TagEvent) -> Val {
        self.get(tag).map(|desc| desc.method(event).clone()).unwrap_or_default()
    }

    /// Installs `handler` (a function or nil) and returns the previous one.
    pub fn set_method(&mut self, tag: TagId, event: TagEvent, handler: Val) -> ApiResult<Val> {
        if !matches!(handler, Val::Nil | Val::Function(_)) {
            return Err(ApiError::type_mismatch("settagmethod", Type::Function, handler.type_of()));
        }
        let desc = self.tags.get_mut(tag.0 as usize).ok_or(ApiError::InvalidTag(tag.0))?;
        Ok(std::mem::replace(&mut desc.methods[event as usize], handler))
    }

    /// Every installed handler; these are collection roots.
    pub fn methods(&self) -> impl Iterator<Item = &Val> {
        self.tags
            .iter()
            .flat_map(|desc| desc.methods.iter())
            .filter(|handler| !handler.is_nil())
    }

    pub(crate) fn clear_methods(&mut self) {
        for desc in &mut self.tags {
            desc.methods = Default::default();
        }
    }
}
