use crate::error::{ApiError, ApiResult};
use crate::tags::{TagEvent, TagId, TagRegistry};
use crate::val::{Type, Val};

use super::State;

impl State {
    /// Registers a tag named `name`, optionally restricted to tables or
    /// userdata.
    pub fn new_tag(&mut self, name: &str, basic_type: Option<Type>) -> ApiResult<TagId> {
        let _guard = self.enter();
        self.tags.register(name, basic_type)
    }

    pub fn lookup_tag(&self, name: &str) -> Option<TagId> {
        let _guard = self.enter();
        self.tags.lookup(name)
    }

    /// Attaches `tag` to the table or userdata at `index`.
    pub fn set_tag(&mut self, index: i32, tag: TagId) -> ApiResult<()> {
        let _guard = self.enter();
        let target = self.slot(index).clone();
        self.tags.check_attach(tag, target.type_of())?;
        match &target {
            Val::Table(t) => t.borrow_mut().set_tag(tag),
            Val::UserData(u) => u.set_tag(tag),
            // check_attach only admits tables and userdata
            other => {
                return Err(ApiError::Runtime(format!(
                    "cannot change the tag of a {}",
                    other.type_of()
                )));
            }
        }
        Ok(())
    }

    /// Pops a function (or nil) and installs it as the `event` handler of
    /// `tag`, pushing the handler it replaces.
    pub fn set_tag_method(&mut self, tag: TagId, event: TagEvent) -> ApiResult<()> {
        let _guard = self.enter();
        let handler = self.slot(-1).clone();
        let old = self.tags.set_method(tag, event, handler)?;
        let top = self.resolve_strict(-1);
        self.stack[top] = old;
        Ok(())
    }

    /// Pushes the `event` handler of `tag` (nil when unset).
    pub fn get_tag_method(&mut self, tag: TagId, event: TagEvent) -> ApiResult<()> {
        let _guard = self.enter();
        if self.tags.get(tag).is_none() {
            return Err(ApiError::InvalidTag(tag.raw()));
        }
        let handler = self.tags.method(tag, event);
        self.push_raw(handler);
        Ok(())
    }

    pub fn tags(&self) -> &TagRegistry {
        let _guard = self.enter();
        &self.tags
    }
}
