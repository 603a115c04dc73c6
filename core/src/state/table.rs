//! Table access from the host: raw reads and writes that bypass tag
//! methods, the tag-method aware `get_table`/`set_table`, traversal and the
//! globals table.
//!
//! Raw access treats a nil key uniformly: reading it yields nil, writing it
//! fails with "table index is nil". Operations that pop their operands do
//! so only once they succeed, so a failed call leaves the stack as it was.

use std::{cell::RefCell, rc::Rc};

use crate::error::{ApiError, ApiResult};
use crate::tags::{TagEvent, TagId};
use crate::val::{Table, TableRef, Type, Val};

use super::State;

impl State {
    fn table_at(&self, index: i32, op: &'static str) -> ApiResult<TableRef> {
        match self.slot(index) {
            Val::Table(t) => Ok(Rc::clone(t)),
            other => Err(ApiError::type_mismatch(op, Type::Table, other.type_of())),
        }
    }

    fn frame_len(&self) -> usize {
        self.top - self.ci.base
    }

    /// Runs `mutate` on a table and accounts any growth of its storage.
    fn with_table_mut<R>(&mut self, table: &TableRef, mutate: impl FnOnce(&mut Table) -> R) -> R {
        let mut t = table.borrow_mut();
        let before = t.heap_size();
        let out = mutate(&mut *t);
        let grown = t.heap_size().saturating_sub(before);
        drop(t);
        if grown > 0 {
            self.gc.note_alloc(grown);
        }
        out
    }

    /// Pushes a new empty table.
    pub fn new_table(&mut self) {
        let _guard = self.enter();
        let table = Rc::new(RefCell::new(Table::new(TagId::TABLE)));
        let size = self.heap.track_table(&table);
        self.push_raw(Val::Table(table));
        self.note_alloc(size);
    }

    /// Replaces the key on top of the stack with `t[key]`, where `t` is the
    /// table at `index`.
    pub fn raw_get(&mut self, index: i32) -> ApiResult<()> {
        let _guard = self.enter();
        let table = self.table_at(index, "rawget")?;
        let key_slot = self.resolve_strict(-1);
        let value = table.borrow().get(&self.stack[key_slot]);
        self.stack[key_slot] = value;
        Ok(())
    }

    /// Pushes `t[n]`.
    pub fn raw_get_indexed(&mut self, index: i32, n: i64) -> ApiResult<()> {
        let _guard = self.enter();
        let table = self.table_at(index, "rawgeti")?;
        let value = table.borrow().get_int(n);
        self.push_raw(value);
        Ok(())
    }

    /// Pops a value and a key (pushed in that order: key first) and stores
    /// them in the table at `index`.
    pub fn raw_set(&mut self, index: i32) -> ApiResult<()> {
        let _guard = self.enter();
        api_check!(self.frame_len() >= 2, "rawset needs a key and a value on the stack");
        let table = self.table_at(index, "rawset")?;
        let key = self.slot(-2).clone();
        let value = self.slot(-1).clone();
        self.with_table_mut(&table, |t| t.set(key, value))?;
        self.truncate_to(self.top - 2);
        self.check_gc();
        Ok(())
    }

    /// Pops a value and stores it as `t[n]`.
    pub fn raw_set_indexed(&mut self, index: i32, n: i64) -> ApiResult<()> {
        let _guard = self.enter();
        api_check!(self.frame_len() >= 1, "rawseti needs a value on the stack");
        let table = self.table_at(index, "rawseti")?;
        let value = self.slot(-1).clone();
        self.with_table_mut(&table, |t| t.set_int(n, value));
        self.truncate_to(self.top - 1);
        self.check_gc();
        Ok(())
    }

    /// Traversal step. Pops a key (nil to start) and pushes the next key and
    /// its value, returning true; returns false with nothing pushed when the
    /// traversal is over.
    ///
    /// The key must come from the previous step of the same traversal.
    /// Assigning to existing fields (nil included) while traversing is fine;
    /// adding new keys leaves the traversal order undefined.
    pub fn next(&mut self, index: i32) -> ApiResult<bool> {
        let _guard = self.enter();
        let table = self.table_at(index, "next")?;
        let step = table.borrow().next(self.slot(-1))?;
        self.truncate_to(self.top - 1);
        match step {
            Some((key, value)) => {
                self.push_raw(key);
                self.push_raw(value);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Length hint of the table at `index`: its numeric `n` field when set,
    /// else the largest numeric key holding a value. Not authoritative for
    /// tables with holes.
    pub fn length_hint(&self, index: i32) -> ApiResult<i64> {
        let _guard = self.enter();
        let table = self.table_at(index, "getn")?;
        let n = table.borrow().length_hint(&self.n_key);
        Ok(n)
    }

    /// Replaces the key on top of the stack with `v[key]`, honouring the
    /// `gettable` and `index` tag methods of the value at `index`.
    pub fn get_table(&mut self, index: i32) -> ApiResult<()> {
        let _guard = self.enter();
        let target = self.slot(index).clone();
        let key_slot = self.resolve_strict(-1);
        let key = self.stack[key_slot].clone();
        let tag = self.tag_of_val(&target);

        let handler = self.tags.method(tag, TagEvent::GetTable);
        let value = if !handler.is_nil() {
            self.call_tag_method(handler, &[target, key])?
        } else if let Val::Table(table) = &target {
            let raw = table.borrow().get(&key);
            let fallback = self.tags.method(tag, TagEvent::Index);
            if raw.is_nil() && !fallback.is_nil() {
                self.call_tag_method(fallback, &[target.clone(), key])?
            } else {
                raw
            }
        } else {
            return Err(ApiError::Runtime(format!(
                "attempt to index a {} value",
                target.type_of()
            )));
        };
        // the handler may have moved the top; the key is still the top value
        let key_slot = self.resolve_strict(-1);
        self.stack[key_slot] = value;
        Ok(())
    }

    /// Pops a value and a key and assigns `v[key] = value` for the value at
    /// `index`, honouring its `settable` tag method.
    pub fn set_table(&mut self, index: i32) -> ApiResult<()> {
        let _guard = self.enter();
        api_check!(self.frame_len() >= 2, "settable needs a key and a value on the stack");
        let target = self.slot(index).clone();
        let key = self.slot(-2).clone();
        let value = self.slot(-1).clone();
        let tag = self.tag_of_val(&target);

        let handler = self.tags.method(tag, TagEvent::SetTable);
        if !handler.is_nil() {
            self.call_tag_method(handler, &[target, key, value])?;
        } else if let Val::Table(table) = &target {
            self.with_table_mut(table, |t| t.set(key, value))?;
        } else {
            return Err(ApiError::Runtime(format!(
                "attempt to index a {} value",
                target.type_of()
            )));
        }
        // the handler leaves the stack as it found it
        self.truncate_to(self.top - 2);
        self.check_gc();
        Ok(())
    }

    /// Pushes the global `name`.
    pub fn get_global(&mut self, name: &str) {
        let _guard = self.enter();
        let key = self.intern(name.as_bytes());
        let value = self.globals.borrow().get(&Val::Str(key));
        self.push_raw(value);
        self.check_gc();
    }

    /// Pops a value into the global `name`.
    pub fn set_global(&mut self, name: &str) -> ApiResult<()> {
        let _guard = self.enter();
        api_check!(self.frame_len() >= 1, "setglobal needs a value on the stack");
        let value = self.slot(-1).clone();
        let key = self.intern(name.as_bytes());
        let globals = Rc::clone(&self.globals);
        self.with_table_mut(&globals, |t| t.set(Val::Str(key), value))?;
        self.truncate_to(self.top - 1);
        self.check_gc();
        Ok(())
    }

    /// Pushes the globals table.
    pub fn push_globals(&mut self) {
        let _guard = self.enter();
        self.push_raw(Val::Table(Rc::clone(&self.globals)));
    }

    /// Pops a table and makes it the globals table.
    pub fn set_globals(&mut self) -> ApiResult<()> {
        let _guard = self.enter();
        api_check!(self.frame_len() >= 1, "setglobals needs a table on the stack");
        let table = self.table_at(-1, "setglobals")?;
        self.globals = table;
        self.truncate_to(self.top - 1);
        Ok(())
    }
}
