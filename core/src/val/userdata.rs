use std::{
    any::Any,
    cell::{Cell, RefCell},
    fmt, mem,
    rc::Rc,
};

use crate::error::{ApiError, ApiResult};
use crate::tags::TagId;

/// What a userdata wraps.
pub enum Payload {
    /// A zero-initialised buffer owned by the VM.
    Buffer(RefCell<Box<[u8]>>),
    /// A value owned by the host and shared with the VM.
    Host(Rc<dyn Any>),
}

/// Opaque host data carried through the VM, with the tag attached to it.
pub struct UserData {
    tag: Cell<TagId>,
    payload: Payload,
}

impl UserData {
    /// A zeroed buffer of `size` bytes (at least one). Fails with
    /// [`ApiError::CapacityExhausted`] when the buffer cannot be allocated.
    pub fn with_buffer(size: usize, tag: TagId) -> ApiResult<Self> {
        let len = size.max(1);
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(len)
            .map_err(|_| ApiError::CapacityExhausted("userdata"))?;
        bytes.resize(len, 0u8);
        Ok(Self {
            tag: Cell::new(tag),
            payload: Payload::Buffer(RefCell::new(bytes.into_boxed_slice())),
        })
    }

    pub fn with_host(value: Rc<dyn Any>, tag: TagId) -> Self {
        Self {
            tag: Cell::new(tag),
            payload: Payload::Host(value),
        }
    }

    #[inline]
    pub fn tag(&self) -> TagId {
        self.tag.get()
    }

    #[inline]
    pub(crate) fn set_tag(&self, tag: TagId) {
        self.tag.set(tag);
    }

    #[inline]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Runs `f` over the buffer; `None` for host payloads.
    pub fn with_bytes<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> Option<R> {
        match &self.payload {
            Payload::Buffer(buf) => Some(f(&mut buf.borrow_mut())),
            Payload::Host(_) => None,
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match &self.payload {
            Payload::Host(value) => value.downcast_ref::<T>(),
            Payload::Buffer(_) => None,
        }
    }

    /// Address of the host value; userdata pushed for the same host value
    /// share this key.
    pub(crate) fn host_key(value: &Rc<dyn Any>) -> usize {
        Rc::as_ptr(value) as *const () as usize
    }

    pub(crate) fn heap_size(&self) -> usize {
        let payload = match &self.payload {
            Payload::Buffer(buf) => buf.borrow().len(),
            Payload::Host(_) => 0,
        };
        mem::size_of::<Self>() + payload
    }
}

impl fmt::Debug for UserData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.payload {
            Payload::Buffer(buf) => format!("buffer[{}]", buf.borrow().len()),
            Payload::Host(_) => "host".to_string(),
        };
        f.debug_struct("UserData")
            .field("tag", &self.tag.get())
            .field("payload", &kind)
            .finish()
    }
}
