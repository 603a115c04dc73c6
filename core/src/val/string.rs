use std::{
    borrow::{Borrow, Cow},
    fmt,
    hash::{Hash, Hasher},
    mem,
    rc::Rc,
};

use rustc_hash::FxHashSet;

/// An immutable byte string. Strings created through an [`Interner`] are
/// canonical, so equal contents usually share one allocation.
#[derive(Clone)]
pub struct Str(Rc<[u8]>);

impl Str {
    pub fn new(bytes: &[u8]) -> Self {
        Str(Rc::from(bytes))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_str_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    #[inline]
    pub fn ptr_eq(a: &Str, b: &Str) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    pub(crate) fn heap_size(len: usize) -> usize {
        2 * mem::size_of::<usize>() + len
    }
}

impl PartialEq for Str {
    fn eq(&self, other: &Self) -> bool {
        Str::ptr_eq(self, other) || self.0 == other.0
    }
}

impl Eq for Str {}

impl Hash for Str {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl Borrow<[u8]> for Str {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Str {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_str_lossy())
    }
}

impl fmt::Display for Str {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_str_lossy())
    }
}

/// Deduplicating string pool.
#[derive(Debug, Default)]
pub struct Interner {
    strings: FxHashSet<Str>,
    bytes: usize,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the canonical string for `bytes` and the number of bytes newly
    /// allocated (zero when it was already interned).
    pub fn intern(&mut self, bytes: &[u8]) -> (Str, usize) {
        if let Some(existing) = self.strings.get(bytes) {
            return (existing.clone(), 0);
        }
        let s = Str::new(bytes);
        let size = Str::heap_size(bytes.len());
        self.bytes += size;
        self.strings.insert(s.clone());
        (s, size)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Accounted bytes of every string in the pool.
    #[inline]
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    /// Drops strings nothing outside the pool refers to. Returns the bytes freed.
    pub fn prune(&mut self) -> usize {
        let mut freed = 0;
        self.strings.retain(|s| {
            let keep = Rc::strong_count(&s.0) > 1;
            if !keep {
                freed += Str::heap_size(s.len());
            }
            keep
        });
        self.bytes -= freed;
        freed
    }
}
