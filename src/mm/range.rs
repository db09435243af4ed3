use super::NonNull;

/// Half-open byte range `[start, start + len)` whose end never overflows.
///
/// Empty ranges are positions rather than bytes: an empty range is contained
/// anywhere in `[start, end]`, matching where a bump allocator may hand out
/// a zero-sized block.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MemRange {
    start: usize,
    len: usize,
}

impl MemRange {
    pub fn new(start: usize, len: usize) -> Option<Self> {
        start.checked_add(len).map(|_| MemRange { start, len })
    }

    pub(crate) const fn new_unchecked(start: usize, len: usize) -> Self {
        MemRange { start, len }
    }

    pub fn from_ptr(ptr: NonNull<u8>, len: usize) -> Option<Self> {
        MemRange::new(ptr.as_ptr() as usize, len)
    }

    pub fn start(&self) -> usize { self.start }
    pub fn len(&self) -> usize { self.len }
    pub fn is_empty(&self) -> bool { self.len == 0 }

    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn contains_addr(&self, addr: usize) -> bool {
        self.start <= addr && addr < self.end()
    }

    pub fn contains_range(&self, other: &MemRange) -> bool {
        if other.is_empty() {
            self.start <= other.start && other.start <= self.end()
        } else {
            self.contains_addr(other.start) && other.end() <= self.end()
        }
    }

    pub fn contains_block(&self, ptr: NonNull<u8>, len: usize) -> bool {
        MemRange::from_ptr(ptr, len).map_or(false, |r| self.contains_range(&r))
    }
}
