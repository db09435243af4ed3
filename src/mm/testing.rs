use core::cell::Cell;

use crate::num::Pow2Usize;

use super::{
    NonNull,
    Allocator,
    AllocError,
    Arena,
};

/// Base allocator for tests: serves blocks from an arena and records the
/// traffic it sees.
pub struct CountingAllocator<'a> {
    arena: Arena<'a>,
    alloc_count: Cell<usize>,
    free_count: Cell<usize>,
    last_free: Cell<Option<(usize, usize)>>,
    refuse: Cell<bool>,
}

impl<'a> CountingAllocator<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        CountingAllocator {
            arena: Arena::new(buffer),
            alloc_count: Cell::new(0),
            free_count: Cell::new(0),
            last_free: Cell::new(None),
            refuse: Cell::new(false),
        }
    }
    pub fn alloc_count(&self) -> usize { self.alloc_count.get() }
    pub fn free_count(&self) -> usize { self.free_count.get() }
    pub fn last_free(&self) -> Option<(usize, usize)> { self.last_free.get() }
    pub fn refuse_allocs(&self, refuse: bool) { self.refuse.set(refuse); }
    pub fn served(&self, ptr: NonNull<u8>, size: usize) -> bool {
        self.arena.owns(ptr, size)
    }
}

unsafe impl<'a> Allocator for CountingAllocator<'a> {
    fn alloc(
        &self,
        size: usize,
        align: Pow2Usize
    ) -> Result<NonNull<u8>, AllocError> {
        if self.refuse.get() {
            return Err(AllocError::NotEnoughMemory);
        }
        let p = self.arena.alloc(size, align)?;
        self.alloc_count.set(self.alloc_count.get() + 1);
        Ok(p)
    }
    unsafe fn free(
        &self,
        ptr: NonNull<u8>,
        size: usize,
        _align: Pow2Usize
    ) {
        self.free_count.set(self.free_count.get() + 1);
        self.last_free.set(Some((ptr.as_ptr() as usize, size)));
    }
    fn name(&self) -> &'static str { "counting-allocator" }
}
