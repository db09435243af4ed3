use crate::num::Pow2Usize;
use super::NonNull;
use super::AllocError;
use super::Allocator;

/// Allocator that never has memory to give; useful as a placeholder base.
pub struct NopAllocator { }

pub const NOP_ALLOCATOR: NopAllocator = NopAllocator { };

unsafe impl Allocator for NopAllocator {
    fn alloc(
        &self,
        _size: usize,
        _align: Pow2Usize
    ) -> Result<NonNull<u8>, AllocError> {
        Err(AllocError::UnsupportedOperation)
    }
    unsafe fn free(
        &self,
        _ptr: NonNull<u8>,
        _size: usize,
        _align: Pow2Usize) {
    }
    fn name(&self) -> &'static str {
        "nop-allocator"
    }
}
