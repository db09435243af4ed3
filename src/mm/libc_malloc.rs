use crate::num::Pow2Usize;
use super::Allocator;
use super::AllocError;
use super::NonNull;

const USIZE_BYTE_COUNT: usize = core::mem::size_of::<usize>();
const MALLOC_ALIGNMENT: usize = 2 * USIZE_BYTE_COUNT;

/// General purpose allocator backed by the C library heap.
#[derive(Default)]
pub struct Malloc { }

impl Malloc {
    pub fn new() -> Self {
        Self { }
    }
}

unsafe impl Allocator for Malloc {
    fn alloc(
        &self,
        size: usize,
        align: Pow2Usize
    ) -> Result<NonNull<u8>, AllocError> {
        if align.get() > MALLOC_ALIGNMENT {
            Err(AllocError::UnsupportedAlignment)
        } else {
            // malloc(0) may legally return null
            let size = core::cmp::max(size, 1);
            NonNull::new(unsafe {
                libc::malloc(size as libc::size_t) as *mut u8
            }).ok_or(AllocError::NotEnoughMemory)
        }
    }
    unsafe fn free(
        &self,
        ptr: NonNull<u8>,
        _size: usize,
        _align: Pow2Usize
    ) {
        libc::free(ptr.as_ptr() as *mut libc::c_void);
    }
    fn name(&self) -> &'static str {
        "libc-malloc"
    }
}
