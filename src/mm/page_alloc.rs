use crate::num::Pow2Usize;
use super::Allocator;
use super::AllocError;
use super::NonNull;

/// Hands out whole pages mapped straight from the OS.
///
/// Requests are rounded up to a multiple of the page size; `free` must be
/// given the same size that was requested so the same page count gets
/// unmapped.
pub struct PageAllocator {
    page_size: Pow2Usize,
}

impl PageAllocator {
    pub fn new() -> Self {
        let queried = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        let page_size = usize::try_from(queried).ok()
            .and_then(Pow2Usize::new)
            .unwrap_or_else(|| Pow2Usize::new(4096).unwrap_or(Pow2Usize::one()));
        PageAllocator { page_size }
    }

    pub fn page_size(&self) -> usize {
        self.page_size.get()
    }

    pub fn mapped_size(&self, size: usize) -> Result<usize, AllocError> {
        self.page_size.align_up(size).ok_or(AllocError::SizeTooBig)
    }
}

impl Default for PageAllocator {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl Allocator for PageAllocator {
    fn alloc(
        &self,
        size: usize,
        align: Pow2Usize
    ) -> Result<NonNull<u8>, AllocError> {
        if size == 0 {
            return Err(AllocError::UnsupportedSize);
        }
        if align > self.page_size {
            return Err(AllocError::UnsupportedAlignment);
        }
        let len = self.mapped_size(size)?;
        let p = unsafe {
            libc::mmap(
                core::ptr::null_mut(),
                len as libc::size_t,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0)
        };
        if p == libc::MAP_FAILED {
            Err(AllocError::NotEnoughMemory)
        } else {
            NonNull::new(p as *mut u8).ok_or(AllocError::NotEnoughMemory)
        }
    }
    unsafe fn free(
        &self,
        ptr: NonNull<u8>,
        size: usize,
        _align: Pow2Usize
    ) {
        if let Ok(len) = self.mapped_size(size) {
            libc::munmap(ptr.as_ptr() as *mut libc::c_void, len as libc::size_t);
        }
    }
    fn name(&self) -> &'static str {
        "page-allocator"
    }
}
