//! Memory management: the allocator capability interface and the arena
//! family of allocators built on it.

pub use core::ptr::NonNull;

use crate::num::Pow2Usize;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum AllocError {
    SizeTooBig, // byte size computation overflows usize
    UnsupportedAlignment, // allocator cannot guarantee requested alignment
    UnsupportedSize, // allocator can never serve a block of this size
    NotEnoughMemory, // remaining capacity or backing store exhausted
    UnsupportedOperation, // alloc or free not supported
    InvalidConfig, // allocator construction rejected its parameters
}

impl core::fmt::Display for AllocError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            AllocError::SizeTooBig => "size overflows usize",
            AllocError::UnsupportedAlignment => "unsupported alignment",
            AllocError::UnsupportedSize => "unsupported size",
            AllocError::NotEnoughMemory => "not enough memory",
            AllocError::UnsupportedOperation => "unsupported operation",
            AllocError::InvalidConfig => "invalid allocator configuration",
        };
        f.write_str(msg)
    }
}

#[cfg(feature = "use-std")]
impl std::error::Error for AllocError { }

/// Capability shared by every allocator in this crate.
///
/// All methods take `&self`; allocators keep their bookkeeping in `Cell` or
/// `UnsafeCell` and are therefore not `Sync`.
///
/// # Safety
///
/// Implementors must hand out blocks that are valid for reads and writes of
/// `size` bytes, aligned to `align`, and that do not overlap any other live
/// block handed out by the same allocator.
pub unsafe trait Allocator {
    /// Returns a block of `size` bytes or the reason it cannot be served.
    /// A `size` of zero never fails because of the size alone.
    fn alloc(
        &self,
        size: usize,
        align: Pow2Usize
    ) -> Result<NonNull<u8>, AllocError>;

    /// Releases a block. Allocators that only reclaim in bulk ignore this.
    ///
    /// # Safety
    ///
    /// `ptr`, `size` and `align` must describe a block previously returned
    /// by `alloc` on this allocator that has not been freed since.
    unsafe fn free(
        &self,
        ptr: NonNull<u8>,
        size: usize,
        align: Pow2Usize
    );

    fn supports_owns(&self) -> bool { false }

    /// True iff `[ptr, ptr + size)` lies fully inside memory managed by
    /// this allocator.
    fn owns(
        &self,
        _ptr: NonNull<u8>,
        _size: usize
    ) -> bool {
        false
    }

    fn name(&self) -> &'static str;

    fn to_ref(&self) -> AllocatorRef<'_>
    where Self: Sized {
        AllocatorRef { allocator: self as &dyn Allocator }
    }
}

#[derive(Copy, Clone)]
pub struct AllocatorRef<'a> {
    allocator: &'a (dyn Allocator + 'a)
}

impl<'a> AllocatorRef<'a> {
    pub fn new(allocator: &'a (dyn Allocator + 'a)) -> Self {
        AllocatorRef { allocator }
    }

    fn addr(&self) -> *const u8 {
        (self.allocator as *const (dyn Allocator + 'a)).cast::<u8>()
    }

    /// True if both handles forward to the same allocator instance.
    pub fn same_as(&self, other: &AllocatorRef<'_>) -> bool {
        core::ptr::eq(self.addr(), other.addr())
    }
}

impl<'a> core::fmt::Debug for AllocatorRef<'a> {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>)
    -> core::result::Result<(), core::fmt::Error> {
        write!(fmt, "{}@{:X}", self.name(), self.addr() as usize)
    }
}

unsafe impl<'a> Allocator for AllocatorRef<'a> {
    fn alloc(
        &self,
        size: usize,
        align: Pow2Usize
    ) -> Result<NonNull<u8>, AllocError> {
        self.allocator.alloc(size, align)
    }
    unsafe fn free(
        &self,
        ptr: NonNull<u8>,
        size: usize,
        align: Pow2Usize) {
        self.allocator.free(ptr, size, align);
    }
    fn supports_owns(&self) -> bool {
        self.allocator.supports_owns()
    }
    fn owns(
        &self,
        ptr: NonNull<u8>,
        size: usize
    ) -> bool {
        self.allocator.owns(ptr, size)
    }
    fn name(&self) -> &'static str {
        self.allocator.name()
    }
    fn to_ref(&self) -> AllocatorRef<'_>
    where Self: Sized {
        *self
    }
}

pub fn array_byte_size<T>(count: usize) -> Result<usize, AllocError> {
    count.checked_mul(core::mem::size_of::<T>()).ok_or(AllocError::SizeTooBig)
}

impl<'a> AllocatorRef<'a> {
    /// Allocates room for `count` items of `T`, aligned for `T`.
    pub fn alloc_array<T>(self, count: usize) -> Result<NonNull<T>, AllocError> {
        let size = array_byte_size::<T>(count)?;
        self.alloc(size, Pow2Usize::of::<T>()).map(|p| p.cast::<T>())
    }

    /// Frees an array obtained from [`alloc_array`](Self::alloc_array).
    ///
    /// # Safety
    ///
    /// `ptr` and `count` must match a previous `alloc_array::<T>` call on
    /// the same allocator. A `count` whose byte size overflows can never
    /// have been allocated; debug builds assert on it and release builds
    /// return without freeing anything.
    pub unsafe fn free_array<T>(self, ptr: NonNull<T>, count: usize) {
        match array_byte_size::<T>(count) {
            Ok(size) => self.free(ptr.cast::<u8>(), size, Pow2Usize::of::<T>()),
            Err(_) => debug_assert!(false, "freeing an array that could not have been allocated"),
        }
    }

    pub fn vector<T: Sized>(self) -> Vector<'a, T> {
        Vector::new(self)
    }
}

pub mod range;
pub use range::MemRange as MemRange;

pub mod nop_alloc;
pub use nop_alloc::NOP_ALLOCATOR as NOP_ALLOCATOR;

pub mod arena;
pub use arena::Arena as Arena;

pub mod arena_chain;
pub use arena_chain::ArenaChain as ArenaChain;
pub use arena_chain::ArenaChainConfig as ArenaChainConfig;
pub use arena_chain::DEFAULT_NODE_SIZE as DEFAULT_NODE_SIZE;
pub use arena_chain::NODE_HEADER_SIZE as NODE_HEADER_SIZE;

pub mod fallback;
pub use fallback::ArenaWithFallback as ArenaWithFallback;

pub mod vector;
pub use vector::Vector as Vector;

#[cfg(feature = "use-libc")]
pub mod libc_malloc;
#[cfg(feature = "use-libc")]
pub use libc_malloc::Malloc as Malloc;

#[cfg(all(feature = "use-libc", unix))]
pub mod page_alloc;
#[cfg(all(feature = "use-libc", unix))]
pub use page_alloc::PageAllocator as PageAllocator;

#[cfg(test)]
pub(crate) mod testing;
