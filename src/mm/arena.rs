use core::cell::Cell;
use core::marker::PhantomData;

use crate::num::Pow2Usize;
use crate::num::usize_align_up;

use super::NonNull;
use super::Allocator;
use super::AllocError;
use super::MemRange;

/// Bump allocator over a caller-owned buffer.
///
/// Allocations advance `used`; nothing is reclaimed until [`reset`]. The
/// buffer stays borrowed for as long as the arena lives.
///
/// With an alignment of one, consecutive allocations are packed back to back;
/// larger alignments pad the bump offset and the padding counts as used.
///
/// [`reset`]: Arena::reset
#[derive(Debug)]
pub struct Arena<'a> {
    begin: NonNull<u8>,
    capacity: usize,
    used: Cell<usize>,
    lifeline: PhantomData<&'a mut [u8]>,
}

impl<'a> Arena<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        let capacity = buffer.len();
        Arena {
            begin: NonNull::from(buffer).cast::<u8>(),
            capacity,
            used: Cell::new(0),
            lifeline: PhantomData,
        }
    }

    /// # Safety
    ///
    /// `begin` must be valid for reads and writes of `capacity` bytes for as
    /// long as the arena (or any block it handed out) is in use.
    pub(crate) unsafe fn from_raw_parts(begin: NonNull<u8>, capacity: usize) -> Self {
        Arena {
            begin,
            capacity,
            used: Cell::new(0),
            lifeline: PhantomData,
        }
    }

    pub fn capacity(&self) -> usize { self.capacity }
    pub fn used(&self) -> usize { self.used.get() }

    pub fn space_left(&self) -> usize {
        self.capacity - self.used.get()
    }

    pub fn is_empty(&self) -> bool {
        self.used.get() == 0
    }

    pub fn as_ptr(&self) -> NonNull<u8> {
        self.begin
    }

    pub fn range(&self) -> MemRange {
        // a live buffer never wraps around the address space
        MemRange::new_unchecked(self.begin.as_ptr() as usize, self.capacity)
    }

    /// Forgets every allocation. Pointers handed out so far must not be used
    /// afterwards.
    pub fn reset(&mut self) {
        self.used.set(0);
    }

    pub(crate) fn rewind(&self, used: usize) {
        debug_assert!(used <= self.capacity);
        self.used.set(core::cmp::min(used, self.capacity));
    }
}

unsafe impl<'a> Allocator for Arena<'a> {
    fn alloc(
        &self,
        size: usize,
        align: Pow2Usize
    ) -> Result<NonNull<u8>, AllocError> {
        let begin_addr = self.begin.as_ptr() as usize;
        let current_addr = begin_addr + self.used.get();
        let (addr, end_addr) = usize_align_up(current_addr, align)
            .and_then(|a| a.checked_add(size).map(|e| (a, e)))
            .filter(|&(_, e)| e <= begin_addr + self.capacity)
            .ok_or(AllocError::NotEnoughMemory)?;
        self.used.set(end_addr - begin_addr);
        // SAFETY: addr - begin_addr <= capacity, so the offset stays inside
        // (or one past) the buffer and cannot be null
        Ok(unsafe {
            NonNull::new_unchecked(self.begin.as_ptr().add(addr - begin_addr))
        })
    }
    unsafe fn free(
        &self,
        _ptr: NonNull<u8>,
        _size: usize,
        _align: Pow2Usize
    ) {
    }
    fn supports_owns(&self) -> bool { true }
    fn owns(&self, ptr: NonNull<u8>, size: usize) -> bool {
        self.range().contains_block(ptr, size)
    }
    fn name(&self) -> &'static str { "arena" }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one() -> Pow2Usize { Pow2Usize::one() }

    #[test]
    fn allocator_name_contains_arena() {
        let mut buffer = [0_u8; 16];
        let a = Arena::new(&mut buffer);
        assert!(a.name().contains("arena"));
    }

    #[test]
    fn new_arena_is_empty() {
        let mut buffer = [0_u8; 16];
        let a = Arena::new(&mut buffer);
        assert!(a.is_empty());
        assert_eq!(a.capacity(), 16);
        assert_eq!(a.space_left(), 16);
    }

    #[test]
    fn alloc_1_byte_in_a_1_byte_buffer_works() {
        let mut buffer = [0_u8; 1];
        let b = buffer.as_mut_ptr();
        let a = Arena::new(&mut buffer);
        assert_eq!(a.alloc(1, one()).unwrap().as_ptr(), b);
    }

    #[test]
    fn alloc_2_bytes_in_a_1_byte_buffer_fails() {
        let mut buffer = [0_u8; 1];
        let a = Arena::new(&mut buffer);
        assert_eq!(a.alloc(2, one()).unwrap_err(), AllocError::NotEnoughMemory);
        assert_eq!(a.used(), 0);
    }

    #[test]
    fn allocations_are_packed_back_to_back() {
        let mut buffer = [0_u8; 64];
        let b = buffer.as_mut_ptr() as usize;
        let a = Arena::new(&mut buffer);
        let sizes = [3_usize, 7, 1, 12, 5];
        let mut prefix = 0;
        for s in sizes.iter() {
            let p = a.alloc(*s, one()).unwrap();
            assert_eq!(p.as_ptr() as usize, b + prefix);
            prefix += *s;
            assert_eq!(a.used(), prefix);
        }
        assert_eq!(a.used(), sizes.iter().sum::<usize>());
    }

    #[test]
    fn alloc_exact_remaining_space_works() {
        let mut buffer = [0_u8; 32];
        let a = Arena::new(&mut buffer);
        a.alloc(20, one()).unwrap();
        a.alloc(a.space_left(), one()).unwrap();
        assert_eq!(a.used(), 32);
        assert_eq!(a.space_left(), 0);
    }

    #[test]
    fn alloc_one_more_than_remaining_space_fails_without_side_effects() {
        let mut buffer = [0_u8; 32];
        let a = Arena::new(&mut buffer);
        a.alloc(20, one()).unwrap();
        let e = a.alloc(a.space_left() + 1, one()).unwrap_err();
        assert_eq!(e, AllocError::NotEnoughMemory);
        assert_eq!(a.used(), 20);
    }

    #[test]
    fn huge_alloc_does_not_overflow() {
        let mut buffer = [0_u8; 8];
        let a = Arena::new(&mut buffer);
        a.alloc(3, one()).unwrap();
        assert_eq!(a.alloc(usize::MAX, one()).unwrap_err(), AllocError::NotEnoughMemory);
        assert_eq!(a.alloc(usize::MAX, Pow2Usize::max()).unwrap_err(), AllocError::NotEnoughMemory);
        assert_eq!(a.used(), 3);
    }

    #[test]
    fn zero_sized_alloc_returns_current_position() {
        let mut buffer = [0_u8; 8];
        let b = buffer.as_mut_ptr() as usize;
        let a = Arena::new(&mut buffer);
        a.alloc(3, one()).unwrap();
        let p = a.alloc(0, one()).unwrap();
        assert_eq!(p.as_ptr() as usize, b + 3);
        assert_eq!(a.used(), 3);
    }

    #[test]
    fn zero_sized_alloc_on_full_arena_works() {
        let mut buffer = [0_u8; 4];
        let a = Arena::new(&mut buffer);
        a.alloc(4, one()).unwrap();
        assert!(a.alloc(0, one()).is_ok());
        assert_eq!(a.used(), 4);
    }

    #[test]
    fn zero_capacity_arena_never_panics() {
        let mut buffer = [0_u8; 0];
        let a = Arena::new(&mut buffer);
        assert!(a.alloc(0, one()).is_ok());
        assert_eq!(a.alloc(1, one()).unwrap_err(), AllocError::NotEnoughMemory);
        assert!(a.owns(a.as_ptr(), 0));
        assert!(!a.owns(a.as_ptr(), 1));
    }

    #[test]
    fn aligned_alloc_pads_the_offset() {
        let mut buffer = [0_u64; 4];
        let a = Arena::new(unsafe {
            core::slice::from_raw_parts_mut(buffer.as_mut_ptr() as *mut u8, 32)
        });
        a.alloc(1, one()).unwrap();
        let a8 = Pow2Usize::new(8).unwrap();
        let p = a.alloc(8, a8).unwrap();
        assert!(a8.is_non_null_ptr_aligned(p));
        assert_eq!(a.used(), 16);
    }

    #[test]
    fn free_does_not_reclaim() {
        let mut buffer = [0_u8; 8];
        let a = Arena::new(&mut buffer);
        let p = a.alloc(4, one()).unwrap();
        unsafe { a.free(p, 4, one()) };
        assert_eq!(a.used(), 4);
    }

    #[test]
    fn reset_on_empty_arena_is_a_no_op() {
        let mut buffer = [0_u8; 8];
        let mut a = Arena::new(&mut buffer);
        a.reset();
        assert_eq!(a.used(), 0);
        a.reset();
        assert_eq!(a.used(), 0);
    }

    #[test]
    fn reset_twice_equals_reset_once() {
        let mut buffer = [0_u8; 8];
        let mut a = Arena::new(&mut buffer);
        a.alloc(5, one()).unwrap();
        a.reset();
        assert_eq!(a.used(), 0);
        a.reset();
        assert_eq!(a.used(), 0);
        assert_eq!(a.space_left(), 8);
    }

    #[test]
    fn sixteen_byte_arena_scenario() {
        let mut buffer = [0_u8; 16];
        let mut a = Arena::new(&mut buffer);
        let p1 = a.alloc(10, one()).unwrap();
        assert_eq!(a.used(), 10);
        assert_eq!(a.alloc(10, one()).unwrap_err(), AllocError::NotEnoughMemory);
        assert_eq!(a.used(), 10);
        a.reset();
        let p2 = a.alloc(10, one()).unwrap();
        assert_eq!(a.used(), 10);
        assert_eq!(p1, p2);
    }

    #[test]
    fn owns_is_supported() {
        let mut buffer = [0_u8; 4];
        let a = Arena::new(&mut buffer);
        assert!(a.supports_owns());
    }

    #[test]
    fn owns_returned_blocks() {
        let mut buffer = [0_u8; 32];
        let a = Arena::new(&mut buffer);
        let p1 = a.alloc(10, one()).unwrap();
        let p2 = a.alloc(22, one()).unwrap();
        assert!(a.owns(p1, 10));
        assert!(a.owns(p2, 22));
    }

    #[test]
    fn owns_true_only_for_ranges_inside_buffer() {
        let mut buffer = [0xAA_u8; 47];
        let b = buffer.as_mut_ptr();
        let n = buffer.len();
        let a = Arena::new(&mut buffer);
        let at = |off: isize| NonNull::new(b.wrapping_offset(off)).unwrap();
        assert!(a.owns(at(0), n));
        assert!(a.owns(at(n as isize - 1), 1));
        assert!(!a.owns(at(n as isize - 1), 2));
        assert!(a.owns(at(n as isize), 0));
        assert!(!a.owns(at(n as isize + 1), 0));
        assert!(!a.owns(at(-1), 1));
        assert!(!a.owns(at(1), usize::MAX));
    }

    #[test]
    fn sibling_arena_does_not_own_foreign_blocks() {
        let mut b1 = [0_u8; 16];
        let mut b2 = [0_u8; 16];
        let a1 = Arena::new(&mut b1);
        let a2 = Arena::new(&mut b2);
        let p1 = a1.alloc(8, one()).unwrap();
        let p2 = a2.alloc(8, one()).unwrap();
        assert!(a1.owns(p1, 8));
        assert!(!a2.owns(p1, 8));
        assert!(a2.owns(p2, 8));
        assert!(!a1.owns(p2, 8));
    }

    #[test]
    fn blocks_are_writable() {
        let mut buffer = [0_u8; 8];
        let a = Arena::new(&mut buffer);
        let p = a.alloc(2, one()).unwrap();
        let q = a.alloc(2, one()).unwrap();
        unsafe {
            *p.as_ptr() = 0x5A;
            *q.as_ptr() = 0xA5;
        }
        assert_eq!(&buffer[..3], &[0x5A, 0, 0xA5]);
    }
}
