use crate::num::Pow2Usize;

use super::{
    NonNull,
    Allocator,
    AllocatorRef,
    AllocError,
};

/// Growable array whose storage comes from an [`AllocatorRef`].
///
/// Growth allocates a larger block, moves the items over and frees the old
/// block, so it works on top of allocators that cannot resize in place.
#[derive(Debug)]
pub struct Vector<'a, T> {
    allocator: AllocatorRef<'a>,
    ptr: NonNull<T>,
    len: usize,
    cap: usize,
}

impl<'a, T> Vector<'a, T> {

    pub fn new(allocator: AllocatorRef<'a>) -> Vector<'a, T> {
        Vector {
            allocator,
            ptr: NonNull::dangling(),
            len: 0,
            cap: if core::mem::size_of::<T>() == 0 { usize::MAX } else { 0 },
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn allocator(&self) -> AllocatorRef<'a> {
        self.allocator
    }

    pub fn reserve(&mut self, count: usize) -> Result<(), AllocError> {
        if count <= self.cap - self.len {
            return Ok(());
        }
        let item_size = core::mem::size_of::<T>();
        debug_assert!(item_size != 0);
        let max_cap = usize::MAX / item_size;
        if count > max_cap - self.len {
            return Err(AllocError::SizeTooBig);
        }
        let len_needed = self.len + count;
        let mut cap_to_try =
            Pow2Usize::from_smaller_or_equal_usize(len_needed)
            .map(|x| core::cmp::min(x.get(), max_cap))
            .unwrap_or(len_needed);
        loop {
            match self.allocator.alloc_array::<T>(cap_to_try) {
                Ok(new_ptr) => {
                    unsafe {
                        core::ptr::copy_nonoverlapping(
                            self.ptr.as_ptr(), new_ptr.as_ptr(), self.len);
                        self.release_storage();
                    }
                    self.ptr = new_ptr;
                    self.cap = cap_to_try;
                    return Ok(());
                },
                Err(e) => {
                    if cap_to_try == len_needed {
                        return Err(e);
                    }
                    cap_to_try = len_needed;
                }
            }
        }
    }

    pub fn push(&mut self, v: T) -> Result<(), (AllocError, T)> {
        if let Err(e) = self.reserve(1) {
            return Err((e, v));
        }
        debug_assert!(self.len < self.cap);
        unsafe {
            core::ptr::write(self.ptr.as_ptr().add(self.len), v);
        }
        self.len += 1;

        Ok(())
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            None
        } else {
            self.len -= 1;
            Some(unsafe {
                core::ptr::read(self.ptr.as_ptr().add(self.len))
            })
        }
    }

    pub fn last(&self) -> Option<&T> {
        self.as_slice().last()
    }

    pub fn as_slice(&self) -> &[T] {
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    pub fn append_from_slice(&mut self, src: &[T]) -> Result<(), AllocError>
    where T: Copy {
        self.reserve(src.len())?;
        unsafe {
            core::ptr::copy_nonoverlapping(
                src.as_ptr(), self.ptr.as_ptr().add(self.len), src.len());
        }
        self.len += src.len();
        Ok(())
    }

    unsafe fn release_storage(&mut self) {
        if self.cap != 0 && core::mem::size_of::<T>() != 0 {
            self.allocator.free_array(self.ptr, self.cap);
        }
    }
}

impl<'a, T> Drop for Vector<'a, T> {
    fn drop(&mut self) {
        unsafe {
            core::ptr::drop_in_place(self.as_mut_slice() as *mut [T]);
            self.release_storage();
        }
    }
}
