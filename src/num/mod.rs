use core::ptr::NonNull;
use core::num::Wrapping;

pub use core::num::NonZeroUsize;

pub fn is_power_of_2(n: usize) -> bool {
    n != 0 && (n & (n - 1)) == 0
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Pow2Usize(NonZeroUsize);

impl Pow2Usize {

    pub fn new(n: usize) -> Option<Self> {
        if is_power_of_2(n) {
            NonZeroUsize::new(n).map(Pow2Usize)
        } else {
            None
        }
    }

    pub fn get(self) -> usize {
        self.0.get()
    }

    pub fn one() -> Self {
        Pow2Usize::new(1).unwrap()
    }

    pub fn max() -> Self {
        Pow2Usize::new(!((!0) >> 1)).unwrap()
    }

    pub fn of<T>() -> Self {
        Pow2Usize::new(core::mem::align_of::<T>()).unwrap_or(Pow2Usize::one())
    }

    pub fn next(self) -> Option<Self> {
        Pow2Usize::new(self.get().wrapping_shl(1))
    }

    pub fn from_smaller_or_equal_usize(n: usize) -> Option<Self> {
        let mut p = Self::one();
        while p.get() < n {
            match p.next() {
                Some(q) => p = q,
                None => return None
            }
        }
        Some(p)
    }

    pub fn rmask(&self) -> usize {
        self.0.get() - 1
    }

    pub fn lmask(&self) -> usize {
        !self.rmask()
    }

    pub fn is_aligned(&self, v: usize) -> bool {
        v & self.rmask() == 0
    }

    pub fn is_non_null_ptr_aligned<T>(&self, nnptr: NonNull<T>) -> bool {
        self.is_aligned(nnptr.as_ptr() as usize)
    }

    pub fn align_up(&self, value: usize) -> Option<usize> {
        usize_align_up(value, *self)
    }
}

pub fn usize_align_up(n: usize, align: Pow2Usize) -> Option<usize> {
    let mask = Wrapping(align.get()) - Wrapping(1usize);
    let aligned = (Wrapping(n) + mask).0 & !mask.0;
    if aligned < n { None } else { Some(aligned) }
}
