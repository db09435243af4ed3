#![no_std]

#[cfg(feature = "use-std")]
extern crate std;

pub mod num;
pub mod mm;
