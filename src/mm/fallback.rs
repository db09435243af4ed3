use log::trace;

use crate::num::Pow2Usize;

use super::{
    NonNull,
    Allocator,
    AllocatorRef,
    AllocError,
    ArenaChain,
    ArenaChainConfig,
};

/// Arena chain that forwards requests too big for an empty node straight to
/// the chain's base allocator.
///
/// Only those big blocks can be freed individually; freeing them goes back to
/// `base`. Small blocks are reclaimed in bulk by [`reset`], which does not
/// track big blocks: free them before resetting or they are leaked.
///
/// [`reset`]: ArenaWithFallback::reset
#[derive(Debug)]
pub struct ArenaWithFallback<'a> {
    chain: ArenaChain<'a>,
}

impl<'a> ArenaWithFallback<'a> {
    pub fn new(base: AllocatorRef<'a>, node_size: usize) -> Result<Self, AllocError> {
        ArenaChain::new(base, node_size).map(|chain| ArenaWithFallback { chain })
    }

    pub fn with_default_node_size(base: AllocatorRef<'a>) -> Result<Self, AllocError> {
        Self::with_config(base, ArenaChainConfig::default())
    }

    pub fn with_config(
        base: AllocatorRef<'a>,
        config: ArenaChainConfig,
    ) -> Result<Self, AllocError> {
        ArenaChain::with_config(base, config).map(|chain| ArenaWithFallback { chain })
    }

    pub fn chain(&self) -> &ArenaChain<'a> {
        &self.chain
    }

    /// Shared by the chain (for new nodes) and by big allocations.
    pub fn base(&self) -> AllocatorRef<'a> {
        self.chain.base()
    }

    pub fn reset(&mut self) {
        self.chain.reset();
    }
}

unsafe impl<'a> Allocator for ArenaWithFallback<'a> {
    fn alloc(
        &self,
        size: usize,
        align: Pow2Usize
    ) -> Result<NonNull<u8>, AllocError> {
        match self.chain.alloc(size, align) {
            Err(AllocError::UnsupportedSize) => {
                let ptr = self.base().alloc(size, align)?;
                trace!("arena-with-fallback: {} bytes at {:p} from {}",
                    size, ptr, self.base().name());
                Ok(ptr)
            },
            r => r
        }
    }
    unsafe fn free(
        &self,
        ptr: NonNull<u8>,
        size: usize,
        align: Pow2Usize
    ) {
        if !self.chain.owns(ptr, size) {
            trace!("arena-with-fallback: returning {} bytes at {:p} to {}",
                size, ptr, self.base().name());
            self.base().free(ptr, size, align);
        }
    }
    fn supports_owns(&self) -> bool { true }
    fn owns(&self, ptr: NonNull<u8>, size: usize) -> bool {
        self.chain.owns(ptr, size)
    }
    fn name(&self) -> &'static str { "arena-with-fallback" }
}
