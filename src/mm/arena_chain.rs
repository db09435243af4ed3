use core::cell::UnsafeCell;

use log::{debug, trace, warn};

use crate::num::Pow2Usize;

use super::{
    NonNull,
    Allocator,
    AllocatorRef,
    AllocError,
    Arena,
    Vector,
};

pub const DEFAULT_NODE_SIZE: usize = 4096;

/// Bytes reserved at the front of every node. A node of `node_size` bytes can
/// serve at most `node_size - NODE_HEADER_SIZE` bytes.
pub const NODE_HEADER_SIZE: usize = core::mem::size_of::<Arena<'static>>();

fn node_align() -> Pow2Usize {
    Pow2Usize::of::<usize>()
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ArenaChainConfig {
    pub node_size: usize,
}

impl Default for ArenaChainConfig {
    fn default() -> Self {
        ArenaChainConfig { node_size: DEFAULT_NODE_SIZE }
    }
}

impl ArenaChainConfig {
    pub fn with_node_size(node_size: usize) -> Self {
        ArenaChainConfig { node_size }
    }

    pub fn validate(&self) -> Result<(), AllocError> {
        if self.node_size > NODE_HEADER_SIZE {
            Ok(())
        } else {
            Err(AllocError::InvalidConfig)
        }
    }
}

/// Growable chain of arenas carved out of a base allocator.
///
/// The newest node serves allocations. When it runs out of room a fresh node
/// of `node_size` bytes is requested from `base` and becomes current. Blocks
/// are never freed one by one; [`reset`](ArenaChain::reset) hands every node
/// but the oldest back to `base` and rewinds the survivor.
///
/// Node descriptors live in a table allocated from `base`, not inside the
/// nodes, so nothing the chain hands out aliases its own bookkeeping.
/// Growing a full table costs an extra `base` allocation plus a `base` free
/// on top of the new node; [`reserve_nodes`](ArenaChain::reserve_nodes)
/// moves that cost up front so later growth is one `base` call per node.
pub struct ArenaChain<'a> {
    base: AllocatorRef<'a>,
    node_size: usize,
    nodes: UnsafeCell<Vector<'a, Arena<'a>>>, // oldest first
}

impl<'a> ArenaChain<'a> {
    pub fn new(base: AllocatorRef<'a>, node_size: usize) -> Result<Self, AllocError> {
        Self::with_config(base, ArenaChainConfig::with_node_size(node_size))
    }

    pub fn with_default_node_size(base: AllocatorRef<'a>) -> Result<Self, AllocError> {
        Self::with_config(base, ArenaChainConfig::default())
    }

    pub fn with_config(
        base: AllocatorRef<'a>,
        config: ArenaChainConfig,
    ) -> Result<Self, AllocError> {
        if let Err(e) = config.validate() {
            warn!("arena-chain: node size {} does not exceed the {}-byte node header",
                config.node_size, NODE_HEADER_SIZE);
            return Err(e);
        }
        let chain = ArenaChain {
            base,
            node_size: config.node_size,
            nodes: UnsafeCell::new(base.vector()),
        };
        chain.push_node()?;
        debug!("arena-chain: created over {:?} with {}-byte nodes", base, config.node_size);
        Ok(chain)
    }

    fn nodes(&self) -> &Vector<'a, Arena<'a>> {
        unsafe { &*self.nodes.get() }
    }

    // callers must not hold a reference obtained from nodes() across this
    #[allow(clippy::mut_from_ref)]
    unsafe fn nodes_mut(&self) -> &mut Vector<'a, Arena<'a>> {
        &mut *self.nodes.get()
    }

    pub fn base(&self) -> AllocatorRef<'a> { self.base }
    pub fn node_size(&self) -> usize { self.node_size }

    pub fn usable_node_size(&self) -> usize {
        self.node_size - NODE_HEADER_SIZE
    }

    pub fn node_count(&self) -> usize {
        self.nodes().len()
    }

    /// Bytes used in the current node, header included.
    pub fn current_used(&self) -> usize {
        self.nodes().last().map_or(0, |n| n.used())
    }

    /// Sizes the node table for `count` more nodes without allocating them.
    pub fn reserve_nodes(&self, count: usize) -> Result<(), AllocError> {
        let nodes = unsafe { self.nodes_mut() };
        nodes.reserve(count).map_err(|e| {
            warn!("arena-chain: cannot reserve room for {} more node(s): {}", count, e);
            e
        })
    }

    /// Requests a fresh node from `base` and makes it current.
    pub fn push_node(&self) -> Result<(), AllocError> {
        let nodes = unsafe { self.nodes_mut() };
        if let Err(e) = nodes.reserve(1) {
            warn!("arena-chain: cannot grow node table: {}", e);
            return Err(e);
        }
        let ptr = match self.base.alloc(self.node_size, node_align()) {
            Ok(ptr) => ptr,
            Err(e) => {
                warn!("arena-chain: {} failed to provide a {}-byte node: {}",
                    self.base.name(), self.node_size, e);
                return Err(e);
            }
        };
        let node = unsafe { Arena::from_raw_parts(ptr, self.node_size) };
        node.rewind(NODE_HEADER_SIZE);
        if let Err((e, node)) = nodes.push(node) {
            unsafe { self.base.free(node.as_ptr(), self.node_size, node_align()) };
            return Err(e);
        }
        trace!("arena-chain: node #{} at {:p}", nodes.len(), ptr);
        Ok(())
    }

    // node starts and the header size are multiples of node_align()
    fn fits_empty_node(&self, size: usize, align: Pow2Usize) -> bool {
        let padding = if align > node_align() { align.rmask() } else { 0 };
        size.checked_add(padding)
            .map_or(false, |n| n <= self.usable_node_size())
    }

    fn alloc_from_current(
        &self,
        size: usize,
        align: Pow2Usize
    ) -> Result<NonNull<u8>, AllocError> {
        self.nodes().last()
            .ok_or(AllocError::NotEnoughMemory)?
            .alloc(size, align)
    }

    /// Returns every node but the oldest to `base` and rewinds the oldest.
    /// Blocks handed out before the reset must not be used afterwards.
    pub fn reset(&mut self) {
        let base = self.base;
        let node_size = self.node_size;
        let nodes = self.nodes.get_mut();
        let mut released = 0_usize;
        while nodes.len() > 1 {
            if let Some(node) = nodes.pop() {
                unsafe { base.free(node.as_ptr(), node_size, node_align()) };
                released += 1;
            }
        }
        if let Some(oldest) = nodes.last() {
            oldest.rewind(NODE_HEADER_SIZE);
        }
        debug!("arena-chain: reset released {} node(s)", released);
    }
}

unsafe impl<'a> Allocator for ArenaChain<'a> {
    fn alloc(
        &self,
        size: usize,
        align: Pow2Usize
    ) -> Result<NonNull<u8>, AllocError> {
        if !self.fits_empty_node(size, align) {
            return Err(AllocError::UnsupportedSize);
        }
        if let Ok(ptr) = self.alloc_from_current(size, align) {
            return Ok(ptr);
        }
        self.push_node()?;
        // a fresh node always has room for a request that passed the check above
        self.alloc_from_current(size, align)
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
        self.nodes().as_slice().iter().rev().any(|n| n.owns(ptr, size))
    }
    fn name(&self) -> &'static str { "arena-chain" }
}

impl<'a> Drop for ArenaChain<'a> {
    fn drop(&mut self) {
        let base = self.base;
        let node_size = self.node_size;
        let nodes = self.nodes.get_mut();
        while let Some(node) = nodes.pop() {
            unsafe { base.free(node.as_ptr(), node_size, node_align()) };
        }
    }
}

impl<'a> core::fmt::Debug for ArenaChain<'a> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ArenaChain")
            .field("base", &self.base)
            .field("node_size", &self.node_size)
            .field("node_count", &self.node_count())
            .field("current_used", &self.current_used())
            .finish()
    }
}
