//! Allocator interface for page consumers.
//!
//! Page-table builders, process setup, and pipe code only need "give me a
//! page" and "take it back". Taking `impl FrameAlloc` instead of a concrete
//! [`PageAllocator`] keeps them independent of the mapper type.

use crate::page_alloc::PageAllocator;
use crate::phys_mapper::PhysMapper;
use kernel_memory_addresses::{PhysicalPage, Size4K};

pub trait FrameAlloc {
    /// One fresh 4 KiB page, or `None` when memory is exhausted.
    fn alloc_4k(&mut self) -> Option<PhysicalPage<Size4K>>;

    /// Release one reference to a page obtained from [`alloc_4k`](Self::alloc_4k).
    fn free_4k(&mut self, page: PhysicalPage<Size4K>);
}

impl<M: PhysMapper> FrameAlloc for &PageAllocator<M> {
    #[inline]
    fn alloc_4k(&mut self) -> Option<PhysicalPage<Size4K>> {
        self.allocate()
    }

    #[inline]
    fn free_4k(&mut self, page: PhysicalPage<Size4K>) {
        self.free(page);
    }
}
