//! A heap arena posing as physical RAM right after a synthetic kernel image.

#![allow(dead_code)]

use kernel_alloc::{OffsetPhysMapper, PageAllocator};
use kernel_info::memory::{PAGE_SIZE, PhysicalMemoryLayout};
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K};
use std::alloc::{Layout, alloc_zeroed, dealloc};

/// Synthetic physical address where the kernel image ends and RAM starts.
pub const KERNEL_END: u64 = 0x8002_0000;

pub struct Ram {
    ptr: *mut u8,
    pages: usize,
}

impl Ram {
    pub fn new(pages: usize) -> Self {
        let ptr = unsafe { alloc_zeroed(Self::layout_for(pages)) };
        assert!(!ptr.is_null(), "test arena allocation failed");
        Self { ptr, pages }
    }

    fn layout_for(pages: usize) -> Layout {
        Layout::from_size_align(pages.max(1) * PAGE_SIZE, PAGE_SIZE).unwrap()
    }

    pub fn mapper(&self) -> OffsetPhysMapper {
        OffsetPhysMapper::new((self.ptr as u64).wrapping_sub(KERNEL_END))
    }

    pub fn layout(&self) -> PhysicalMemoryLayout {
        PhysicalMemoryLayout::new(
            PhysicalAddress::new(KERNEL_END),
            PhysicalAddress::new(KERNEL_END + (self.pages * PAGE_SIZE) as u64),
        )
        .unwrap()
    }

    /// A fresh allocator managing the whole arena.
    pub fn allocator(&self) -> PageAllocator<OffsetPhysMapper> {
        // SAFETY: the arena is ours and the mapper covers all of it.
        unsafe { PageAllocator::init(self.layout(), self.mapper()) }
    }

    pub fn page(&self, i: usize) -> PhysicalPage<Size4K> {
        PhysicalAddress::new(KERNEL_END + (i * PAGE_SIZE) as u64).page()
    }

    /// Contents of the page at `page`, read straight from the arena.
    pub fn bytes(&self, page: PhysicalPage<Size4K>) -> &[u8] {
        let offset = usize::try_from(page.base().as_u64() - KERNEL_END).unwrap();
        assert!(offset < self.pages * PAGE_SIZE);
        unsafe { std::slice::from_raw_parts(self.ptr.add(offset), PAGE_SIZE) }
    }

    pub fn bytes_mut(&mut self, page: PhysicalPage<Size4K>) -> &mut [u8] {
        let offset = usize::try_from(page.base().as_u64() - KERNEL_END).unwrap();
        assert!(offset < self.pages * PAGE_SIZE);
        unsafe { std::slice::from_raw_parts_mut(self.ptr.add(offset), PAGE_SIZE) }
    }
}

impl Drop for Ram {
    fn drop(&mut self) {
        unsafe { dealloc(self.ptr, Self::layout_for(self.pages)) }
    }
}
