//! # Kernel Physical Page Allocation
//!
//! This crate owns the pool of 4 KiB physical pages the kernel uses for user
//! process memory, kernel stacks, page tables, and pipe buffers. Pages are
//! reference counted so that copy-on-write mappings can share a page and
//! release it independently.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 PageAllocator                       │
//! │    • allocate / free / increment / get refcount     │
//! │    • address validation, double-free detection      │
//! │    • junk scrubbing on every state change           │
//! └───────────┬───────────────────────────┬─────────────┘
//!             │                           │
//! ┌───────────▼─────────────┐ ┌───────────▼─────────────┐
//! │   Reference-Count Table │ │       Free List         │
//! │  • one SpinLock<u32>    │ │  • one SpinLock         │
//! │    per managed page     │ │  • LIFO, links stored   │
//! │  • sized at boot        │ │    inside free pages    │
//! └─────────────────────────┘ └───────────┬─────────────┘
//!                                         │
//!                             ┌───────────▼─────────────┐
//!                             │       PhysMapper        │
//!                             │  • PA → usable pointer  │
//!                             └─────────────────────────┘
//! ```
//!
//! ## Operations
//!
//! | Operation | Result | On misuse |
//! |-----------|--------|-----------|
//! | [`PageAllocator::allocate`] | `Some(page)` with count 1, or `None` when exhausted | – |
//! | [`PageAllocator::free`] | count − 1; page reclaimed at 0 | panic (bad address, double free) |
//! | [`PageAllocator::increment_refcount`] | new count | [`RefCountError`] |
//! | [`PageAllocator::get_refcount`] | current count | panic (unmanaged address) |
//!
//! Running out of memory is an ordinary outcome the caller handles. Handing
//! back an address the allocator never gave out, or one with no references
//! left, means some part of the kernel is corrupt, and the allocator halts
//! rather than let the page pool degrade silently.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kernel_alloc::{OffsetPhysMapper, PageAllocator};
//! use kernel_info::memory::{PhysicalMemoryLayout, PHYS_TOP};
//! use kernel_memory_addresses::PhysicalAddress;
//!
//! # let kernel_end = PhysicalAddress::new(0x8002_1000);
//! let layout = PhysicalMemoryLayout::new(kernel_end, PhysicalAddress::new(PHYS_TOP)).unwrap();
//! // SAFETY: the kernel is identity mapped and owns all RAM above its image.
//! let pmm = unsafe { PageAllocator::init(layout, OffsetPhysMapper::identity()) };
//!
//! let page = pmm.allocate().expect("out of memory");
//! pmm.increment_refcount(page.base()).unwrap(); // shared by a forked child
//! pmm.free(page); // parent unmaps
//! assert_eq!(pmm.get_refcount(page.base()), 1);
//! pmm.free(page); // child unmaps, page is reclaimed
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

mod error;
pub mod frame_alloc;
mod free_list;
mod page_alloc;
pub mod phys_mapper;
mod refcount;

#[cfg(test)]
mod test_support;

pub use error::{PageFreeError, RefCountError};
pub use frame_alloc::FrameAlloc;
pub use page_alloc::{ALLOC_JUNK, FREE_JUNK, PageAllocator};
pub use phys_mapper::{OffsetPhysMapper, PhysMapper};
