//! # Physical Memory Address Types
//!
//! Strongly typed wrappers for raw physical addresses and page bases used by
//! the physical page allocator and its callers.
//!
//! ## Overview
//!
//! | Type | Generic | Description |
//! |----------|----------|-------------|
//! | [`PhysicalAddress`] | – | A raw 64-bit physical address, any alignment. |
//! | [`PhysicalPage<S>`] | [`S: PageSize`](PageSize) | A page-aligned base of a page of size `S`. |
//!
//! Both are `#[repr(transparent)]` over `u64` and cost nothing at runtime.
//!
//! ## Page Sizes
//!
//! The allocator works at a single granularity, the 4 KiB page, exposed as
//! the marker type [`Size4K`]. The [`PageSize`] trait is sealed and defines
//! the constants [`SIZE`](PageSize::SIZE) and [`SHIFT`](PageSize::SHIFT) used
//! by all the helpers.
//!
//! ## Typical Usage
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let kernel_end = PhysicalAddress::new(0x8002_1a40);
//!
//! // First whole page after the kernel image
//! let first = kernel_end.align_up::<Size4K>().unwrap().page::<Size4K>();
//! assert_eq!(first.base().as_u64(), 0x8002_2000);
//!
//! // Frame numbers index per-page metadata tables
//! assert_eq!(first.frame_number(), 0x8_0022);
//! assert_eq!(PhysicalPage::<Size4K>::from_frame_number(0x8_0022), first);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod page_size;
mod physical_address;
mod physical_page;

pub use page_size::{PageSize, Size4K};
pub use physical_address::PhysicalAddress;
pub use physical_page::PhysicalPage;
