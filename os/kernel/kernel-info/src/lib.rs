//! # Kernel Boot Configuration
//!
//! Memory layout constants and the boot-time description of physical memory
//! that the page allocator is configured with.
//!
//! ## Physical Memory
//!
//! The boot layer knows two addresses the rest of the kernel cannot derive on
//! its own: where the kernel image ends (a linker symbol) and where installed
//! RAM ends. [`memory::PhysicalMemoryLayout`] bundles them, validates them once,
//! and answers the derived questions (first allocatable page, page count).
//!
//! ```text
//! Physical Address Space (reference board):
//!
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │        MMIO / ROM               │
//! KERNEL_BASE ├─────────────────────────────────┤ 0x8000_0000
//!             │   Kernel text, data, bss        │
//! kernel_end  ├─────────────────────────────────┤
//!             │   Allocatable pages             │
//!             │   (user memory, kernel stacks,  │
//!             │    page tables, pipe buffers)   │
//! PHYS_TOP    └─────────────────────────────────┘ 0x8800_0000
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use kernel_info::memory::{PhysicalMemoryLayout, PHYS_TOP};
//! use kernel_memory_addresses::PhysicalAddress;
//!
//! // `end` would come from the linker script
//! let end = PhysicalAddress::new(0x8002_1a40);
//! let layout = PhysicalMemoryLayout::new(end, PhysicalAddress::new(PHYS_TOP)).unwrap();
//! assert!(layout.page_count() > 0);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod memory;
