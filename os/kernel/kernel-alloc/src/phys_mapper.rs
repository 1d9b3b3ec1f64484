//! # Physical memory access for the page allocator
//!
//! The allocator writes into the pages it manages (scrub patterns, free-list
//! links) but only knows their *physical* addresses. A [`PhysMapper`] turns a
//! physical address into something the CPU can dereference in the current
//! address space.
//!
//! - On an identity-mapped kernel the physical address is already usable:
//!   [`OffsetPhysMapper::identity`].
//! - With a higher-half direct map every physical address is visible at
//!   `HHDM_BASE + pa`: [`OffsetPhysMapper::new`] with that base.
//! - In host tests a heap arena stands in for RAM and the offset is the
//!   distance between the arena and the synthetic physical base.

use kernel_memory_addresses::PhysicalAddress;

/// Converts physical addresses into references in the current address space.
pub trait PhysMapper {
    /// # Safety
    /// - `pa` must be mapped, writable, and suitably aligned for `T`.
    /// - The caller picks `'a` and must not let the reference outlive the
    ///   mapping, nor alias it with another live `&mut` to the same memory.
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T;
}

/// [`PhysMapper`] for a fixed linear mapping: `va = pa + offset` (wrapping).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OffsetPhysMapper {
    offset: u64,
}

impl OffsetPhysMapper {
    #[must_use]
    pub const fn new(offset: u64) -> Self {
        Self { offset }
    }

    /// Physical addresses are virtual addresses.
    #[must_use]
    pub const fn identity() -> Self {
        Self::new(0)
    }

    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }
}

impl PhysMapper for OffsetPhysMapper {
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        #[allow(clippy::cast_possible_truncation)]
        let va = pa.as_u64().wrapping_add(self.offset) as usize as *mut T;
        // SAFETY: Caller guarantees the linear mapping covers `pa`.
        unsafe { &mut *va }
    }
}
