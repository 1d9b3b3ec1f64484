//! # Memory Layout

use kernel_memory_addresses::{PageSize, PhysicalAddress, PhysicalPage, Size4K};

/// Where the kernel image is loaded in physical memory on the reference board.
///
/// # Kernel Build
/// This matches the load address in the kernel's linker script; the symbol
/// marking the end of the image is resolved relative to it.
pub const KERNEL_BASE: u64 = 0x8000_0000;

/// Top of installed RAM on the reference board (128 MiB above [`KERNEL_BASE`]).
pub const PHYS_TOP: u64 = KERNEL_BASE + 128 * 1024 * 1024;

/// Size of the pages handed out by the physical page allocator.
pub const PAGE_SIZE: usize = 4096;

const _: () = {
    assert!(PAGE_SIZE as u64 == Size4K::SIZE);
    assert!(PHYS_TOP.is_multiple_of(Size4K::SIZE));
    assert!(KERNEL_BASE < PHYS_TOP);
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("kernel image ends at {kernel_end} which is above the top of RAM at {phys_top}")]
    Inverted {
        kernel_end: PhysicalAddress,
        phys_top: PhysicalAddress,
    },
}

/// Physical memory handed to the page allocator at boot.
///
/// Everything from the end of the kernel image up to the top of installed RAM
/// is allocatable. Both bounds come from the boot layer (linker symbol and
/// firmware / device tree respectively); nothing here reads them implicitly.
///
/// ```text
/// KERNEL_BASE          kernel_end  first_page()                 phys_top
///     │   kernel image     │ pad │  page │  page │ ... │  page │ tail │
///     └────────────────────┴─────┴───────┴───────┴─────┴───────┴──────┘
///                                 ◄──────── page_count() ───────►
/// ```
///
/// The padding up to the next page boundary and any trailing partial page are
/// never managed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PhysicalMemoryLayout {
    kernel_end: PhysicalAddress,
    phys_top: PhysicalAddress,
}

impl PhysicalMemoryLayout {
    /// # Errors
    /// [`LayoutError::Inverted`] if the kernel image would end above the top of RAM.
    pub const fn new(
        kernel_end: PhysicalAddress,
        phys_top: PhysicalAddress,
    ) -> Result<Self, LayoutError> {
        if kernel_end.as_u64() > phys_top.as_u64() {
            return Err(LayoutError::Inverted {
                kernel_end,
                phys_top,
            });
        }
        Ok(Self {
            kernel_end,
            phys_top,
        })
    }

    /// First address after the kernel image.
    #[must_use]
    pub const fn kernel_end(&self) -> PhysicalAddress {
        self.kernel_end
    }

    /// First address past installed RAM.
    #[must_use]
    pub const fn phys_top(&self) -> PhysicalAddress {
        self.phys_top
    }

    /// First whole page after the kernel image, if the address space has one.
    #[must_use]
    pub const fn first_page(&self) -> Option<PhysicalPage<Size4K>> {
        match self.kernel_end.align_up::<Size4K>() {
            Some(pa) => Some(PhysicalPage::containing_address(pa)),
            None => None,
        }
    }

    /// Number of whole pages between [`first_page`](Self::first_page) and `phys_top`.
    #[must_use]
    pub const fn page_count(&self) -> usize {
        let Some(first) = self.first_page() else {
            return 0;
        };
        let start = first.base().as_u64();
        let end = self.phys_top.as_u64();
        if start >= end {
            return 0;
        }
        #[allow(clippy::cast_possible_truncation)]
        let pages = ((end - start) / Size4K::SIZE) as usize;
        pages
    }
}

impl Default for PhysicalMemoryLayout {
    /// The reference board with nothing but the load address reserved.
    fn default() -> Self {
        Self {
            kernel_end: PhysicalAddress::new(KERNEL_BASE),
            phys_top: PhysicalAddress::new(PHYS_TOP),
        }
    }
}
