use crate::phys_mapper::PhysMapper;
use kernel_info::memory::PAGE_SIZE;
use kernel_memory_addresses::{PhysicalPage, Size4K};

/// Header stored at the beginning of every **free** page.
///
/// ```text
/// +----------------------+----------------------------------+
/// | FreeLink (header)    |  junk (FREE_JUNK)                |
/// +----------------------+----------------------------------+
/// ^ page base                                   page base + 4 KiB ^
/// ```
///
/// `next` is the *physical* page that follows in the list, so the chain can be
/// walked through any [`PhysMapper`].
#[repr(C)]
#[derive(Copy, Clone)]
pub(crate) struct FreeLink {
    next: Option<PhysicalPage<Size4K>>,
}

/// The two ways the allocator looks at a page it manages.
///
/// While a page is allocated only `bytes` is meaningful, and only to the
/// allocator when it scrubs. While a page sits on the free list its first bytes
/// are a [`FreeLink`]. Nothing else ever interprets the memory.
#[repr(C, align(4096))]
pub(crate) union PageFrame {
    bytes: [u8; PAGE_SIZE],
    link: FreeLink,
}

const _: () = assert!(size_of::<PageFrame>() == PAGE_SIZE);

impl PageFrame {
    /// Overwrite every byte of the page with `junk`.
    pub(crate) fn scrub(&mut self, junk: u8) {
        // SAFETY: every bit pattern is a valid `[u8; N]`.
        unsafe { self.bytes.fill(junk) }
    }
}

/// LIFO list of free pages, threaded through the pages themselves.
///
/// Holds no memory of its own: the head is a physical page number and each
/// free page stores the next one. The most recently freed page is handed out
/// first, while it is still likely to be warm in the cache.
///
/// # Invariants
/// - Every page on the list is managed, page aligned, and has reference count 0.
/// - No page appears twice.
/// - `len` is the number of pages reachable from `head`.
pub(crate) struct FreeList {
    head: Option<PhysicalPage<Size4K>>,
    len: usize,
}

impl FreeList {
    pub(crate) const fn new() -> Self {
        Self { head: None, len: 0 }
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    /// Put `page` at the head of the list.
    ///
    /// # Safety
    /// - Must only be called while holding the list's lock.
    /// - `page` must be reachable through `mapper` and owned by nobody else;
    ///   its first bytes are overwritten with the link.
    pub(crate) unsafe fn push<M: PhysMapper>(&mut self, mapper: &M, page: PhysicalPage<Size4K>) {
        // SAFETY: The caller hands over exclusive ownership of `page`.
        let frame: &mut PageFrame = unsafe { mapper.phys_to_mut(page.base()) };
        frame.link = FreeLink { next: self.head };
        self.head = Some(page);
        self.len += 1;
    }

    /// Take the most recently pushed page off the list.
    ///
    /// # Safety
    /// - Must only be called while holding the list's lock.
    /// - Every page on the list must still be reachable through `mapper` and
    ///   must not have been written by anyone since it was pushed.
    pub(crate) unsafe fn pop<M: PhysMapper>(&mut self, mapper: &M) -> Option<PhysicalPage<Size4K>> {
        let page = self.head?;
        // SAFETY: `page` is on the list, so its first bytes hold a link.
        let frame: &mut PageFrame = unsafe { mapper.phys_to_mut(page.base()) };
        self.head = unsafe { frame.link.next };
        self.len -= 1;
        Some(page)
    }
}
