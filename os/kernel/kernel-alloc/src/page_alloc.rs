//! # Physical page allocator
//!
//! Hands out whole 4 KiB pages for user memory, kernel stacks, page tables,
//! and pipe buffers, and takes them back once the last reference is dropped.
//!
//! ## Page states
//!
//! ```text
//!              init: count := 1           free, count 1 → 0
//!  (unmanaged) ─────────────────► Reserved ──────────────────► Free ◄──┐
//!                                                              │       │
//!                                        allocate, count := 1  │       │ free, count 1 → 0
//!                                                              ▼       │
//!                                 increment_refcount ──►  Allocated ───┘
//!                                 free, count n → n-1 ◄──  (count ≥ 1)
//! ```
//!
//! Free pages are filled with [`FREE_JUNK`], freshly allocated ones with
//! [`ALLOC_JUNK`], so stale or uninitialised reads stand out.
//!
//! ## Locking
//!
//! Two independent lock domains: one [`SpinLock`] per reference count and one
//! for the whole free list. No path holds more than one lock at a time, and no
//! lock is held while a page is being scrubbed.

use crate::error::{PageFreeError, RefCountError};
use crate::free_list::{FreeList, PageFrame};
use crate::phys_mapper::PhysMapper;
use crate::refcount::RefCountTable;
use core::fmt;
use kernel_info::memory::PhysicalMemoryLayout;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K};
use kernel_sync::SpinLock;
use log::{debug, error, info, trace};

/// Byte pattern a page is filled with when it goes back on the free list.
pub const FREE_JUNK: u8 = 0x01;

/// Byte pattern a page is filled with when it is handed out.
pub const ALLOC_JUNK: u8 = 0x05;

/// Reference-counted allocator of 4 KiB physical pages.
///
/// One instance owns one managed range. The kernel builds it once at boot and
/// passes `&PageAllocator` to whatever needs pages; all operations take
/// `&self` and are safe to call from any CPU concurrently.
pub struct PageAllocator<M: PhysMapper> {
    mapper: M,
    layout: PhysicalMemoryLayout,
    refcounts: RefCountTable,
    free_list: SpinLock<FreeList>,
}

impl<M: PhysMapper> PageAllocator<M> {
    /// Take over every whole page between the end of the kernel image and the
    /// top of RAM.
    ///
    /// Each page is first given a reference count of 1 and then released
    /// through [`free`](Self::free), so seeding runs the same checks as any
    /// later release and leaves every page Free with count 0. Pages are pushed
    /// in ascending address order; the highest page is handed out first.
    ///
    /// # Safety
    /// - The managed range must be RAM that nothing else uses, now or later.
    /// - `mapper` must map the whole managed range writable.
    pub unsafe fn init(layout: PhysicalMemoryLayout, mapper: M) -> Self {
        let pages = layout.page_count();
        let first = layout
            .first_page()
            .unwrap_or_else(|| layout.phys_top().page());

        let allocator = Self {
            mapper,
            layout,
            refcounts: RefCountTable::new(first, pages),
            free_list: SpinLock::new(FreeList::new()),
        };

        let mut page = first;
        for _ in 0..pages {
            allocator.seed(page);
            page = page.next();
        }

        info!(
            "page allocator: {pages} pages of 4 KiB in [{}, {})",
            first.base(),
            layout.phys_top()
        );
        allocator
    }

    fn seed(&self, page: PhysicalPage<Size4K>) {
        if let Err(e) = self.refcounts.set(page.base(), 1) {
            Self::fatal("kfree", &PageFreeError::from_refcount(e));
        }
        self.free(page);
    }

    /// Allocate one page, or `None` if physical memory is exhausted.
    ///
    /// The page comes back with a reference count of 1 and its contents filled
    /// with [`ALLOC_JUNK`]; callers must not expect anything it held before.
    pub fn allocate(&self) -> Option<PhysicalPage<Size4K>> {
        // SAFETY: list pages are managed and mapped; we hold the list lock.
        let popped = self
            .free_list
            .with_lock(|list| unsafe { list.pop(&self.mapper) });
        let Some(page) = popped else {
            debug!("page allocator: out of memory");
            return None;
        };

        // Off the list and not yet counted; unreachable by anyone but us.
        if let Err(e) = self.refcounts.set(page.base(), 1) {
            Self::fatal("kfree", &PageFreeError::from_refcount(e));
        }

        self.scrub(page, ALLOC_JUNK);
        trace!("page allocator: allocated {}", page.base());
        Some(page)
    }

    /// Like [`allocate`](Self::allocate), but the page is zero-filled.
    pub fn allocate_zeroed(&self) -> Option<PhysicalPage<Size4K>> {
        let page = self.allocate()?;
        self.scrub(page, 0);
        Some(page)
    }

    /// Drop one reference to the page at `pa`.
    ///
    /// The page returns to the free list only when this was the last
    /// reference; otherwise it stays allocated for its remaining owners.
    ///
    /// # Panics
    /// If `pa` is not the base of a managed page, or if the page has no
    /// references left (double free). Both mean a caller has broken the
    /// allocator's contract and the page pool can no longer be trusted.
    pub fn free(&self, pa: impl Into<PhysicalAddress>) {
        if let Err(e) = self.release(pa.into()) {
            Self::fatal("kfree", &e);
        }
    }

    fn release(&self, pa: PhysicalAddress) -> Result<(), PageFreeError> {
        let page = self.validate(pa)?;

        let remaining = self
            .refcounts
            .decrement(pa)
            .map_err(PageFreeError::from_refcount)?;
        if remaining > 0 {
            trace!("page allocator: {pa} still has {remaining} references");
            return Ok(());
        }

        self.scrub(page, FREE_JUNK);

        // SAFETY: count reached zero, so we are the page's last owner.
        self.free_list
            .with_lock(|list| unsafe { list.push(&self.mapper, page) });
        trace!("page allocator: freed {pa}");
        Ok(())
    }

    fn validate(&self, pa: PhysicalAddress) -> Result<PhysicalPage<Size4K>, PageFreeError> {
        let Some(page) = PhysicalPage::from_aligned(pa) else {
            return Err(PageFreeError::Unaligned(pa));
        };
        if pa < self.layout.kernel_end() {
            return Err(PageFreeError::KernelImage(pa));
        }
        if self.refcounts.index_of(pa).is_none() {
            return Err(PageFreeError::OutOfRange(pa));
        }
        Ok(page)
    }

    /// Register one more owner of the live page containing `pa`.
    ///
    /// Returns the new reference count. Every successful call must later be
    /// balanced by one [`free`](Self::free).
    ///
    /// # Errors
    /// - [`RefCountError::OutOfRange`] if `pa` is not in a managed page.
    /// - [`RefCountError::NotLive`] if the page is currently free.
    pub fn increment_refcount(&self, pa: PhysicalAddress) -> Result<u32, RefCountError> {
        let count = self.refcounts.increment(pa)?;
        trace!("page allocator: {pa} now has {count} references");
        Ok(count)
    }

    /// Current number of owners of the page containing `pa` (0 if free).
    ///
    /// # Panics
    /// If `pa` is not in a managed page.
    pub fn get_refcount(&self, pa: PhysicalAddress) -> u32 {
        match self.refcounts.get(pa) {
            Ok(count) => count,
            Err(e) => Self::fatal("get_refcount", &e),
        }
    }

    /// Number of pages this allocator manages.
    pub fn total_pages(&self) -> usize {
        self.refcounts.len()
    }

    /// Number of pages currently on the free list.
    pub fn free_pages(&self) -> usize {
        self.free_list.with_lock(|list| list.len())
    }

    pub const fn layout(&self) -> &PhysicalMemoryLayout {
        &self.layout
    }

    /// Fill a page this call path exclusively owns with `junk`.
    fn scrub(&self, page: PhysicalPage<Size4K>, junk: u8) {
        // SAFETY: `page` is managed, so `init`'s contract says it is mapped, and
        // the caller owns it: either just popped or just dropped to count 0.
        let frame: &mut PageFrame = unsafe { self.mapper.phys_to_mut(page.base()) };
        frame.scrub(junk);
    }

    #[cold]
    fn fatal(op: &str, e: &dyn fmt::Display) -> ! {
        error!("page allocator: {op}: {e}");
        panic!("{op}: {e}");
    }
}

impl PageFreeError {
    const fn from_refcount(e: RefCountError) -> Self {
        match e {
            RefCountError::OutOfRange(pa) => Self::OutOfRange(pa),
            RefCountError::NotLive(pa) | RefCountError::Underflow(pa) => Self::DoubleFree(pa),
        }
    }
}

impl<M: PhysMapper> fmt::Debug for PageAllocator<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageAllocator")
            .field("layout", &self.layout)
            .field("total_pages", &self.total_pages())
            .field("kmem", &self.free_list)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RAM_BASE, TestRam, take_logs};
    use log::Level;

    fn allocator(ram: &TestRam) -> PageAllocator<crate::OffsetPhysMapper> {
        unsafe { PageAllocator::init(ram.layout(), ram.mapper()) }
    }

    #[test]
    fn seeding_leaves_every_page_free_and_scrubbed() {
        let ram = TestRam::new(4);
        let pmm = allocator(&ram);
        assert_eq!(pmm.total_pages(), 4);
        assert_eq!(pmm.free_pages(), 4);
        for i in 0..4 {
            assert_eq!(pmm.get_refcount(ram.page(i).base()), 0);
            // first bytes hold the link, the rest is junk
            assert!(ram.bytes(i)[64..].iter().all(|&b| b == FREE_JUNK));
        }
    }

    #[test]
    fn allocation_scrubs_with_alloc_pattern() {
        let ram = TestRam::new(1);
        let pmm = allocator(&ram);
        let page = pmm.allocate().unwrap();
        assert_eq!(page, ram.page(0));
        assert!(ram.bytes(0).iter().all(|&b| b == ALLOC_JUNK));
    }

    #[test]
    fn zeroed_allocation_is_zero() {
        let ram = TestRam::new(1);
        let pmm = allocator(&ram);
        pmm.allocate_zeroed().unwrap();
        assert!(ram.bytes(0).iter().all(|&b| b == 0));
    }

    #[test]
    fn validation_classifies_bad_addresses() {
        let ram = TestRam::new(2);
        let pmm = allocator(&ram);
        let below = PhysicalAddress::new(RAM_BASE - 0x1000);
        let above = PhysicalAddress::new(RAM_BASE + 0x2000);
        let odd = PhysicalAddress::new(RAM_BASE + 8);
        assert_eq!(pmm.validate(odd), Err(PageFreeError::Unaligned(odd)));
        assert_eq!(pmm.validate(below), Err(PageFreeError::KernelImage(below)));
        assert_eq!(pmm.validate(above), Err(PageFreeError::OutOfRange(above)));
        assert_eq!(pmm.validate(ram.page(1).base()), Ok(ram.page(1)));
    }

    #[test]
    fn release_reports_double_free_without_touching_the_list() {
        let ram = TestRam::new(2);
        let pmm = allocator(&ram);
        let page = pmm.allocate().unwrap();
        assert_eq!(pmm.release(page.base()), Ok(()));
        assert_eq!(pmm.free_pages(), 2);
        assert_eq!(
            pmm.release(page.base()),
            Err(PageFreeError::DoubleFree(page.base()))
        );
        assert_eq!(pmm.free_pages(), 2);
    }

    #[test]
    fn partial_tail_page_is_not_managed() {
        let ram = TestRam::new(3);
        let layout = PhysicalMemoryLayout::new(
            PhysicalAddress::new(RAM_BASE + 0x10),
            PhysicalAddress::new(RAM_BASE + 0x2800),
        )
        .unwrap();
        let pmm = unsafe { PageAllocator::init(layout, ram.mapper()) };
        // only [RAM_BASE + 0x1000, RAM_BASE + 0x2000) is whole
        assert_eq!(pmm.total_pages(), 1);
        assert_eq!(pmm.allocate(), Some(ram.page(1)));
        assert_eq!(pmm.allocate(), None);
        let tail = ram.page(2).base();
        assert_eq!(pmm.validate(tail), Err(PageFreeError::OutOfRange(tail)));
        let head = ram.page(0).base();
        assert_eq!(pmm.validate(head), Err(PageFreeError::KernelImage(head)));
    }

    #[test]
    fn debug_output_names_the_list_lock() {
        let ram = TestRam::new(1);
        let pmm = allocator(&ram);
        let dump = format!("{pmm:?}");
        assert!(dump.contains("kmem"));
        assert!(dump.contains("total_pages: 1"));
    }

    #[test]
    fn exhaustion_is_logged_below_warning_level() {
        let ram = TestRam::new(1);
        let pmm = allocator(&ram);
        let _page = pmm.allocate().unwrap();

        take_logs();
        for _ in 0..5 {
            assert_eq!(pmm.allocate(), None);
        }
        let logs = take_logs();
        assert_eq!(logs.len(), 5);
        assert!(logs.iter().all(|(level, _)| *level == Level::Debug));
        assert!(logs.iter().all(|(_, msg)| msg.contains("out of memory")));
    }

    #[test]
    fn refcount_trap_logs_an_error_before_panicking() {
        let ram = TestRam::new(1);
        let pmm = allocator(&ram);
        let outside = PhysicalAddress::new(RAM_BASE + 0x1000);

        take_logs();
        let trapped = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            pmm.get_refcount(outside)
        }));
        assert!(trapped.is_err());
        let logs = take_logs();
        assert!(logs.iter().any(|(level, msg)| {
            *level == Level::Error && msg.contains("get_refcount") && msg.contains("not a managed page")
        }));
    }

    #[test]
    fn free_trap_logs_an_error_before_panicking() {
        let ram = TestRam::new(1);
        let pmm = allocator(&ram);
        let page = pmm.allocate().unwrap();
        pmm.free(page);

        take_logs();
        let trapped = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| pmm.free(page)));
        assert!(trapped.is_err());
        let logs = take_logs();
        assert!(logs.iter().any(|(level, msg)| {
            *level == Level::Error && msg.contains("kfree") && msg.contains("double free")
        }));
    }
}
