//! Heap-backed stand-in for physical RAM in unit tests.

use crate::free_list::PageFrame;
use crate::phys_mapper::{OffsetPhysMapper, PhysMapper};
use kernel_info::memory::{PAGE_SIZE, PhysicalMemoryLayout};
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::alloc::{Layout, alloc_zeroed, dealloc};
use std::cell::RefCell;
use std::sync::Once;

/// Synthetic physical address of the first page.
pub(crate) const RAM_BASE: u64 = 0x8000_0000;

pub(crate) struct TestRam {
    ptr: *mut u8,
    pages: usize,
}

impl TestRam {
    pub(crate) fn new(pages: usize) -> Self {
        let ptr = unsafe { alloc_zeroed(Self::layout_for(pages)) };
        assert!(!ptr.is_null());
        Self { ptr, pages }
    }

    fn layout_for(pages: usize) -> Layout {
        Layout::from_size_align(pages.max(1) * PAGE_SIZE, PAGE_SIZE).unwrap()
    }

    pub(crate) fn mapper(&self) -> OffsetPhysMapper {
        OffsetPhysMapper::new((self.ptr as u64).wrapping_sub(RAM_BASE))
    }

    /// Kernel image ends exactly where the arena starts.
    pub(crate) fn layout(&self) -> PhysicalMemoryLayout {
        PhysicalMemoryLayout::new(
            PhysicalAddress::new(RAM_BASE),
            PhysicalAddress::new(RAM_BASE + (self.pages * PAGE_SIZE) as u64),
        )
        .unwrap()
    }

    pub(crate) fn page(&self, i: usize) -> PhysicalPage<Size4K> {
        PhysicalAddress::new(RAM_BASE + (i * PAGE_SIZE) as u64).page()
    }

    pub(crate) fn bytes(&self, i: usize) -> &[u8] {
        assert!(i < self.pages);
        unsafe { core::slice::from_raw_parts(self.ptr.add(i * PAGE_SIZE), PAGE_SIZE) }
    }

    pub(crate) unsafe fn frame<'a>(&self, i: usize) -> &'a mut PageFrame {
        unsafe { self.mapper().phys_to_mut(self.page(i).base()) }
    }
}

impl Drop for TestRam {
    fn drop(&mut self) {
        unsafe { dealloc(self.ptr, Self::layout_for(self.pages)) }
    }
}

thread_local! {
    static RECORDS: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
}

/// Collects records per test thread, so parallel tests don't see each other's.
struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        RECORDS.with(|r| {
            r.borrow_mut()
                .push((record.level(), record.args().to_string()));
        });
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;

/// Everything this thread has logged since the last call.
///
/// The first call installs the capturing logger; call it once up front to
/// start from a clean slate.
pub(crate) fn take_logs() -> Vec<(Level, String)> {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        log::set_logger(&LOGGER).unwrap();
        log::set_max_level(LevelFilter::Trace);
    });
    RECORDS.with(RefCell::take)
}
