//! Per-page reference counts.
//!
//! One [`SpinLock`]-protected counter per managed page, indexed by frame
//! number relative to the first managed page. Operations on different pages
//! never contend, and no operation ever holds two entries at once, so there
//! is no lock ordering between entries to get wrong.

use crate::error::RefCountError;
use alloc::boxed::Box;
use alloc::vec::Vec;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K};
use kernel_sync::SpinLock;

pub(crate) struct RefCountTable {
    /// Frame number of the page described by `entries[0]`.
    first_frame: u64,
    entries: Box<[SpinLock<u32>]>,
}

impl RefCountTable {
    /// A table for `pages` consecutive pages starting at `first`, all counts zero.
    pub(crate) fn new(first: PhysicalPage<Size4K>, pages: usize) -> Self {
        let entries: Vec<_> = (0..pages).map(|_| SpinLock::new(0)).collect();
        Self {
            first_frame: first.frame_number(),
            entries: entries.into_boxed_slice(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Table slot of the page containing `pa`, if that page is managed.
    pub(crate) fn index_of(&self, pa: PhysicalAddress) -> Option<usize> {
        let frame = pa.page::<Size4K>().frame_number();
        let index = usize::try_from(frame.checked_sub(self.first_frame)?).ok()?;
        (index < self.entries.len()).then_some(index)
    }

    fn entry(&self, pa: PhysicalAddress) -> Result<&SpinLock<u32>, RefCountError> {
        self.index_of(pa)
            .map(|i| &self.entries[i])
            .ok_or(RefCountError::OutOfRange(pa))
    }

    pub(crate) fn get(&self, pa: PhysicalAddress) -> Result<u32, RefCountError> {
        Ok(*self.entry(pa)?.lock())
    }

    pub(crate) fn set(&self, pa: PhysicalAddress, value: u32) -> Result<(), RefCountError> {
        *self.entry(pa)?.lock() = value;
        Ok(())
    }

    /// Add a sharer to a live page and return the new count.
    pub(crate) fn increment(&self, pa: PhysicalAddress) -> Result<u32, RefCountError> {
        let mut count = self.entry(pa)?.lock();
        if *count == 0 {
            return Err(RefCountError::NotLive(pa));
        }
        *count += 1;
        Ok(*count)
    }

    /// Drop a sharer and return the remaining count.
    pub(crate) fn decrement(&self, pa: PhysicalAddress) -> Result<u32, RefCountError> {
        let mut count = self.entry(pa)?.lock();
        if *count == 0 {
            return Err(RefCountError::Underflow(pa));
        }
        *count -= 1;
        Ok(*count)
    }
}
