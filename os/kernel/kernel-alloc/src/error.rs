//! Error kinds of the physical page allocator.
//!
//! Two very different classes live here. [`RefCountError`] is an ordinary,
//! recoverable result of asking to share a page. [`PageFreeError`] describes a
//! broken caller invariant on the release path; it is never handed back to a
//! caller but formatted into the panic that halts the kernel.

use kernel_memory_addresses::PhysicalAddress;

/// Failure to read or update a page's reference count.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefCountError {
    #[error("{0} is not a managed page")]
    OutOfRange(PhysicalAddress),
    #[error("page {0} is free and cannot gain a reference")]
    NotLive(PhysicalAddress),
    #[error("reference count of page {0} is already zero")]
    Underflow(PhysicalAddress),
}

/// Fatal misuse detected while releasing a page.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageFreeError {
    #[error("{0} is not page aligned")]
    Unaligned(PhysicalAddress),
    #[error("{0} lies inside the kernel image")]
    KernelImage(PhysicalAddress),
    #[error("{0} is outside managed physical memory")]
    OutOfRange(PhysicalAddress),
    #[error("double free of page {0}")]
    DoubleFree(PhysicalAddress),
}
