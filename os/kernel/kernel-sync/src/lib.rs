//! # Kernel synchronization primitives
//!
//! Only what the page allocator needs: a spin lock that never suspends the
//! caller, suitable for short critical sections entered from any CPU.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod spin_lock;

pub use spin_lock::{SpinLock, SpinLockGuard};
