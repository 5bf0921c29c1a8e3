//! # Allocation counting
//!
//! [`CountingAllocator`] wraps the system allocator and counts successful allocations
//! and the bytes they requested. A benchmark binary opts in by installing it:
//!
//! ```rust,ignore
//! #[global_allocator]
//! static GLOBAL: greet_core::bench::alloc::CountingAllocator =
//!     greet_core::bench::alloc::CountingAllocator;
//! ```
//!
//! Counters are process wide and only ever grow; measurements are the difference
//! between two [`AllocationSnapshot`]s.
use std::alloc::{GlobalAlloc, Layout, System};
use std::ops::Sub;
use std::sync::atomic::{AtomicU64, Ordering};

static ALLOCATIONS: AtomicU64 = AtomicU64::new(0);
static ALLOCATED_BYTES: AtomicU64 = AtomicU64::new(0);

pub struct CountingAllocator;

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            record(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            record(layout.size());
        }
        ptr
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            record(new_size);
        }
        new_ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) }
    }
}

fn record(size: usize) {
    ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
    ALLOCATED_BYTES.fetch_add(size as u64, Ordering::Relaxed);
}

/// Counter values at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocationSnapshot {
    pub allocations: u64,
    pub bytes: u64,
}

impl AllocationSnapshot {
    pub fn now() -> Self {
        Self {
            allocations: ALLOCATIONS.load(Ordering::Relaxed),
            bytes: ALLOCATED_BYTES.load(Ordering::Relaxed),
        }
    }
}

impl Sub for AllocationSnapshot {
    type Output = AllocationSnapshot;

    fn sub(self, earlier: Self) -> Self::Output {
        Self {
            allocations: self.allocations.saturating_sub(earlier.allocations),
            bytes: self.bytes.saturating_sub(earlier.bytes),
        }
    }
}

/// Whether [`CountingAllocator`] is the global allocator of this process.
///
/// Any running program has allocated by the time this is asked, so untouched counters
/// mean the allocator was never installed.
pub fn is_installed() -> bool {
    ALLOCATIONS.load(Ordering::Relaxed) > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_difference_saturates() {
        let earlier = AllocationSnapshot {
            allocations: 10,
            bytes: 100,
        };
        let later = AllocationSnapshot {
            allocations: 15,
            bytes: 160,
        };
        assert_eq!(
            later - earlier,
            AllocationSnapshot {
                allocations: 5,
                bytes: 60
            }
        );
        assert_eq!(earlier - later, AllocationSnapshot::default());
    }

    #[test]
    fn counts_through_the_allocator() {
        let layout = Layout::from_size_align(64, 8).unwrap();
        let before = AllocationSnapshot::now();
        unsafe {
            let ptr = CountingAllocator.alloc(layout);
            assert!(!ptr.is_null());
            CountingAllocator.dealloc(ptr, layout);
        }
        let delta = AllocationSnapshot::now() - before;
        assert!(delta.allocations >= 1);
        assert!(delta.bytes >= 64);
    }
}
